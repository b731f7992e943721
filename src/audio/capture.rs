//! Capture capability: turns an audio-only request into a live quantum source.

use alsa::pcm::PCM;
use anyhow::Result;

use super::alsa_device;
use super::audio_system::AudioConfig;
use crate::error::CaptureError;

/// A live capture stream that delivers one rendering quantum per call.
///
/// Implementations fill `quantum` completely and return its length, or
/// return `Ok(0)` once the stream has ended.
pub trait QuantumSource: Send {
    fn read_quantum(&mut self, quantum: &mut [f32]) -> Result<usize>;
}

/// Owned capture handle. Dropping it releases the device.
pub type CaptureStream = Box<dyn QuantumSource>;

/// Request mono input from the configured ALSA device.
///
/// Failure is final: the caller reports it and does not retry.
pub fn request_audio(config: &AudioConfig) -> Result<CaptureStream, CaptureError> {
    let (pcm, params) = alsa_device::open_capture(
        &config.capture_device,
        config.input_sample_rate,
        config.quantum_size,
    )?;
    if params.period_size != config.quantum_size {
        log::debug!(
            "period size {} differs from quantum size {}, reads will be regrouped",
            params.period_size,
            config.quantum_size
        );
    }
    Ok(Box::new(AlsaSource {
        pcm,
        device: config.capture_device.clone(),
    }))
}

struct AlsaSource {
    pcm: PCM,
    device: String,
}

impl QuantumSource for AlsaSource {
    fn read_quantum(&mut self, quantum: &mut [f32]) -> Result<usize> {
        let io = self.pcm.io_f32()?;
        let mut filled = 0;
        // Short reads are regrouped so every quantum handed on is complete.
        while filled < quantum.len() {
            match io.readi(&mut quantum[filled..]) {
                Ok(0) => return Ok(0),
                Ok(frames) => filled += frames,
                Err(e) => {
                    log::warn!("ALSA capture error on '{}': {}, recovering...", self.device, e);
                    self.pcm.prepare()?;
                }
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use std::time::Duration;

    /// Scripted source: yields the given quanta in order, then ends.
    pub struct ScriptedSource {
        quanta: std::vec::IntoIter<Vec<f32>>,
        pace: Option<Duration>,
    }

    impl ScriptedSource {
        pub fn new(quanta: Vec<Vec<f32>>) -> Self {
            Self {
                quanta: quanta.into_iter(),
                pace: None,
            }
        }

        pub fn constant(count: usize, len: usize, value: f32) -> Self {
            Self::new(vec![vec![value; len]; count])
        }

        /// Block for `per_quantum` before each read, like a real device.
        pub fn paced(mut self, per_quantum: Duration) -> Self {
            self.pace = Some(per_quantum);
            self
        }
    }

    impl QuantumSource for ScriptedSource {
        fn read_quantum(&mut self, quantum: &mut [f32]) -> Result<usize> {
            if let Some(pace) = self.pace {
                std::thread::sleep(pace);
            }
            match self.quanta.next() {
                Some(q) => {
                    let n = q.len().min(quantum.len());
                    quantum[..n].copy_from_slice(&q[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }
}
