//! The audio graph: capture source → render thread → frame relay.
//!
//! Uses std::thread (NOT tokio tasks) for the render path so capture reads
//! never contend with the async control task that owns the socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use uuid::Uuid;

use super::capture::CaptureStream;
use super::processor::RecorderProcessor;
use crate::error::{Error, ProcessError};
use crate::relay::FrameRelay;

/// Audio pipeline configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// Capture rate; must be an integer multiple of `output_sample_rate`
    pub input_sample_rate: u32,
    /// Rate of the PCM stream delivered to the recorder service
    pub output_sample_rate: u32,
    /// Samples per rendering quantum
    pub quantum_size: usize,
    /// Quanta accumulated before one flush
    pub flush_quanta: usize,
    /// Upper bound on the size of one transport frame
    pub max_frame_bytes: usize,
    /// Frames the relay can hold before the render thread starts dropping
    pub relay_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_device: "default".to_string(),
            input_sample_rate: 48000,
            output_sample_rate: 16000,
            quantum_size: 128,
            flush_quanta: 32,
            max_frame_bytes: 1024,
            relay_capacity: 64,
        }
    }
}

impl AudioConfig {
    pub fn decimation_ratio(&self) -> usize {
        (self.input_sample_rate / self.output_sample_rate.max(1)) as usize
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.input_sample_rate == 0 || self.output_sample_rate == 0 {
            return Err(Error::Config("sample rates must be non-zero".into()));
        }
        if self.input_sample_rate < self.output_sample_rate
            || self.input_sample_rate % self.output_sample_rate != 0
        {
            return Err(Error::Config(format!(
                "input rate {} Hz is not an integer multiple of output rate {} Hz",
                self.input_sample_rate, self.output_sample_rate
            )));
        }
        if self.quantum_size == 0 || self.flush_quanta == 0 || self.max_frame_bytes == 0 {
            return Err(Error::Config(
                "quantum_size, flush_quanta and max_frame_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Handle to the running render thread.
///
/// Dropping the handle stops the thread.
pub struct AudioGraph {
    running: Arc<AtomicBool>,
    render_handle: Option<JoinHandle<()>>,
}

impl AudioGraph {
    /// Connect `source` to a new render thread that posts frames on `relay`.
    ///
    /// The source is moved into the thread and released when it exits.
    /// An invalid `config` is rejected before the thread is spawned.
    pub fn start(
        id: Uuid,
        config: &AudioConfig,
        source: CaptureStream,
        relay: FrameRelay,
    ) -> Result<Self> {
        config.validate()?;
        let running = Arc::new(AtomicBool::new(true));

        log::info!(
            "[{}] AudioGraph starting: {} Hz → {} Hz (ratio {}), quantum {}, flush every {} quanta, frames ≤ {} bytes",
            id,
            config.input_sample_rate,
            config.output_sample_rate,
            config.decimation_ratio(),
            config.quantum_size,
            config.flush_quanta,
            config.max_frame_bytes,
        );

        let render_handle = {
            let running = running.clone();
            let config = config.clone();
            thread::Builder::new()
                .name("audio-render".into())
                .spawn(move || {
                    if let Err(e) = render_thread(id, &config, source, relay, &running) {
                        log::error!("[{}] Render thread error: {}", id, e);
                    }
                    running.store(false, Ordering::SeqCst);
                })?
        };

        Ok(Self {
            running,
            render_handle: Some(render_handle),
        })
    }

    /// Disconnect the graph: signal the render thread and wait for it.
    /// Safe to call repeatedly.
    ///
    /// Blocks for up to one capture read; async callers run it on the
    /// blocking pool.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.render_handle.take() {
            let _ = h.join();
            log::info!("AudioGraph stopped");
        }
    }

    /// True once the render thread has exited on its own or been stopped.
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.render_handle
            .as_ref()
            .is_none_or(|h| h.is_finished())
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.stop();
    }
}

// ======================== Render thread ========================

fn render_thread(
    id: Uuid,
    config: &AudioConfig,
    mut source: CaptureStream,
    mut relay: FrameRelay,
    running: &AtomicBool,
) -> Result<()> {
    let mut processor = RecorderProcessor::new(config);
    let mut quantum = vec![0f32; config.quantum_size];

    log::info!("[{}] Rendering started", id);

    while running.load(Ordering::Relaxed) {
        let n = source.read_quantum(&mut quantum)?;
        if n == 0 {
            log::info!("[{}] Capture stream ended", id);
            break;
        }
        let posted = processor.process(&quantum[..n], |frame| {
            let len = frame.len();
            if !relay.post(frame)? {
                log::warn!(
                    "[{}] Relay full, dropping frame of {} bytes ({} dropped so far)",
                    id,
                    len,
                    relay.overflowed()
                );
            }
            Ok(())
        });
        match posted {
            Ok(()) => {}
            Err(ProcessError::RelayClosed) => {
                log::warn!("[{}] Frame relay closed, stopping render thread", id);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if relay.overflowed() > 0 {
        log::warn!("[{}] Relay dropped {} frames during this session", id, relay.overflowed());
    }
    log::info!("[{}] Rendering stopped", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::testing::ScriptedSource;
    use crate::relay;

    fn wait_finished(graph: &AudioGraph) {
        for _ in 0..500 {
            if graph.is_finished() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        panic!("render thread did not finish");
    }

    #[test]
    fn validates_integer_ratio() {
        let mut config = AudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decimation_ratio(), 3);

        config.output_sample_rate = 44100;
        assert!(config.validate().is_err());

        config.output_sample_rate = 96000;
        assert!(config.validate().is_err());

        config.output_sample_rate = 0;
        assert!(config.validate().is_err());

        config = AudioConfig {
            max_frame_bytes: 0,
            ..AudioConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn renders_scripted_capture_into_frames() {
        let config = AudioConfig::default();
        let (relay, mut rx) = relay::channel(config.relay_capacity);
        let source = Box::new(ScriptedSource::constant(64, 128, -1.0));
        let mut graph = AudioGraph::start(Uuid::new_v4(), &config, source, relay).unwrap();
        wait_finished(&graph);
        graph.stop();

        let mut lens = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            assert!(frame.chunks(2).all(|s| s == [0x00, 0x80]));
            lens.push(frame.len());
        }
        assert_eq!(lens, vec![1024, 1024, 682, 1024, 1024, 682]);
    }

    #[test]
    fn partial_flush_is_never_emitted() {
        let config = AudioConfig::default();
        let (relay, mut rx) = relay::channel(config.relay_capacity);
        let source = Box::new(ScriptedSource::constant(31, 128, 0.3));
        let mut graph = AudioGraph::start(Uuid::new_v4(), &config, source, relay).unwrap();
        wait_finished(&graph);
        graph.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_quantum_stops_the_graph() {
        let config = AudioConfig {
            flush_quanta: 1,
            ..AudioConfig::default()
        };
        let (relay, mut rx) = relay::channel(config.relay_capacity);
        let source = Box::new(ScriptedSource::new(vec![
            vec![0.0; 128],
            vec![0.0; 100],
            vec![0.0; 128],
        ]));
        let graph = AudioGraph::start(Uuid::new_v4(), &config, source, relay).unwrap();
        wait_finished(&graph);

        assert_eq!(rx.try_recv().unwrap().len(), 128 / 3 * 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_is_idempotent() {
        let config = AudioConfig::default();
        let (relay, _rx) = relay::channel(4);
        let source = Box::new(ScriptedSource::new(vec![]));
        let mut graph = AudioGraph::start(Uuid::new_v4(), &config, source, relay).unwrap();
        graph.stop();
        graph.stop();
        assert!(graph.is_finished());
    }

    #[test]
    fn invalid_config_spawns_nothing() {
        let config = AudioConfig {
            max_frame_bytes: 0,
            ..AudioConfig::default()
        };
        let (relay, mut rx) = relay::channel(4);
        let source = Box::new(ScriptedSource::constant(32, 128, 0.5));
        assert!(AudioGraph::start(Uuid::new_v4(), &config, source, relay).is_err());
        // 中继发送端随 start 一起被释放
        assert!(rx.try_recv().is_err());
    }
}
