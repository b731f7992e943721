//! The per-quantum work done on the render thread:
//! accumulate → decimate → quantize → chunk.

use bytes::Bytes;

use super::accumulator::SampleAccumulator;
use super::audio_system::AudioConfig;
use super::chunker;
use super::pcm::{self, Decimator};
use crate::error::ProcessError;

pub struct RecorderProcessor {
    accumulator: SampleAccumulator,
    decimator: Decimator,
    quantum_size: usize,
    max_frame_bytes: usize,
}

impl RecorderProcessor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            accumulator: SampleAccumulator::new(config.quantum_size, config.flush_quanta),
            decimator: Decimator::new(config.decimation_ratio()),
            quantum_size: config.quantum_size,
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    /// Feed one rendering quantum. When the flush threshold is reached every
    /// frame of the flush is handed to `emit` in order, then the accumulator
    /// is cleared.
    ///
    /// A quantum of the wrong length is rejected before it touches the buffer.
    pub fn process<F>(&mut self, quantum: &[f32], mut emit: F) -> Result<(), ProcessError>
    where
        F: FnMut(Bytes) -> Result<(), ProcessError>,
    {
        if quantum.len() != self.quantum_size {
            return Err(ProcessError::QuantumLength {
                expected: self.quantum_size,
                actual: quantum.len(),
            });
        }

        self.accumulator.input(quantum);
        if !self.accumulator.should_flush() {
            return Ok(());
        }

        let compressed = self.decimator.compress(self.accumulator.samples());
        self.accumulator.clear();
        let encoded = pcm::encode(&compressed);
        for frame in chunker::chunk(encoded, self.max_frame_bytes) {
            emit(frame)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn pending_quanta(&self) -> usize {
        self.accumulator.quantum_count()
    }
}
