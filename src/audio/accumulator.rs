//! Holds captured quanta on the render thread until a flush is due.

/// Contiguous store of the quanta received since the last flush.
///
/// Quanta are appended in arrival order, so the buffer is already the merged
/// sample sequence when the flush threshold is reached.
pub struct SampleAccumulator {
    samples: Vec<f32>,
    quanta: usize,
    flush_quanta: usize,
}

impl SampleAccumulator {
    /// `quantum_size * flush_quanta` samples are reserved up front so the
    /// render thread does not reallocate between flushes.
    pub fn new(quantum_size: usize, flush_quanta: usize) -> Self {
        Self {
            samples: Vec::with_capacity(quantum_size * flush_quanta),
            quanta: 0,
            flush_quanta,
        }
    }

    pub fn input(&mut self, quantum: &[f32]) {
        self.samples.extend_from_slice(quantum);
        self.quanta += 1;
    }

    pub fn should_flush(&self) -> bool {
        self.quanta >= self.flush_quanta
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.quanta = 0;
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[cfg(test)]
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    pub fn quantum_count(&self) -> usize {
        self.quanta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_at_threshold() {
        let mut acc = SampleAccumulator::new(128, 32);
        let quantum = [0.25f32; 128];
        for _ in 0..31 {
            acc.input(&quantum);
            assert!(!acc.should_flush());
        }
        acc.input(&quantum);
        assert!(acc.should_flush());
        assert_eq!(acc.quantum_count(), 32);
        assert_eq!(acc.total_samples(), 4096);
    }

    #[test]
    fn keeps_arrival_order() {
        let mut acc = SampleAccumulator::new(2, 3);
        acc.input(&[0.1, 0.2]);
        acc.input(&[0.3, 0.4]);
        assert_eq!(acc.samples(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut acc = SampleAccumulator::new(4, 1);
        acc.input(&[1.0; 4]);
        assert!(acc.should_flush());
        acc.clear();
        assert_eq!(acc.total_samples(), 0);
        assert_eq!(acc.quantum_count(), 0);
        assert!(!acc.should_flush());
        assert!(acc.samples().is_empty());
    }
}
