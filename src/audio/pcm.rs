//! Fixed-ratio decimation and 16-bit PCM quantization.
//!
//! Decimation keeps every `ratio`-th sample starting at index 0. No low-pass
//! filter runs before it, so content above the output Nyquist frequency
//! aliases into the band. The output rate contract is what the recorder
//! service relies on; a filtered decimator can replace `compress` as long as
//! it keeps `floor(len / ratio)` output samples.

use bytes::{BufMut, Bytes, BytesMut};

/// Bytes per encoded sample (16-bit little-endian).
pub const BYTES_PER_SAMPLE: usize = 2;

pub struct Decimator {
    ratio: usize,
}

impl Decimator {
    /// `ratio` is input rate / output rate and must be non-zero.
    pub fn new(ratio: usize) -> Self {
        assert!(ratio > 0, "decimation ratio must be positive");
        Self { ratio }
    }

    /// Output length is `floor(samples.len() / ratio)`; a trailing partial
    /// stride is discarded.
    pub fn compress(&self, samples: &[f32]) -> Vec<f32> {
        let len = samples.len() / self.ratio;
        samples.iter().step_by(self.ratio).take(len).copied().collect()
    }
}

/// Quantize one sample. Negative values scale by 0x8000, the rest by 0x7FFF,
/// after clamping to [-1.0, 1.0]. NaN encodes as 0.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode samples as little-endian 16-bit signed PCM.
pub fn encode(samples: &[f32]) -> Bytes {
    let mut out = BytesMut::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &s in samples {
        out.put_i16_le(quantize(s));
    }
    out.freeze()
}
