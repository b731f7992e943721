//! Splits an encoded PCM buffer into transport frames.

use bytes::Bytes;

/// Iterator over consecutive frames of at most `max_frame_bytes`.
///
/// Frames are zero-copy slices of the encoded buffer. The iterator consumes
/// the buffer as it goes and cannot be restarted.
pub struct FrameChunker {
    remaining: Bytes,
    max_frame_bytes: usize,
}

pub fn chunk(encoded: Bytes, max_frame_bytes: usize) -> FrameChunker {
    assert!(max_frame_bytes > 0, "frame size must be positive");
    FrameChunker {
        remaining: encoded,
        max_frame_bytes,
    }
}

impl Iterator for FrameChunker {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining.is_empty() {
            return None;
        }
        let n = self.max_frame_bytes.min(self.remaining.len());
        Some(self.remaining.split_to(n))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.len().div_ceil(self.max_frame_bytes);
        (n, Some(n))
    }
}

impl ExactSizeIterator for FrameChunker {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(buf: Bytes, max: usize) -> Vec<usize> {
        chunk(buf, max).map(|f| f.len()).collect()
    }

    #[test]
    fn splits_with_short_tail() {
        let buf = Bytes::from(vec![7u8; 2730]);
        assert_eq!(lengths(buf, 1024), vec![1024, 1024, 682]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let buf = Bytes::from(vec![0u8; 2048]);
        assert_eq!(lengths(buf, 1024), vec![1024, 1024]);
    }

    #[test]
    fn empty_buffer_yields_no_frames() {
        assert_eq!(chunk(Bytes::new(), 1024).count(), 0);
    }

    #[test]
    fn concatenation_restores_input() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        for max in [1usize, 7, 1024, 4999, 5000, 8192] {
            let frames = chunk(Bytes::from(data.clone()), max);
            assert_eq!(frames.len(), data.len().div_ceil(max));
            let mut joined = Vec::new();
            for frame in frames {
                assert!(!frame.is_empty() && frame.len() <= max);
                joined.extend_from_slice(&frame);
            }
            assert_eq!(joined, data);
        }
    }
}
