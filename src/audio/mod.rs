//! audio - Microphone capture and the render-side PCM pipeline
//!
//! Uses ALSA for capture. Each rendering quantum is accumulated, decimated
//! to the output rate, quantized to 16-bit little-endian PCM and cut into
//! bounded frames on a dedicated render thread.

mod accumulator;
mod alsa_device;
mod audio_system;
pub mod capture;
mod chunker;
pub mod pcm;
mod processor;

pub use audio_system::{AudioConfig, AudioGraph};
pub use capture::{request_audio, CaptureStream};
