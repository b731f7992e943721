//! ALSA PCM capture device wrapper.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use std::io::ErrorKind;

use crate::error::CaptureError;

/// Parameters negotiated with the ALSA hardware.
///
/// Rate and channel count are checked in `open_capture`; only the period
/// size can legitimately differ from what was asked for.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Period size in frames
    pub period_size: usize,
}

/// Open a mono f32 capture device with a period close to `period_size`.
pub fn open_capture(
    device: &str,
    sample_rate: u32,
    period_size: usize,
) -> Result<(PCM, AlsaParams), CaptureError> {
    let pcm = PCM::new(device, Direction::Capture, false)
        .map_err(|e| classify(device, "open", e))?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm).map_err(|e| classify(device, "HwParams", e))?;
        hwp.set_access(Access::RWInterleaved)
            .map_err(|e| unsupported(device, "interleaved access", e))?;
        hwp.set_format(Format::float())
            .map_err(|e| unsupported(device, "f32 samples", e))?;
        hwp.set_channels(1)
            .map_err(|e| unsupported(device, "mono input", e))?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)
            .map_err(|e| unsupported(device, "sample rate", e))?;
        hwp.set_period_size_near(period_size as alsa::pcm::Frames, ValueOr::Nearest)
            .map_err(|e| unsupported(device, "period size", e))?;
        pcm.hw_params(&hwp)
            .map_err(|e| classify(device, "hw_params", e))?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, actual_period) = {
        let hwp = pcm
            .hw_params_current()
            .map_err(|e| classify(device, "hw_params_current", e))?;
        let rate = hwp.get_rate().map_err(|e| classify(device, "get_rate", e))?;
        let ch = hwp.get_channels().map_err(|e| classify(device, "get_channels", e))?;
        let ps = hwp
            .get_period_size()
            .map_err(|e| classify(device, "get_period_size", e))? as usize;
        (rate, ch, ps)
    };

    // 整数抽取要求硬件采样率与配置完全一致
    if actual_rate != sample_rate {
        return Err(CaptureError::NotSupported(format!(
            "device '{}' negotiated {} Hz, {} Hz required",
            device, actual_rate, sample_rate
        )));
    }

    if actual_channels != 1 {
        return Err(CaptureError::NotSupported(format!(
            "device '{}' negotiated {} channels, mono required",
            device, actual_channels
        )));
    }

    let params = AlsaParams {
        period_size: actual_period,
    };

    log::info!(
        "ALSA Capture: device={}, rate={}, channels={}, period_size={}",
        device,
        actual_rate,
        actual_channels,
        actual_period,
    );

    Ok((pcm, params))
}

/// Map an ALSA failure onto the capture error taxonomy using its errno.
pub(crate) fn classify(device: &str, op: &str, e: alsa::Error) -> CaptureError {
    let kind = std::io::Error::from_raw_os_error(e.errno().abs()).kind();
    match kind {
        ErrorKind::PermissionDenied => CaptureError::PermissionDenied(device.to_string()),
        ErrorKind::NotFound => CaptureError::DeviceNotFound(device.to_string()),
        _ => CaptureError::Device(format!("{} on '{}': {}", op, device, e)),
    }
}

fn unsupported(device: &str, what: &str, e: alsa::Error) -> CaptureError {
    CaptureError::NotSupported(format!("'{}' rejected {}: {}", device, what, e))
}
