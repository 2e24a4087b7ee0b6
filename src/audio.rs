use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam::channel::Sender;
use std::sync::Arc;
use tracing::{error, info};

use crate::buffer::{FrameAssembler, FrameQueue};
use crate::error::VizError;

/// Names of all input devices on the default host.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.input_devices()? {
        names.push(dev.name().unwrap_or_else(|_| "<unknown>".into()));
    }
    Ok(names)
}

/// First input device whose name contains `want` (case-insensitive),
/// else the default input device.
pub fn pick_input_device(want: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(want) = want {
        let want = want.to_lowercase();
        if let Ok(devices) = host.input_devices() {
            for dev in devices {
                if let Ok(name) = dev.name() {
                    if name.to_lowercase().contains(&want) {
                        return Ok(dev);
                    }
                }
            }
        }
        anyhow::bail!("input device matching '{}' not found", want);
    }

    host.default_input_device()
        .context("No default input device")
}

pub fn best_config_for(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let supported = device.default_input_config()?;
    let format = supported.sample_format();
    let mut cfg = supported.config();
    cfg.sample_rate.0 = cfg.sample_rate.0.clamp(44_100, 48_000);
    Ok((cfg, format))
}

/// Builds an input stream that cuts mono frames of `frame_len` samples
/// into `queue`. Stream faults are forwarded on `errors`.
pub fn build_stream<T>(
    device: &Device,
    cfg: &StreamConfig,
    queue: Arc<FrameQueue>,
    frame_len: usize,
    errors: Sender<VizError>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut assembler = FrameAssembler::new(frame_len, cfg.channels as usize);
    let err_fn = move |e: cpal::StreamError| {
        error!("Stream error: {}", e);
        let _ = errors.try_send(VizError::AudioCapture(e.to_string()));
    };

    let stream = device.build_input_stream(
        cfg,
        move |data: &[T], _| {
            assembler.push_interleaved(
                data.iter().map(|&s| f32::from_sample(s)),
                &queue,
            );
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// A running capture stream. Dropping it closes the stream.
pub struct Capture {
    _stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

pub fn start_capture(
    want: Option<&str>,
    queue: Arc<FrameQueue>,
    frame_len: usize,
    errors: Sender<VizError>,
) -> Result<Capture> {
    let device = pick_input_device(want)?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());
    let (cfg, format) = best_config_for(&device)?;

    let stream = match format {
        SampleFormat::F32 => build_stream::<f32>(&device, &cfg, queue, frame_len, errors)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &cfg, queue, frame_len, errors)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &cfg, queue, frame_len, errors)?,
        other => anyhow::bail!("Unsupported sample format: {other:?}"),
    };
    stream.play().context("failed to start audio stream")?;

    info!(
        "capturing from '{}' ({} ch @ {} Hz, {} samples per frame)",
        device_name, cfg.channels, cfg.sample_rate.0, frame_len
    );

    Ok(Capture {
        _stream: stream,
        device_name,
        sample_rate: cfg.sample_rate.0,
        channels: cfg.channels,
    })
}
