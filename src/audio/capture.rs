//! cpal-based audio capture
//!
//! Note: cpal::Stream is not Send, so the stream lives on a dedicated
//! thread for the whole recording; the session communicates with it only
//! through the shared frame sink and a stop channel.

use super::{CaptureBackend, CaptureStream};
use crate::config::AudioSettings;
use crate::error::AudioError;
use crate::session::CaptureShared;
use std::sync::Arc;
use std::thread;

/// Capture parameters the callback converts incoming audio to
#[derive(Debug, Clone, Copy)]
struct TargetFormat {
    rate: u32,
    channels: u16,
}

/// cpal capture backend
pub struct CpalBackend;

/// Handle to an open stream; dropping the thread-side stream releases the device
struct CpalStream {
    stop_tx: std::sync::mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureStream for CpalStream {
    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| AudioError::StreamError("capture thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl CaptureBackend for CpalBackend {
    fn open(
        &self,
        settings: &AudioSettings,
        sink: Arc<CaptureShared>,
    ) -> Result<Box<dyn CaptureStream>, AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = if settings.device == "default" {
            host.default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("default".to_string()))?
        } else {
            find_input_device(&host, &settings.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        let source_rate = supported.sample_rate();
        let source_channels = supported.channels();
        let sample_format = supported.sample_format();
        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format {:?}",
            source_rate.0,
            source_channels,
            sample_format
        );

        let target = TargetFormat {
            rate: settings.sample_rate,
            channels: settings.channels,
        };
        let buffer_frames = settings.buffer_size;

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            use cpal::traits::StreamTrait;

            let build = |buffer_size: cpal::BufferSize| -> Result<cpal::Stream, AudioError> {
                let stream_config = cpal::StreamConfig {
                    channels: source_channels,
                    sample_rate: source_rate,
                    buffer_size,
                };
                match sample_format {
                    cpal::SampleFormat::F32 => build_stream::<f32>(
                        &device,
                        &stream_config,
                        sink.clone(),
                        usize::from(source_channels),
                        target,
                    ),
                    cpal::SampleFormat::I16 => build_stream::<i16>(
                        &device,
                        &stream_config,
                        sink.clone(),
                        usize::from(source_channels),
                        target,
                    ),
                    cpal::SampleFormat::U16 => build_stream::<u16>(
                        &device,
                        &stream_config,
                        sink.clone(),
                        usize::from(source_channels),
                        target,
                    ),
                    format => Err(AudioError::StreamError(format!(
                        "unsupported sample format: {:?}",
                        format
                    ))),
                }
            };

            // Some hosts reject fixed buffer sizes; retry with the default.
            let stream_result = build(cpal::BufferSize::Fixed(buffer_frames)).or_else(|e| {
                tracing::debug!(
                    "Fixed buffer size of {} frames rejected ({}), using device default",
                    buffer_frames,
                    e
                );
                build(cpal::BufferSize::Default)
            });

            let stream = match stream_result {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            tracing::debug!("Audio capture thread started");

            // Park until the session closes the stream.
            let _ = stop_rx.recv();
            drop(stream);
            tracing::debug!("Audio capture thread stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalStream {
                stop_tx,
                handle: Some(handle),
            })),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(AudioError::StreamError(
                "capture thread exited before the stream came up".to_string(),
            )),
        }
    }
}

/// Find an input device by name: exact match first, then case-insensitive
/// substring so short PipeWire/PulseAudio names work too.
fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?;

    let search = name.to_lowercase();
    let mut substring_match = None;

    for device in devices {
        if let Ok(device_name) = device.name() {
            if device_name == name {
                tracing::debug!("Found audio device by exact match: {}", device_name);
                return Ok(device);
            }
            if substring_match.is_none() && device_name.to_lowercase().contains(&search) {
                tracing::debug!(
                    "Found audio device by substring match: {} (searched for: {})",
                    device_name,
                    name
                );
                substring_match = Some(device);
            }
        }
    }

    substring_match.ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: Arc<CaptureShared>,
    source_channels: usize,
    target: TargetFormat,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let source_rate = config.sample_rate.0;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let frames = remix(data, source_channels, target.channels);
                let frames = if source_rate == target.rate {
                    frames
                } else {
                    resample(&frames, target.channels, source_rate, target.rate)
                };
                sink.push(&frames);
            },
            |err| tracing::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Convert device samples to f32 at the configured channel count
fn remix<T>(data: &[T], source_channels: usize, target_channels: u16) -> Vec<f32>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let source_channels = source_channels.max(1);
    let to_f32 = |s: &T| <f32 as cpal::FromSample<T>>::from_sample_(*s);

    let mut out = Vec::with_capacity(
        data.len() / source_channels * usize::from(target_channels.max(1)),
    );
    for frame in data.chunks(source_channels) {
        match target_channels {
            2 => {
                let left = frame.first().map(to_f32).unwrap_or(0.0);
                let right = frame.get(1).map(to_f32).unwrap_or(left);
                out.push(left);
                out.push(right);
            }
            _ => {
                let sum: f32 = frame.iter().map(to_f32).sum();
                out.push(sum / frame.len() as f32);
            }
        }
    }
    out
}

/// Linear interpolation resampling, frame-wise so stereo stays interleaved
fn resample(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let channels = usize::from(channels.max(1));
    let frames = samples.len() / channels;
    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let new_frames = (frames as f64 * ratio).ceil() as usize;

    let mut out = Vec::with_capacity(new_frames * channels);
    for i in 0..new_frames {
        let src = i as f64 / ratio;
        let idx = src.floor() as usize;
        let frac = (src - idx as f64) as f32;
        for c in 0..channels {
            let a = samples.get(idx * channels + c).copied().unwrap_or(0.0);
            let b = samples.get((idx + 1) * channels + c).copied().unwrap_or(a);
            out.push(a * (1.0 - frac) + b * frac);
        }
    }
    out
}
