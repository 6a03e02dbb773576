//! WAV encoding and decoding
//!
//! Frames are kept as f32 in [-1.0, 1.0] while recording and converted to
//! integer PCM at the configured bit depth when a session is saved.

use crate::config::AudioSettings;
use std::io::Cursor;

/// Encode f32 frames into a WAV container at the configured parameters
pub fn encode_wav(frames: &[f32], settings: &AudioSettings) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: settings.channels,
        sample_rate: settings.sample_rate,
        bits_per_sample: settings.bit_depth,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut buffer, spec)?;

    match settings.bit_depth {
        8 => {
            for &frame in frames {
                writer.write_sample((frame.clamp(-1.0, 1.0) * f32::from(i8::MAX)) as i8)?;
            }
        }
        16 => {
            for &frame in frames {
                writer.write_sample((frame.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
            }
        }
        24 | 32 => {
            // hound packs i32 samples down to the spec'd width
            let amplitude = ((1i64 << (settings.bit_depth - 1)) - 1) as f64;
            for &frame in frames {
                writer.write_sample((f64::from(frame.clamp(-1.0, 1.0)) * amplitude) as i32)?;
            }
        }
        _ => return Err(hound::Error::Unsupported),
    }

    writer.finalize()?;
    Ok(buffer.into_inner())
}

/// Decode a WAV container back into its parameters and integer samples
pub fn decode_wav(bytes: &[u8]) -> Result<(hound::WavSpec, Vec<i32>), hound::Error> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = reader.samples::<i32>().collect::<Result<Vec<_>, _>>()?;
    Ok((spec, samples))
}
