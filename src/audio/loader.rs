// Audio loader - decode a recording to a mono waveform at the target rate
//
// WAV files are read with hound; anything else (MP3, FLAC, OGG, or a WAV
// variant hound rejects) goes through symphonia. Multi-channel audio is
// averaged to mono and resampled with rubato when the source rate differs
// from the pipeline rate.

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::preprocess::stereo_to_mono;
use super::Waveform;
use crate::error::PipelineError;

/// Interleaved PCM as it came out of the container
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

/// Decode an audio file into a mono waveform at `target_sr`
///
/// # Errors
/// `DecodeFailed` if the file cannot be opened, holds no decodable audio
/// track, or decodes to zero samples. `ResampleFailed` if sample-rate
/// conversion fails.
pub fn load_audio<P: AsRef<Path>>(path: P, target_sr: u32) -> Result<Waveform, PipelineError> {
    let path = path.as_ref();
    let decoded = if is_wav(path) {
        match read_wav(path) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(
                    "[AudioLoader] hound rejected {}: {}. Retrying with symphonia",
                    path.display(),
                    err
                );
                decode_with_symphonia(path)?
            }
        }
    } else {
        decode_with_symphonia(path)?
    };

    if decoded.samples.is_empty() {
        return Err(decode_error(path, "file contains no audio samples"));
    }

    let mono = stereo_to_mono(&decoded.samples, decoded.channels);
    tracing::info!(
        "[AudioLoader] Decoded {} ({} ch @ {} Hz, {} frames)",
        path.display(),
        decoded.channels,
        decoded.sample_rate,
        mono.len()
    );

    let samples = if decoded.sample_rate != target_sr {
        resample(&mono, decoded.sample_rate, target_sr)?
    } else {
        mono
    };

    Ok(Waveform::new(samples, target_sr))
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
        .unwrap_or(false)
}

fn decode_error(path: &Path, reason: impl ToString) -> PipelineError {
    PipelineError::DecodeFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_wav(path: &Path) -> Result<DecodedAudio, PipelineError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| decode_error(path, err))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(decode_error(path, "zero channels"));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| decode_error(path, err)))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / i8::MAX as f32)
                        .map_err(|err| decode_error(path, err))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            16 => reader
                .samples::<i16>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / i16::MAX as f32)
                        .map_err(|err| decode_error(path, err))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            24 | 32 => {
                let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|v| v as f32 / max)
                            .map_err(|err| decode_error(path, err))
                    })
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => {
                return Err(decode_error(
                    path,
                    format!("unsupported bits_per_sample={}", bits),
                ))
            }
        },
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
    })
}

fn decode_with_symphonia(path: &Path) -> Result<DecodedAudio, PipelineError> {
    let src = File::open(path).map_err(|err| decode_error(path, err))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| decode_error(path, err))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error(path, "no supported audio tracks"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| decode_error(path, err))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // Track list changed mid-stream; keep what was decoded so far
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(decode_error(path, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(err)) => {
                tracing::warn!(
                    "[AudioLoader] Skipping corrupt packet in {}: {}",
                    path.display(),
                    err
                );
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(decode_error(path, err)),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(decode_error(path, "unknown sample rate or channel layout"));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Resample mono audio from `source_sr` to `target_sr` with sinc interpolation
///
/// `SincFixedIn` output is already time-aligned with its input, so sample 0
/// of the output lines up with sample 0 of the input. The output holds
/// exactly `round(len * target_sr / source_sr)` samples.
pub fn resample(
    samples: &[f32],
    source_sr: u32,
    target_sr: u32,
) -> Result<Vec<f32>, PipelineError> {
    if samples.is_empty() || source_sr == target_sr {
        return Ok(samples.to_vec());
    }
    if source_sr == 0 || target_sr == 0 {
        return Err(PipelineError::ResampleFailed {
            reason: format!("invalid rates {} -> {}", source_sr, target_sr),
        });
    }

    let ratio = target_sr as f64 / source_sr as f64;
    let expected_len = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .map_err(resample_error)?;

    let waves_in = vec![samples.to_vec()];
    let mut output = resampler
        .process(&waves_in, None)
        .map_err(resample_error)?
        .swap_remove(0);

    // Flush the tail still inside the filter
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(resample_error)?;
    if let Some(channel) = tail.into_iter().next() {
        output.extend(channel);
    }

    output.resize(expected_len, 0.0);

    tracing::debug!(
        "[AudioLoader] Resampled {} Hz -> {} Hz ({} -> {} samples)",
        source_sr,
        target_sr,
        samples.len(),
        output.len()
    );

    Ok(output)
}

fn resample_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::ResampleFailed {
        reason: err.to_string(),
    }
}
