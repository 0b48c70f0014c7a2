use std::{io::Cursor, path::Path, time::Duration};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{Result, SoundCueError};

/// Decoded, ready-to-play audio held in memory.
///
/// Samples are interleaved `f32` values in `[-1, 1]`. The buffer is never
/// mutated after decoding so it can be shared between concurrent voices.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Turns encoded asset bytes into a [`DecodedBuffer`].
///
/// Implementations are synchronous and may be CPU heavy; the service runs
/// them on the blocking pool.
pub trait AudioDecoder: Send + Sync {
    /// Decodes `bytes` fetched from `path`. The path is only used for format
    /// hints and error messages.
    fn decode(&self, path: &str, bytes: Vec<u8>) -> Result<DecodedBuffer>;
}

/// Decoder backed by symphonia's default codec and format registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &str, bytes: Vec<u8>) -> Result<DecodedBuffer> {
        if bytes.is_empty() {
            return Err(SoundCueError::decode(path, "asset is empty"));
        }

        let mut hint = Hint::new();
        if let Some(extension) = Path::new(path).extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| SoundCueError::decode(path, err))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SoundCueError::decode(path, "no decodable audio track"))?;
        let track_id = track.id;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| SoundCueError::decode(path, err))?;

        let mut samples = Vec::new();
        let mut layout: Option<(u16, u32)> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(err) => return Err(SoundCueError::decode(path, err)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut block = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    block.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(block.samples());
                    if layout.is_none() {
                        layout = Some((spec.channels.count() as u16, spec.rate));
                    }
                }
                // Corrupt frames are skipped; the rest of the stream is still usable.
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!(path, %reason, "skipping undecodable packet");
                }
                Err(err) => return Err(SoundCueError::decode(path, err)),
            }
        }

        match layout {
            Some((channels, sample_rate)) if !samples.is_empty() => {
                Ok(DecodedBuffer::new(samples, channels, sample_rate))
            }
            _ => Err(SoundCueError::decode(path, "stream contained no audio")),
        }
    }
}
