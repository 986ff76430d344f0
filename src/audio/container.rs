//! Audio container assembly
//!
//! A stopped recording is assembled into a single audio container chosen
//! from an ordered preference list. Only containers with a compiled-in
//! encoder are eligible; WAV is always available, the compressed formats
//! become eligible if an encoder is ever linked in.

use std::fmt;

use super::types::AudioChunk;

/// Audio container/codec, in submission wire-format terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Opus in a WebM container
    OpusWebm,
    /// WebM with the default codec
    Webm,
    Mp4,
    Wav,
}

/// Container preference order for assembled recordings.
const PREFERRED_FORMATS: [AudioFormat; 4] = [
    AudioFormat::OpusWebm,
    AudioFormat::Webm,
    AudioFormat::Mp4,
    AudioFormat::Wav,
];

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::OpusWebm => "audio/webm;codecs=opus",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::OpusWebm | AudioFormat::Webm => "webm",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Wav => "wav",
        }
    }

    /// Whether this build can actually encode the format.
    fn encoder_available(&self) -> bool {
        matches!(self, AudioFormat::Wav)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// First supported container from the preference list.
pub fn select_format() -> AudioFormat {
    PREFERRED_FORMATS
        .into_iter()
        .find(AudioFormat::encoder_available)
        .unwrap_or(AudioFormat::Wav)
}

/// A complete, encoded recording ready for batch submission.
#[derive(Debug, Clone)]
pub struct AudioRecording {
    pub format: AudioFormat,
    pub data: Vec<u8>,
    /// Number of PCM samples that went into the container.
    pub sample_count: usize,
}

impl AudioRecording {
    /// Assemble accumulated chunks into a single container.
    pub fn assemble(chunks: &[AudioChunk], sample_rate: u32) -> Self {
        let format = select_format();
        let sample_count: usize = chunks.iter().map(|c| c.samples.len()).sum();
        let data = match format {
            AudioFormat::Wav => encode_wav(chunks, sample_rate, sample_count),
            // No other encoder is compiled in; select_format never picks these.
            AudioFormat::OpusWebm | AudioFormat::Webm | AudioFormat::Mp4 => {
                encode_wav(chunks, sample_rate, sample_count)
            }
        };
        Self {
            format,
            data,
            sample_count,
        }
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.sample_count as f64 / sample_rate as f64
    }
}

/// Encode mono 16-bit PCM chunks as a RIFF/WAVE byte stream.
fn encode_wav(chunks: &[AudioChunk], sample_rate: u32, sample_count: usize) -> Vec<u8> {
    const HEADER_LEN: usize = 44;
    let data_len = (sample_count * 2) as u32;
    let byte_rate = sample_rate * 2; // mono, 16-bit
    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for chunk in chunks {
        for sample in &chunk.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }

    out
}
