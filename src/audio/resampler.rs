//! Audio resampling and sample processing

use std::sync::{Arc, Mutex};

use rubato::{Resampler, SincFixedIn};
use tokio::sync::mpsc;
use tracing::{error, warn};

use super::types::AudioChunk;
use super::SPEECH_SAMPLE_RATE;

/// Chunk size in samples: one second of audio at 16kHz. The recorder's
/// periodic buffer flush interval follows from this.
pub(crate) const CHUNK_SIZE: usize = 16_000;

/// Process incoming audio samples: convert to mono, optionally resample, buffer, and send chunks
#[allow(clippy::too_many_arguments)]
pub(crate) fn process_samples(
    data: &[i16],
    channels: usize,
    input_buffer: &Arc<Mutex<Vec<i16>>>,
    input_chunk_size: usize,
    output_buffer: &Arc<Mutex<Vec<i16>>>,
    sender: &mpsc::Sender<AudioChunk>,
    resampler: &Option<Arc<Mutex<SincFixedIn<f32>>>>,
) {
    // Convert to mono by averaging channels
    let mono_samples: Vec<i16> = if channels > 1 {
        data.chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    } else {
        data.to_vec()
    };

    if let Some(resampler_arc) = resampler {
        process_with_resampler(
            &mono_samples,
            input_buffer,
            input_chunk_size,
            output_buffer,
            sender,
            resampler_arc,
        );
    } else {
        // Device already runs at the target rate - direct buffering
        process_direct(&mono_samples, output_buffer, sender);
    }
}

/// Process samples with resampling
fn process_with_resampler(
    mono_samples: &[i16],
    input_buffer: &Arc<Mutex<Vec<i16>>>,
    input_chunk_size: usize,
    output_buffer: &Arc<Mutex<Vec<i16>>>,
    sender: &mpsc::Sender<AudioChunk>,
    resampler_arc: &Arc<Mutex<SincFixedIn<f32>>>,
) {
    if let Ok(mut input_buf) = input_buffer.lock() {
        input_buf.extend(mono_samples);

        // Process complete chunks through the resampler
        while input_buf.len() >= input_chunk_size {
            let input_chunk: Vec<i16> = input_buf.drain(..input_chunk_size).collect();

            let input_f32: Vec<f32> = input_chunk.iter().map(|&s| s as f32 / 32768.0).collect();

            if let Ok(mut resampler) = resampler_arc.lock() {
                match resampler.process(&[input_f32], None) {
                    Ok(resampled) => {
                        let output_i16: Vec<i16> = resampled[0]
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                            .collect();

                        if let Ok(mut output_buf) = output_buffer.lock() {
                            output_buf.extend(&output_i16);
                        }
                    }
                    Err(e) => {
                        error!("Resampling error: {}", e);
                    }
                }
            }
        }
    }

    send_chunks(output_buffer, sender);
}

/// Process samples directly without resampling
fn process_direct(
    mono_samples: &[i16],
    output_buffer: &Arc<Mutex<Vec<i16>>>,
    sender: &mpsc::Sender<AudioChunk>,
) {
    if let Ok(mut output_buf) = output_buffer.lock() {
        output_buf.extend(mono_samples);
    }
    send_chunks(output_buffer, sender);
}

/// Flush complete chunks from the output buffer to the recorder
fn send_chunks(output_buffer: &Arc<Mutex<Vec<i16>>>, sender: &mpsc::Sender<AudioChunk>) {
    if let Ok(mut output_buf) = output_buffer.lock() {
        while output_buf.len() >= CHUNK_SIZE {
            let chunk: Vec<i16> = output_buf.drain(..CHUNK_SIZE).collect();
            let audio_chunk = AudioChunk {
                samples: chunk,
                sample_rate: SPEECH_SAMPLE_RATE,
            };
            // Use try_send to avoid blocking the audio callback
            match sender.try_send(audio_chunk) {
                Ok(_) => {}
                Err(e) => {
                    warn!("Audio buffer overflow - chunk dropped: {}", e);
                    return;
                }
            }
        }
    }
}
