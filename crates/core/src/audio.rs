//! Audio byte helpers
//!
//! The wire carries 16-bit little-endian PCM. These helpers convert between
//! raw bytes and sample values and build the WAV header used when
//! `add_wav_header` is enabled on the serializer.

/// Default sample rate assumed for raw caller audio (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default channel count assumed for raw caller audio.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Decode 16-bit little-endian PCM bytes into samples. A trailing odd byte
/// is ignored.
pub fn pcm_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Encode samples as 16-bit little-endian PCM bytes.
pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        pcm.extend_from_slice(&sample.to_le_bytes());
    }
    pcm
}

/// Root-mean-square level of a PCM byte buffer, normalized to 0.0..=1.0.
/// Returns 0.0 for an empty buffer.
pub fn pcm_rms(pcm: &[u8]) -> f32 {
    let samples = pcm_to_samples(pcm);
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Build a 44-byte RIFF/WAVE header announcing 16-bit PCM data of
/// `data_len` bytes.
pub fn wav_header(sample_rate: u32, channels: u16, data_len: u32) -> [u8; 44] {
    const BITS_PER_SAMPLE: u16 = 16;
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

/// Wrap raw PCM bytes in a complete WAV file image.
pub fn wrap_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(&wav_header(sample_rate, channels, pcm.len() as u32));
    wav.extend_from_slice(pcm);
    wav
}
