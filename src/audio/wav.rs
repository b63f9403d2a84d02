//! Minimal 16-bit PCM WAV encoding and decoding.
//!
//! The encoder produces the exact container the recognition engines and the
//! paste target expect: RIFF/WAVE, PCM, mono, 16-bit little-endian. The
//! decoder walks chunks so WAVs with extra metadata (LIST, fact) still parse.

use crate::domain::CoreError;

/// A decoded WAV payload in float32 form.
#[derive(Debug)]
pub struct DecodedWav {
    /// Interleaved samples scaled to [-1, 1].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

const HEADER_LEN: usize = 44;

/// Encode mono float32 samples as a 16-bit PCM WAV file.
///
/// Samples are quantized with `clamp(round(s * 32768), -32768, 32767)`, so
/// full-scale input maps onto the full i16 range. Empty input yields a valid
/// header-only file.
pub fn encode(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_size = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk: PCM, mono, 16-bit
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // channels
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        let quantized = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        out.extend_from_slice(&quantized.to_le_bytes());
    }

    out
}

/// Decode a 16-bit PCM WAV file into float32 samples.
///
/// Only integer PCM with 16 bits per sample is accepted. Multi-channel data
/// is returned interleaved; callers downmix via [`super::convert`].
pub fn decode(bytes: &[u8]) -> Result<DecodedWav, CoreError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CoreError::InvalidAudioFormat(
            "not a RIFF/WAVE file".to_string(),
        ));
    }

    let mut fmt: Option<(u16, u16, u32, u16)> = None; // format tag, channels, rate, bits
    let mut data: Option<&[u8]> = None;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;
        let body_start = pos + 8;
        let body_end = body_start.checked_add(size).filter(|&end| end <= bytes.len());
        let Some(body_end) = body_end else {
            return Err(CoreError::InvalidAudioFormat(format!(
                "chunk {:?} overruns file",
                String::from_utf8_lossy(id)
            )));
        };
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(CoreError::InvalidAudioFormat(
                        "fmt chunk too short".to_string(),
                    ));
                }
                let format_tag = u16::from_le_bytes([body[0], body[1]]);
                let channels = u16::from_le_bytes([body[2], body[3]]);
                let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let bits = u16::from_le_bytes([body[14], body[15]]);
                fmt = Some((format_tag, channels, sample_rate, bits));
            }
            b"data" => {
                data = Some(body);
            }
            _ => {} // skip LIST, fact, and friends
        }

        // chunks are word-aligned
        pos = body_end + (size & 1);
    }

    let (format_tag, channels, sample_rate, bits) = fmt.ok_or_else(|| {
        CoreError::InvalidAudioFormat("missing fmt chunk".to_string())
    })?;
    let data = data
        .ok_or_else(|| CoreError::InvalidAudioFormat("missing data chunk".to_string()))?;

    if format_tag != 1 {
        return Err(CoreError::InvalidAudioFormat(format!(
            "unsupported format tag {format_tag}, expected PCM"
        )));
    }
    if bits != 16 {
        return Err(CoreError::InvalidAudioFormat(format!(
            "unsupported bit depth {bits}, expected 16"
        )));
    }
    if channels == 0 {
        return Err(CoreError::InvalidAudioFormat("zero channels".to_string()));
    }

    let samples = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(DecodedWav {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_fields() {
        let wav = encode(&[0.0; 160], 16_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // PCM tag, mono
        assert_eq!(u16::from_le_bytes([wav[20], wav[21]]), 1);
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        // sample rate and derived byte rate / block align
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16_000);
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 32_000);
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 2);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        // data chunk size = 2 bytes per sample
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 320);
        assert_eq!(wav.len(), 44 + 320);
    }

    #[test]
    fn test_encode_empty_is_header_only() {
        let wav = encode(&[], 16_000);
        assert_eq!(wav.len(), 44);
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 0);
    }

    #[test]
    fn test_encode_full_scale_boundaries() {
        let wav = encode(&[1.0, -1.0], 16_000);
        let hi = i16::from_le_bytes([wav[44], wav[45]]);
        let lo = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(hi, 32_767);
        assert_eq!(lo, -32_768);
    }

    #[test]
    fn test_roundtrip_preserves_samples() {
        let samples: Vec<f32> = (0..1_000).map(|i| ((i as f32) * 0.01).sin() * 0.8).collect();
        let wav = encode(&samples, 16_000);
        let decoded = decode(&wav).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded.samples) {
            // one quantization step of error at most
            assert!((a - b).abs() <= 1.0 / 32_768.0, "{a} vs {b}");
        }
    }

    #[test]
    fn test_tone_at_native_rate_encodes_to_target_rate() {
        // One second of a 440 Hz tone at 48 kHz, through the converter and
        // into a WAV: 16 kHz mono, 32 000 data bytes.
        let samples: Vec<f32> = (0..48_000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48_000.0).sin() * 0.5)
            .collect();
        let converted = crate::audio::convert::to_target(&samples, 1, 48_000, 16_000);
        let wav = encode(&converted, 16_000);

        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 32_000);
        assert_eq!(wav.len(), 44 + 32_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"not a wav file at all"),
            Err(CoreError::InvalidAudioFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_chunk() {
        let mut wav = encode(&[0.5; 100], 16_000);
        wav.truncate(60);
        assert!(decode(&wav).is_err());
    }

    #[test]
    fn test_decode_rejects_float_format() {
        let mut wav = encode(&[0.0; 4], 16_000);
        // flip the format tag to IEEE float
        wav[20] = 3;
        assert!(matches!(
            decode(&wav),
            Err(CoreError::InvalidAudioFormat(msg)) if msg.contains("format tag")
        ));
    }

    #[test]
    fn test_decode_skips_unknown_chunks() {
        let inner = encode(&[0.25, -0.25], 16_000);
        let mut wav = Vec::new();
        wav.extend_from_slice(&inner[0..12]);
        // splice a junk chunk between the header and fmt
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&4u32.to_le_bytes());
        wav.extend_from_slice(b"info");
        wav.extend_from_slice(&inner[12..]);
        // fix up the RIFF size
        let riff_size = (wav.len() - 8) as u32;
        wav[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let decoded = decode(&wav).unwrap();
        assert_eq!(decoded.samples.len(), 2);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
    }
}
