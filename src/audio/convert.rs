//! Conversion from a device's native PCM layout to the pipeline target
//! format: mono float32 at the target rate.

/// Downmix interleaved multi-channel samples to mono by averaging the
/// channels of each frame. Mono input is copied through unchanged.
pub fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler.
///
/// Output length is `round(input_len * rate_out / rate_in)`. Positions past
/// the final input sample repeat it, so short blocks never read out of
/// bounds. Good enough for speech snippets; the capture path favors latency
/// over phase accuracy.
pub fn resample(input: &[f32], rate_in: u32, rate_out: u32) -> Vec<f32> {
    if rate_in == 0 || input.is_empty() {
        return input.to_vec();
    }
    if rate_in == rate_out {
        return input.to_vec();
    }

    let ratio = rate_out as f64 / rate_in as f64;
    let output_len = (input.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < input.len() {
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        } else {
            *input.last().unwrap_or(&0.0)
        };
        output.push(sample);
    }

    output
}

/// Convert an interleaved native block to mono at `rate_out`.
///
/// Mono input already at the target rate is copied through without touching
/// the resampler.
pub fn to_target(interleaved: &[f32], channels: u16, rate_in: u32, rate_out: u32) -> Vec<f32> {
    if channels <= 1 && rate_in == rate_out {
        return interleaved.to_vec();
    }
    let mono = downmix_to_mono(interleaved, channels);
    resample(&mono, rate_in, rate_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TARGET_SAMPLE_RATE;

    #[test]
    fn test_downmix_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_downmix_averages_channels() {
        // Two stereo frames: (0.2, 0.4) and (-1.0, 1.0)
        let interleaved = vec![0.2, 0.4, -1.0, 1.0];
        let mono = downmix_to_mono(&interleaved, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn test_resample_same_rate_noop() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_output_length_rounding() {
        let samples = vec![0.0f32; 480];
        let out = resample(&samples, 48_000, 16_000);
        assert_eq!(out.len(), 160);

        let odd = vec![0.0f32; 441];
        let out = resample(&odd, 44_100, 16_000);
        // round(441 * 16000 / 44100) = round(160.0) = 160
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn test_resample_duration_property() {
        // |out_duration - in_duration| < one output frame, across native rates.
        for rate in [8_000u32, 22_050, 44_100, 48_000, 96_000] {
            let input_len = rate as usize; // exactly one second
            let input = vec![0.25f32; input_len];
            let out = resample(&input, rate, TARGET_SAMPLE_RATE);
            let out_duration = out.len() as f64 / TARGET_SAMPLE_RATE as f64;
            assert!(
                (out_duration - 1.0).abs() < 1.0 / TARGET_SAMPLE_RATE as f64,
                "rate {rate}: duration {out_duration}"
            );
        }
    }

    #[test]
    fn test_resample_preserves_dc_level() {
        let input = vec![0.5f32; 4_410];
        let out = resample(&input, 44_100, 16_000);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-4));
    }

    #[test]
    fn test_to_target_fast_path() {
        let samples = vec![0.1, -0.1, 0.2];
        let out = to_target(&samples, 1, TARGET_SAMPLE_RATE, TARGET_SAMPLE_RATE);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_to_target_stereo_48k() {
        // One second of interleaved stereo at 48 kHz collapses to one second
        // of mono at 16 kHz.
        let frames = 48_000usize;
        let mut interleaved = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved.push(0.4);
            interleaved.push(0.2);
        }
        let out = to_target(&interleaved, 2, 48_000, TARGET_SAMPLE_RATE);
        assert_eq!(out.len(), 16_000);
        assert!(out.iter().all(|s| (s - 0.3).abs() < 1e-4));
    }
}
