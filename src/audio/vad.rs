//! Energy-based voice activity detection for the capture pipeline.
//!
//! A block's loudness is its RMS level; the tracker counts consecutive quiet
//! samples and fires once a full silence window has elapsed. Counting samples
//! rather than blocks keeps the window length independent of whatever buffer
//! size the device driver picked.

/// Root-mean-square level of a sample block, clipped to [0, 1].
pub fn block_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt().min(1.0)
}

/// Tracks trailing silence across capture blocks.
///
/// Feed it one `(rms, block_len)` pair per block; it reports `true` exactly
/// when the accumulated quiet run first reaches the window. Any block at or
/// above the threshold resets the run.
#[derive(Debug)]
pub struct SilenceTracker {
    threshold: f32,
    window_samples: usize,
    quiet_samples: usize,
}

impl SilenceTracker {
    pub fn new(threshold: f32, window_samples: usize) -> Self {
        Self {
            threshold,
            window_samples,
            quiet_samples: 0,
        }
    }

    /// Observe one block. Returns `true` if this block completes the silence
    /// window; callers should stop the capture and [`reset`](Self::reset)
    /// before the next session.
    pub fn observe(&mut self, rms: f32, block_len: usize) -> bool {
        if rms >= self.threshold {
            self.quiet_samples = 0;
            return false;
        }
        let was_below = self.quiet_samples < self.window_samples;
        self.quiet_samples += block_len;
        was_below && self.quiet_samples >= self.window_samples
    }

    /// Clear the accumulated quiet run for a fresh session.
    pub fn reset(&mut self) {
        self.quiet_samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_silence_is_zero() {
        assert_eq!(block_rms(&[0.0; 512]), 0.0);
        assert_eq!(block_rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let rms = block_rms(&[0.5; 1_000]);
        assert!((rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_clips_at_one() {
        assert_eq!(block_rms(&[2.0; 16]), 1.0);
    }

    #[test]
    fn test_fires_after_window_of_silence() {
        // 0.3 s at 16 kHz, fed in 480-sample device blocks
        let mut tracker = SilenceTracker::new(0.01, 4_800);
        for i in 0..9 {
            assert!(!tracker.observe(0.0, 480), "fired early at block {i}");
        }
        // the 10th block brings the run to exactly 4800 samples
        assert!(tracker.observe(0.0, 480));
    }

    #[test]
    fn test_speech_resets_the_run() {
        let mut tracker = SilenceTracker::new(0.01, 4_800);
        for _ in 0..9 {
            assert!(!tracker.observe(0.0, 480));
        }
        // a loud block wipes the accumulated 4320 quiet samples
        assert!(!tracker.observe(0.2, 480));
        for _ in 0..9 {
            assert!(!tracker.observe(0.0, 480));
        }
        assert!(tracker.observe(0.0, 480));
    }

    #[test]
    fn test_fires_only_once_per_run() {
        let mut tracker = SilenceTracker::new(0.01, 1_000);
        assert!(tracker.observe(0.0, 1_000));
        assert!(!tracker.observe(0.0, 1_000));
        tracker.reset();
        assert!(tracker.observe(0.0, 1_000));
    }

    #[test]
    fn test_threshold_boundary_counts_as_speech() {
        let mut tracker = SilenceTracker::new(0.01, 100);
        assert!(!tracker.observe(0.01, 100));
        assert!(!tracker.observe(0.009, 50));
        assert!(tracker.observe(0.009, 50));
    }

    #[test]
    fn test_window_independent_of_block_size() {
        // same 4800-sample window, odd device buffer sizes
        let mut tracker = SilenceTracker::new(0.01, 4_800);
        let mut fired_at = None;
        let mut total = 0usize;
        for i in 0..20 {
            let block = 441; // 44.1 kHz-ish driver quantum
            total += block;
            if tracker.observe(0.0, block) {
                fired_at = Some((i, total));
                break;
            }
        }
        let (_, total) = fired_at.expect("never fired");
        assert!(total >= 4_800);
        assert!(total - 441 < 4_800);
    }
}
