//! Press counting that arms the voice-capture trigger.
//!
//! Rapid repeated presses start a recognition session. The tracker holds the
//! count and the reset deadline; the controller owns it and awaits the
//! deadline as a cancellable timer.

use tokio::time::{Duration, Instant};

/// What a press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Press counted; the trigger needs more presses.
    Counted(u8),
    /// The press completed the sequence; start voice capture.
    Fired,
}

/// Counts presses toward the capture trigger.
pub struct TapTracker {
    count: u8,
    threshold: u8,
    window: Duration,
    deadline: Option<Instant>,
}

impl TapTracker {
    pub fn new(threshold: u8, window: Duration) -> Self {
        Self { count: 0, threshold: threshold.max(1), window, deadline: None }
    }

    /// Record one press at `now`.
    ///
    /// A press on or after the pending deadline starts a fresh sequence.
    pub fn press(&mut self, now: Instant) -> TapOutcome {
        if self.deadline.is_some_and(|d| now >= d) {
            self.count = 0;
        }

        self.count += 1;
        if self.count >= self.threshold {
            self.reset();
            return TapOutcome::Fired;
        }

        self.deadline = Some(now + self.window);
        TapOutcome::Counted(self.count)
    }

    /// Deadline for the controller's reset timer, armed while a sequence is
    /// in progress.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Abandon the in-progress sequence.
    pub fn reset(&mut self) {
        self.count = 0;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn tracker() -> TapTracker {
        TapTracker::new(3, WINDOW)
    }

    #[test]
    fn fires_on_third_rapid_press() {
        let mut taps = tracker();
        let t0 = Instant::now();

        assert_eq!(taps.press(t0), TapOutcome::Counted(1));
        assert_eq!(taps.press(t0 + Duration::from_millis(100)), TapOutcome::Counted(2));
        assert_eq!(taps.press(t0 + Duration::from_millis(200)), TapOutcome::Fired);
        assert_eq!(taps.deadline(), None);
    }

    #[test]
    fn count_stays_below_threshold_between_firings() {
        let mut taps = tracker();
        let t0 = Instant::now();

        let mut fired = 0;
        for i in 0..9u64 {
            match taps.press(t0 + Duration::from_millis(50 * i)) {
                TapOutcome::Fired => fired += 1,
                TapOutcome::Counted(n) => assert!(n <= 2),
            }
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn gap_at_or_past_window_resets_the_count() {
        let mut taps = tracker();
        let t0 = Instant::now();

        assert_eq!(taps.press(t0), TapOutcome::Counted(1));
        assert_eq!(taps.press(t0 + Duration::from_millis(300)), TapOutcome::Counted(2));
        // The window is measured from the most recent press
        assert_eq!(taps.press(t0 + Duration::from_millis(800)), TapOutcome::Counted(1));
        assert_eq!(taps.press(t0 + Duration::from_millis(900)), TapOutcome::Counted(2));
        assert_eq!(taps.press(t0 + Duration::from_millis(1000)), TapOutcome::Fired);
    }

    #[test]
    fn explicit_reset_abandons_the_sequence() {
        let mut taps = tracker();
        let t0 = Instant::now();

        taps.press(t0);
        taps.press(t0 + Duration::from_millis(100));
        taps.reset();

        assert_eq!(taps.deadline(), None);
        assert_eq!(taps.press(t0 + Duration::from_millis(200)), TapOutcome::Counted(1));
    }

    #[test]
    fn cycles_repeat_indefinitely() {
        let mut taps = tracker();
        let mut t = Instant::now();

        for _ in 0..4 {
            assert_eq!(taps.press(t), TapOutcome::Counted(1));
            t += Duration::from_millis(50);
            assert_eq!(taps.press(t), TapOutcome::Counted(2));
            t += Duration::from_millis(50);
            assert_eq!(taps.press(t), TapOutcome::Fired);
            t += Duration::from_millis(50);
        }
    }
}
