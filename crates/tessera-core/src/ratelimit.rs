//! Sliding-window request admission.
//!
//! Flood mitigation for the verifier: a fixed-size window of recent
//! request timestamps. A request is admitted only if fewer than `cap`
//! requests landed within the last `window`; rejected requests are not
//! recorded, so an attacker cannot keep a victim locked out by hammering
//! the endpoint.

use std::{collections::VecDeque, ops::Sub, time::Duration};

/// Default window width.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Default admissions per window.
pub const DEFAULT_CAP: usize = 50;

/// Sliding-window counter over an abstract monotonic instant.
///
/// Generic over the instant type so it runs identically on the system
/// clock and on a simulated one.
#[derive(Debug, Clone)]
pub struct RequestWindow<I> {
    window: Duration,
    cap: usize,
    admitted: VecDeque<I>,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request was recorded and may proceed
    Admitted,
    /// The window is full; retry after the given duration
    Rejected {
        /// Time until the oldest in-window admission expires
        retry_after: Duration,
    },
}

impl<I> RequestWindow<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a window admitting at most `cap` requests per `window`.
    #[must_use]
    pub fn new(window: Duration, cap: usize) -> Self {
        Self { window, cap, admitted: VecDeque::with_capacity(cap) }
    }

    /// Create a window with the default parameters.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_CAP)
    }

    /// Check whether a request arriving at `now` is admitted, and record
    /// it if so.
    ///
    /// Admissions whose age has reached the window width are evicted
    /// first; a request is rejected exactly when the window still holds
    /// `cap` live admissions.
    pub fn try_admit(&mut self, now: I) -> Admission {
        while let Some(&oldest) = self.admitted.front() {
            if now - oldest >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() >= self.cap {
            let oldest = *self
                .admitted
                .front()
                .expect("a full window holds at least one admission");
            let retry_after = self.window - (now - oldest);
            return Admission::Rejected { retry_after };
        }

        self.admitted.push_back(now);
        Admission::Admitted
    }

    /// Number of admissions currently inside the window (as of the last
    /// [`RequestWindow::try_admit`] call).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.admitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Millisecond tick standing in for a monotonic clock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Tick(u64);

    impl Sub for Tick {
        type Output = Duration;

        fn sub(self, rhs: Tick) -> Duration {
            Duration::from_millis(self.0 - rhs.0)
        }
    }

    #[test]
    fn admits_up_to_cap_then_rejects() {
        let mut window = RequestWindow::new(Duration::from_millis(100), 50);
        for _ in 0..50 {
            assert_eq!(window.try_admit(Tick(0)), Admission::Admitted);
        }
        assert_eq!(
            window.try_admit(Tick(50)),
            Admission::Rejected { retry_after: Duration::from_millis(50) }
        );
    }

    #[test]
    fn spaced_requests_never_rejected() {
        // 50 requests 3 ms apart span 147 ms; eviction keeps the window
        // well under the cap throughout.
        let mut window = RequestWindow::with_defaults();
        for i in 0..50u64 {
            assert_eq!(window.try_admit(Tick(i * 3)), Admission::Admitted);
        }
    }

    #[test]
    fn rejections_are_not_recorded() {
        let mut window = RequestWindow::new(Duration::from_millis(100), 2);
        assert_eq!(window.try_admit(Tick(0)), Admission::Admitted);
        assert_eq!(window.try_admit(Tick(0)), Admission::Admitted);
        for _ in 0..100 {
            assert!(matches!(window.try_admit(Tick(10)), Admission::Rejected { .. }));
        }
        assert_eq!(window.live_count(), 2);
        // Once the original pair ages out, admission resumes.
        assert_eq!(window.try_admit(Tick(100)), Admission::Admitted);
    }

    #[test]
    fn eviction_is_inclusive_at_window_edge() {
        let mut window = RequestWindow::new(Duration::from_millis(100), 1);
        assert_eq!(window.try_admit(Tick(0)), Admission::Admitted);
        assert!(matches!(window.try_admit(Tick(99)), Admission::Rejected { .. }));
        assert_eq!(window.try_admit(Tick(100)), Admission::Admitted);
    }
}
