use std::time::Duration;

/// A one-shot or repeating timer driven by the host clock.
///
/// Nothing fires on its own: the owner passes the current time to
/// [`ScheduledTask::poll`] once per frame and acts when it returns true.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    delay: Duration,
    repeating: bool,
    due: Option<Duration>,
}

impl ScheduledTask {
    pub fn once(delay: Duration) -> Self {
        Self {
            delay,
            repeating: false,
            due: None,
        }
    }

    pub fn repeating(interval: Duration) -> Self {
        Self {
            delay: interval,
            repeating: true,
            due: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Arm (or re-arm) the timer relative to `now`.
    pub fn schedule(&mut self, now: Duration) {
        self.due = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Duration> {
        self.due
    }

    /// True once per expiry. Repeating timers re-arm from `now`, so a long
    /// stall fires once rather than catching up.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = if self.repeating {
                    Some(now + self.delay)
                } else {
                    None
                };
                true
            }
            _ => false,
        }
    }
}

/// Tracks when an action last ran and whether enough time has passed to run
/// it again.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Duration>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A fresh throttle is always ready.
    pub fn ready(&self, now: Duration) -> bool {
        self.last
            .is_none_or(|last| now.saturating_sub(last) >= self.interval)
    }

    pub fn mark(&mut self, now: Duration) {
        self.last = Some(now);
    }

    /// `ready` and `mark` in one step.
    pub fn try_act(&mut self, now: Duration) -> bool {
        if !self.ready(now) {
            return false;
        }
        self.mark(now);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Seconds as a [`Duration`] rounded to the microsecond, so configured
/// values like 0.1 land on exact millisecond boundaries. Negative and
/// non-finite input becomes zero.
pub fn secs(s: f32) -> Duration {
    if s.is_finite() && s > 0.0 {
        Duration::from_micros((f64::from(s) * 1e6).round() as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn one_shot_fires_once() {
        let mut t = ScheduledTask::once(ms(100));
        assert!(!t.poll(ms(1000)));

        t.schedule(ms(0));
        assert!(!t.poll(ms(99)));
        assert!(t.poll(ms(100)));
        assert!(!t.poll(ms(500)));
        assert!(!t.is_pending());
    }

    #[test]
    fn rescheduling_pushes_deadline() {
        let mut t = ScheduledTask::once(ms(100));
        t.schedule(ms(0));
        t.schedule(ms(80));
        assert!(!t.poll(ms(150)));
        assert!(t.poll(ms(180)));
    }

    #[test]
    fn repeating_rearms_from_now() {
        let mut t = ScheduledTask::repeating(ms(6000));
        t.schedule(ms(0));
        assert!(t.poll(ms(6000)));
        assert!(!t.poll(ms(11_999)));
        assert!(t.poll(ms(12_000)));
        // stalled for several intervals: one fire
        assert!(t.poll(ms(40_000)));
        assert!(!t.poll(ms(40_001)));
        assert_eq!(t.due(), Some(ms(46_000)));
    }

    #[test]
    fn cancel_stops_repeating() {
        let mut t = ScheduledTask::repeating(ms(10));
        t.schedule(ms(0));
        t.cancel();
        assert!(!t.poll(ms(100)));
    }

    #[test]
    fn throttle_limits_rate() {
        let mut th = Throttle::new(ms(100));
        assert!(th.try_act(ms(0)));
        assert!(!th.try_act(ms(50)));
        assert!(th.try_act(ms(100)));
        th.reset();
        assert!(th.ready(ms(101)));
    }

    #[test]
    fn secs_clamps_bad_input() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f32::NAN), Duration::ZERO);
        assert_eq!(secs(0.5), ms(500));
        assert_eq!(secs(0.1), ms(100));
    }
}
