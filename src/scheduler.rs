use std::time::{Duration, Instant};

/// Periodic timer service supplied by the host
pub trait Scheduler {
    /// Arm the timer, or re-arm it with a new period
    fn schedule_periodic(&mut self, period: Duration);
    fn cancel(&mut self);
}

/// Receives timer expiries. The scheduler is handed back so the handler
/// can re-arm or cancel its own timer.
pub trait TimerHandler {
    fn on_timer(&mut self, scheduler: &mut dyn Scheduler);
}

/// Deadline timer polled by a host event loop
#[derive(Debug, Clone, Default)]
pub struct IntervalTimer {
    period: Option<Duration>,
    deadline: Option<Instant>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the next expiry, zero if already due
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire the handler if the deadline has passed. The next deadline is
    /// set before the handler runs, so a handler that does not re-arm keeps
    /// the current period.
    pub fn fire_if_due(&mut self, now: Instant, handler: &mut dyn TimerHandler) -> bool {
        match (self.deadline, self.period) {
            (Some(deadline), Some(period)) if deadline <= now => {
                self.deadline = Some(now + period);
                handler.on_timer(self);
                true
            }
            _ => false,
        }
    }
}

impl Scheduler for IntervalTimer {
    fn schedule_periodic(&mut self, period: Duration) {
        self.period = Some(period);
        self.deadline = Some(Instant::now() + period);
    }

    fn cancel(&mut self) {
        self.period = None;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        fired: usize,
        cancel_after: Option<usize>,
    }

    impl TimerHandler for Counter {
        fn on_timer(&mut self, scheduler: &mut dyn Scheduler) {
            self.fired += 1;
            if self.cancel_after == Some(self.fired) {
                scheduler.cancel();
            }
        }
    }

    #[test]
    fn test_unarmed_timer_never_fires() {
        let mut timer = IntervalTimer::new();
        let mut counter = Counter::default();
        assert!(!timer.fire_if_due(Instant::now(), &mut counter));
        assert_eq!(timer.time_until_due(Instant::now()), None);
        assert_eq!(counter.fired, 0);
    }

    #[test]
    fn test_fires_only_after_deadline() {
        let mut timer = IntervalTimer::new();
        let mut counter = Counter::default();
        timer.schedule_periodic(Duration::from_secs(60));
        let deadline = timer.deadline().unwrap();

        assert!(!timer.fire_if_due(deadline - Duration::from_millis(1), &mut counter));
        assert!(timer.fire_if_due(deadline, &mut counter));
        assert_eq!(counter.fired, 1);

        // Still periodic after firing
        assert_eq!(timer.deadline(), Some(deadline + Duration::from_secs(60)));
    }

    #[test]
    fn test_reschedule_changes_period() {
        let mut timer = IntervalTimer::new();
        timer.schedule_periodic(Duration::from_millis(10));
        timer.schedule_periodic(Duration::from_millis(66));
        assert_eq!(timer.period(), Some(Duration::from_millis(66)));
        assert!(timer.time_until_due(Instant::now()).unwrap() <= Duration::from_millis(66));
    }

    #[test]
    fn test_handler_can_cancel() {
        let mut timer = IntervalTimer::new();
        let mut counter = Counter {
            cancel_after: Some(1),
            ..Default::default()
        };
        timer.schedule_periodic(Duration::ZERO);
        let deadline = timer.deadline().unwrap();

        assert!(timer.fire_if_due(deadline, &mut counter));
        assert!(!timer.is_armed());
        assert!(!timer.fire_if_due(deadline + Duration::from_secs(1), &mut counter));
        assert_eq!(counter.fired, 1);
    }
}
