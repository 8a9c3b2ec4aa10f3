//! Fixed period pacing for capture loops.

use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&mut self, duration: Duration);
}

/// The system monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Drift free scheduler: deadlines advance by exactly one period per tick,
/// independent of how long an iteration took.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    deadline: Instant,
}

impl Pacer {
    /// The first deadline is `start`, so the first tick never waits.
    pub fn new(period: Duration, start: Instant) -> Self {
        Pacer { period, deadline: start }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the current deadline, `None` when it has passed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if now < self.deadline {
            Some(self.deadline - now)
        } else {
            None
        }
    }

    /// Sleep until the current deadline if it lies ahead.
    ///
    /// returns: the duration slept
    pub fn wait<C: Clock + ?Sized>(&self, clock: &mut C) -> Duration {
        match self.remaining(clock.now()) {
            Some(delay) => {
                clock.sleep(delay);
                delay
            }
            None => Duration::ZERO,
        }
    }

    /// Move the deadline one period ahead.
    pub fn advance(&mut self) {
        self.deadline += self.period;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Clock that only moves when told to.
    pub(crate) struct FakeClock {
        pub now: Instant,
        pub sleeps: Vec<Duration>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            FakeClock { now: Instant::now(), sleeps: Vec::new() }
        }

        pub fn work(&mut self, duration: Duration) {
            self.now += duration;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now
        }

        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            self.now += duration;
        }
    }

    #[test]
    fn first_tick_does_not_wait() {
        let mut clock = FakeClock::new();
        let pacer = Pacer::new(Duration::from_secs(1), clock.now());
        assert_eq!(pacer.wait(&mut clock), Duration::ZERO);
        assert!(clock.sleeps.is_empty());
    }

    #[test]
    fn zero_delay_ticks_are_one_period_apart() {
        let period = Duration::from_secs(1);
        let mut clock = FakeClock::new();
        let mut pacer = Pacer::new(period, clock.now());
        let mut starts = Vec::new();
        for _ in 0..10 {
            pacer.wait(&mut clock);
            starts.push(clock.now());
            pacer.advance();
        }
        for pair in starts.windows(2) {
            assert_eq!(pair[1] - pair[0], period);
        }
    }

    #[test]
    fn processing_time_is_absorbed() {
        let period = Duration::from_millis(1000);
        let mut clock = FakeClock::new();
        let start = clock.now();
        let mut pacer = Pacer::new(period, start);
        for _ in 0..5 {
            pacer.wait(&mut clock);
            clock.work(Duration::from_millis(300));
            pacer.advance();
        }
        pacer.wait(&mut clock);
        assert_eq!(clock.now() - start, period * 5);
        assert!(clock.sleeps.iter().all(|d| *d == Duration::from_millis(700)));
    }

    #[test]
    fn late_iteration_never_sleeps_negative_and_keeps_grid() {
        let period = Duration::from_millis(1000);
        let mut clock = FakeClock::new();
        let start = clock.now();
        let mut pacer = Pacer::new(period, start);

        pacer.wait(&mut clock);
        clock.work(Duration::from_millis(2500));
        pacer.advance();

        // behind schedule: no sleep at all
        assert_eq!(pacer.wait(&mut clock), Duration::ZERO);
        pacer.advance();
        // the grid stays anchored at start + 2 s, 3 s, ...
        assert_eq!(pacer.wait(&mut clock), Duration::ZERO);
        pacer.advance();
        assert_eq!(pacer.wait(&mut clock), Duration::from_millis(500));
        assert_eq!(clock.now() - start, period * 3);
        assert!(clock.sleeps.iter().all(|d| *d <= period));
    }
}
