//! Tick-driven timers. Nothing in here reads a clock: a timer only advances when the host
//! calls [ItemTimer::tick], which [ticker::TickLoop] does once per second.

pub mod input;
pub mod ticker;

/// Time limit of a single item. Configured in minutes but kept in seconds so that every
/// comparison uses the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit {
    seconds: u32,
}

impl TimeLimit {
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            seconds: minutes.saturating_mul(60),
        }
    }

    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn minutes(&self) -> f64 {
        self.seconds as f64 / 60.
    }

    /// An item is overdue as soon as it reaches the limit.
    pub fn is_exceeded_by(&self, elapsed: u32) -> bool {
        elapsed >= self.seconds
    }

    pub fn remaining(&self, elapsed: u32) -> u32 {
        self.seconds.saturating_sub(elapsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    /// Still running, but the limit was reached during this run.
    Overdue,
    Paused,
    Stopped,
}

/// What a single tick did to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer isn't running, nothing changed.
    Ignored,
    Counted,
    /// The limit was reached on this tick. Reported once per run.
    Overrun,
}

#[derive(Debug, Clone)]
pub struct ItemTimer {
    limit: Option<TimeLimit>,
    elapsed: u32,
    state: TimerState,
    overran: bool,
}

impl ItemTimer {
    pub fn new(limit: TimeLimit) -> Self {
        Self {
            limit: Some(limit),
            elapsed: 0,
            state: TimerState::Idle,
            overran: false,
        }
    }

    /// Timer that only counts. Used for wall clocks of whole sessions.
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            elapsed: 0,
            state: TimerState::Idle,
            overran: false,
        }
    }

    /// Starts or resumes the timer. Each start begins a new run, which re-arms the overrun
    /// alert. Returns false if the timer is already running or was stopped.
    pub fn start(&mut self) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                true
            }
            TimerState::Running | TimerState::Overdue | TimerState::Stopped => false,
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.is_running() {
            self.state = TimerState::Paused;
            true
        } else {
            false
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            TimerState::Running => {
                self.elapsed = self.elapsed.saturating_add(1);
                match self.limit {
                    Some(limit) if limit.is_exceeded_by(self.elapsed) => {
                        self.state = TimerState::Overdue;
                        self.overran = true;
                        TickOutcome::Overrun
                    }
                    _ => TickOutcome::Counted,
                }
            }
            TimerState::Overdue => {
                self.elapsed = self.elapsed.saturating_add(1);
                TickOutcome::Counted
            }
            TimerState::Idle | TimerState::Paused | TimerState::Stopped => TickOutcome::Ignored,
        }
    }

    /// Freezes the timer for good and returns the final elapsed seconds.
    pub fn stop(&mut self) -> u32 {
        self.state = TimerState::Stopped;
        self.elapsed
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn limit(&self) -> Option<TimeLimit> {
        self.limit
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Overdue)
    }

    pub fn is_overdue(&self) -> bool {
        self.state == TimerState::Overdue
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TimerState::Stopped
    }

    /// Whether any run of this timer reached the limit.
    pub fn overran(&self) -> bool {
        self.overran
    }

    /// Seconds left before the limit, zero once overdue.
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.remaining(self.elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemTimer, TickOutcome, TimeLimit, TimerState};

    fn run(timer: &mut ItemTimer, ticks: u32) -> Vec<TickOutcome> {
        (0..ticks).map(|_| timer.tick()).collect()
    }

    #[test]
    fn elapsed_matches_tick_count() {
        for n in [0, 1, 59, 60, 61, 500] {
            let mut timer = ItemTimer::new(TimeLimit::from_minutes(1));
            assert!(timer.start());
            run(&mut timer, n);
            assert_eq!(timer.stop(), n);
            assert_eq!(timer.state(), TimerState::Stopped);
        }
    }

    #[test]
    fn overrun_fires_once_when_limit_is_reached() {
        let mut timer = ItemTimer::new(TimeLimit::from_seconds(3));
        timer.start();
        let outcomes = run(&mut timer, 10);
        let overruns: Vec<_> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == TickOutcome::Overrun)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(overruns, vec![2]);
        assert!(timer.is_overdue());
        assert!(timer.overran());
        assert_eq!(timer.remaining(), Some(0));
    }

    #[test]
    fn limit_is_converted_from_minutes() {
        let mut timer = ItemTimer::new(TimeLimit::from_minutes(2));
        timer.start();
        let outcomes = run(&mut timer, 120);
        assert_eq!(outcomes[118], TickOutcome::Counted);
        assert_eq!(outcomes[119], TickOutcome::Overrun);
    }

    #[test]
    fn idle_and_stopped_timers_ignore_ticks() {
        let mut timer = ItemTimer::new(TimeLimit::from_seconds(1));
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        timer.start();
        timer.tick();
        timer.stop();
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        assert_eq!(timer.elapsed(), 1);
        assert!(!timer.start());
    }

    #[test]
    fn pause_freezes_and_resume_rearms() {
        let mut timer = ItemTimer::new(TimeLimit::from_seconds(2));
        timer.start();
        assert_eq!(run(&mut timer, 3), [TickOutcome::Counted, TickOutcome::Overrun, TickOutcome::Counted]);
        assert!(timer.pause());
        assert_eq!(run(&mut timer, 5), [TickOutcome::Ignored; 5]);
        assert_eq!(timer.elapsed(), 3);

        assert!(timer.start());
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.tick(), TickOutcome::Overrun);
        assert_eq!(timer.tick(), TickOutcome::Counted);
    }

    #[test]
    fn unlimited_timer_never_overruns() {
        let mut timer = ItemTimer::unlimited();
        timer.start();
        assert!(run(&mut timer, 1000).iter().all(|v| *v == TickOutcome::Counted));
        assert_eq!(timer.remaining(), None);
    }
}
