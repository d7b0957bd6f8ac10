use std::time::Duration;

/// Fixed decrement applied on every tick.
pub const TICK: Duration = Duration::from_millis(1_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Nothing is counting down.
    Idle,
    Running(Duration),
    /// Reached zero on this tick. Reported once per countdown.
    Released,
}

/// Advisory countdown derived from a remaining duration. It never consults
/// the clock; every tick subtracts [`TICK`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
    running: bool,
}

impl Countdown {
    pub const IDLE: Self = Self {
        remaining: Duration::ZERO,
        running: false,
    };

    /// A zero duration starts idle: there is nothing to release.
    pub fn start(remaining: Duration) -> Self {
        Self {
            remaining,
            running: !remaining.is_zero(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(TICK);
        if self.remaining.is_zero() {
            self.running = false;
            Tick::Released
        } else {
            Tick::Running(self.remaining)
        }
    }
}
