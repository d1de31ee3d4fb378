//! # Simulation Clock
//!
//! A gated periodic process that animates pin levels once the wiring is
//! complete. The clock is the only writer of pin levels and only writes while
//! Running. What a tick does to each pin is delegated to a
//! [`PinStateStrategy`], so the mock below can be swapped for a real model
//! without touching the board or the matcher.
//!
//! The clock does not own a thread or a timer task. The caller's event loop
//! calls [`SimulationClock::poll`] with the current time; the clock keeps at
//! most one pending deadline and clears it synchronously on pause, so no tick
//! can fire once Stopped has been observed.

use crate::board::Board;
use crate::connection::Matcher;
use crate::pin::{PinRole, PinSpec, PinValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
}

impl ClockState {
    pub fn to_str(&self) -> &'static str {
        match self {
            ClockState::Stopped => "Stopped",
            ClockState::Running => "Running",
        }
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// A start request made while the wiring is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Wiring incomplete: {remaining} required connection(s) still missing")]
pub struct StartRejected {
    pub remaining: usize,
}

/// Decides the next level of a pin on each tick. `None` leaves the pin as is.
pub trait PinStateStrategy {
    fn name(&self) -> &str;
    fn next_level(&mut self, pin: &PinSpec) -> Option<PinValue>;
}

/// Cosmetic stand-in for a circuit model: outputs toggle, inputs take a fair
/// coin flip, everything else is left alone.
#[derive(Debug, Clone)]
pub struct MockLogicStrategy {
    rng: ChaCha8Rng,
}

impl MockLogicStrategy {
    pub fn seeded(seed: u64) -> Self {
        MockLogicStrategy {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        MockLogicStrategy {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl PinStateStrategy for MockLogicStrategy {
    fn name(&self) -> &str {
        "mock-logic"
    }

    fn next_level(&mut self, pin: &PinSpec) -> Option<PinValue> {
        match pin.role {
            PinRole::Output => Some(pin.level.toggled()),
            PinRole::Input => Some(PinValue::from_bool(self.rng.gen_bool(0.5))),
            PinRole::Power | PinRole::Ground | PinRole::Passive => None,
        }
    }
}

pub struct SimulationClock {
    state: ClockState,
    period: Duration,
    tick_count: u64,
    deadline: Option<Instant>,
    strategy: Box<dyn PinStateStrategy>,
}

impl SimulationClock {
    pub fn new(period: Duration, strategy: Box<dyn PinStateStrategy>) -> Self {
        SimulationClock {
            state: ClockState::Stopped,
            period: period.max(Duration::from_millis(1)),
            tick_count: 0,
            deadline: None,
            strategy,
        }
    }

    pub fn seeded(period: Duration, seed: u64) -> Self {
        Self::new(period, Box::new(MockLogicStrategy::seeded(seed)))
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Start ticking if every requirement is satisfied. Starting a running
    /// clock is a no-op.
    pub fn request_start(&mut self, matcher: &Matcher, now: Instant) -> Result<(), StartRejected> {
        if !matcher.all_satisfied() {
            let remaining = matcher.remaining();
            log::info!("Start rejected: {} connection(s) missing", remaining);
            return Err(StartRejected { remaining });
        }
        if self.state == ClockState::Running {
            return Ok(());
        }
        self.state = ClockState::Running;
        self.deadline = Some(now + self.period);
        log::info!("Simulation started ({} every {:?})", self.strategy.name(), self.period);
        Ok(())
    }

    /// Stop ticking. Pin levels are left as they are so the run can resume.
    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            log::info!("Simulation paused after {} ticks", self.tick_count);
        }
        self.state = ClockState::Stopped;
        self.deadline = None;
    }

    /// Stop and forget the tick count. Pin levels are restored by the board reset.
    pub fn reset(&mut self) {
        self.pause();
        self.tick_count = 0;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Tick if the pending deadline has passed, then re-arm it. At most one
    /// tick runs per call even if several periods were missed.
    pub fn poll(&mut self, board: &mut Board, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        let ticked = self.tick(board);
        if self.is_running() {
            self.deadline = Some(now + self.period);
        }
        ticked
    }

    /// One atomic pass over every node. Does nothing while Stopped.
    pub fn tick(&mut self, board: &mut Board) -> bool {
        if self.state != ClockState::Running {
            return false;
        }

        let updates: Vec<(String, Vec<PinValue>)> = board
            .nodes()
            .iter()
            .map(|node| {
                let levels = node
                    .pins
                    .iter()
                    .map(|pin| self.strategy.next_level(pin).unwrap_or(pin.level))
                    .collect();
                (node.id.clone(), levels)
            })
            .collect();

        for (id, levels) in &updates {
            board.set_pin_levels(id, levels);
        }
        self.tick_count += 1;
        true
    }
}

impl fmt::Debug for SimulationClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationClock")
            .field("state", &self.state)
            .field("period", &self.period)
            .field("tick_count", &self.tick_count)
            .field("deadline", &self.deadline)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD, Box::new(MockLogicStrategy::from_entropy()))
    }
}
