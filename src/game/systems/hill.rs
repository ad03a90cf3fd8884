//! Hill capture state machine
//!
//! Shared by the authoritative server tick and the client predictor. The
//! transition rules live in the pure [`transition`] function; [`update`]
//! applies the resulting progress change, ownership flip and holding score.

use crate::game::constants::{capture, tick};
use crate::game::state::{Hill, HillOwner, HillState, Presence, PresenceClass, Team};

/// Capture rates in fixed-point units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRates {
    /// Milli-percent gained per second while one team pushes
    pub grow: u32,
    /// Milli-percent lost per second while the owner alone defends
    pub drain_defended: u32,
    /// Milli-percent lost per second while the hill is empty
    pub drain_empty: u32,
    /// Uncontested holding time per score point
    pub ms_per_point: u32,
}

impl CaptureRates {
    /// Build from percent-per-second rates
    pub fn from_percent(grow: f32, drain_defended: f32, drain_empty: f32, ms_per_point: u32) -> Self {
        use crate::game::constants::rate_to_milli_per_sec;
        Self {
            grow: rate_to_milli_per_sec(grow),
            drain_defended: rate_to_milli_per_sec(drain_defended),
            drain_empty: rate_to_milli_per_sec(drain_empty),
            ms_per_point,
        }
    }

    fn drain_rate(&self, kind: DrainKind) -> u32 {
        match kind {
            DrainKind::Empty => self.drain_empty,
            DrainKind::Defended => self.drain_defended,
            DrainKind::Clear => self.grow,
        }
    }
}

impl Default for CaptureRates {
    fn default() -> Self {
        Self::from_percent(
            capture::DEFAULT_GROW_RATE,
            capture::DEFAULT_DRAIN_DEFENDED_RATE,
            capture::DEFAULT_DRAIN_EMPTY_RATE,
            capture::DEFAULT_MS_PER_POINT,
        )
    }
}

/// Why progress is draining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainKind {
    /// Nobody on the hill
    Empty,
    /// Owner alone wiping out attacker progress
    Defended,
    /// A new team clearing the previous team's residual progress
    Clear,
}

/// Progress operation chosen for a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOp {
    Freeze,
    Grow(Team),
    Drain(DrainKind),
}

/// Milliseconds per second; also the sub-milli carry scale
const MS_PER_SEC: u64 = 1000;

/// Progress including the carried sub-milli remainder
#[inline]
fn fine_progress(hill: &Hill) -> u64 {
    hill.capture_milli as u64 * MS_PER_SEC + hill.progress_carry as u64
}

fn set_fine_progress(hill: &mut Hill, fine: u64) {
    let fine = fine.min(capture::MAX_MILLI as u64 * MS_PER_SEC);
    hill.set_capture_milli((fine / MS_PER_SEC) as u32);
    hill.progress_carry = (fine % MS_PER_SEC) as u32;
}

/// Outcome of the transition rules for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: HillState,
    pub op: ProgressOp,
}

/// Transition rules
///
/// A team that does not own the hill grows progress, but only after clearing
/// the other team's residual progress. The owner alone drains attacker
/// progress. Owned hills never grow toward the owner, so they never return to
/// Neutral.
pub fn transition(ownership: HillOwner, steal_dir: HillOwner, class: PresenceClass) -> Transition {
    match class {
        PresenceClass::Both => Transition {
            state: HillState::Idle,
            op: ProgressOp::Freeze,
        },
        PresenceClass::Empty => Transition {
            state: HillState::Idle,
            op: ProgressOp::Drain(DrainKind::Empty),
        },
        PresenceClass::Only(team) if ownership == HillOwner::from(team) => match steal_dir.team() {
            Some(attacker) if attacker != team => Transition {
                state: HillState::shrinking(attacker),
                op: ProgressOp::Drain(DrainKind::Defended),
            },
            _ => Transition {
                state: HillState::Idle,
                op: ProgressOp::Freeze,
            },
        },
        PresenceClass::Only(team) => match steal_dir.team() {
            Some(holder) if holder != team => Transition {
                state: HillState::shrinking(holder),
                op: ProgressOp::Drain(DrainKind::Clear),
            },
            _ => Transition {
                state: HillState::growing(team),
                op: ProgressOp::Grow(team),
            },
        },
    }
}

/// Result of one hill tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Team the hill flipped to this tick
    pub captured_by: Option<Team>,
    /// Holding points earned this tick
    pub points: Option<(Team, u32)>,
}

/// Advance one hill by `dt_ms`
///
/// Holding points are only earned when `scoring_enabled` (gameplay active).
/// A zero `dt_ms` leaves the hill untouched.
pub fn update(
    hill: &mut Hill,
    presence: Presence,
    dt_ms: u32,
    rates: &CaptureRates,
    scoring_enabled: bool,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if dt_ms == 0 {
        return outcome;
    }
    let dt_ms = dt_ms.min(tick::MAX_DT_MS);

    let step = transition(hill.ownership, hill.steal_dir, presence.classify());
    hill.state = step.state;

    match step.op {
        ProgressOp::Freeze => {}
        ProgressOp::Grow(team) => {
            set_fine_progress(hill, fine_progress(hill) + rates.grow as u64 * dt_ms as u64);
            if hill.capture_milli > 0 {
                hill.steal_dir = HillOwner::from(team);
            }
            if hill.capture_milli == capture::MAX_MILLI {
                hill.flip_to(HillOwner::from(team));
                outcome.captured_by = Some(team);
            }
        }
        ProgressOp::Drain(kind) => {
            let drained = rates.drain_rate(kind) as u64 * dt_ms as u64;
            set_fine_progress(hill, fine_progress(hill).saturating_sub(drained));
            if hill.capture_milli == 0 {
                hill.progress_carry = 0;
                hill.state = HillState::Idle;
            }
        }
    }

    if scoring_enabled && outcome.captured_by.is_none() {
        outcome.points = accumulate_hold(hill, presence, dt_ms, rates.ms_per_point);
    }

    outcome
}

/// Holding accumulator for an owned hill with no hostile presence or progress
fn accumulate_hold(hill: &mut Hill, presence: Presence, dt_ms: u32, ms_per_point: u32) -> Option<(Team, u32)> {
    let owner = hill.ownership.team()?;
    if presence.count(owner.other()) > 0 || hill.hostile_residual() || ms_per_point == 0 {
        return None;
    }

    hill.hold_ms_accum = hill.hold_ms_accum.saturating_add(dt_ms);
    let mut points = 0;
    while hill.hold_ms_accum >= ms_per_point {
        hill.hold_ms_accum -= ms_per_point;
        points += 1;
    }
    (points > 0).then_some((owner, points))
}
