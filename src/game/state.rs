//! KOTH state definitions and structures
//!
//! Contains hills, team scores, the per-level match state and the in-memory
//! roster used by the demo binary and tests.

use serde::{Deserialize, Serialize};

use crate::game::constants::{broadcast, capture, milli_to_percent};
use crate::game::geometry::Volume;
use crate::game::systems::presence::{PositionSource, ScoreSink};
use crate::util::vec3::Vec3;

/// Player identifier as carried on the wire
pub type PlayerId = u8;

/// Hill identifier (1-based, unique per level)
pub type HillId = u8;

/// One of the two playing teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Roster team index (0 = red, 1 = blue)
    pub fn index(self) -> usize {
        match self {
            Team::Red => 0,
            Team::Blue => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Team::Red),
            1 => Some(Team::Blue),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

/// Owner of a hill, or the team holding partial progress on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HillOwner {
    #[default]
    Neutral,
    Red,
    Blue,
}

impl HillOwner {
    pub fn team(self) -> Option<Team> {
        match self {
            HillOwner::Neutral => None,
            HillOwner::Red => Some(Team::Red),
            HillOwner::Blue => Some(Team::Blue),
        }
    }

    pub fn is_neutral(self) -> bool {
        self == HillOwner::Neutral
    }

    pub fn to_wire(self) -> u8 {
        match self {
            HillOwner::Neutral => 0,
            HillOwner::Red => 1,
            HillOwner::Blue => 2,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(HillOwner::Neutral),
            1 => Some(HillOwner::Red),
            2 => Some(HillOwner::Blue),
            _ => None,
        }
    }
}

impl From<Team> for HillOwner {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => HillOwner::Red,
            Team::Blue => HillOwner::Blue,
        }
    }
}

/// Direction of capture activity on a hill
///
/// Annotation for the HUD and change detection; the progress fields are the
/// source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HillState {
    #[default]
    Idle,
    LeanRedGrowing,
    LeanRedShrinking,
    LeanBlueGrowing,
    LeanBlueShrinking,
}

impl HillState {
    pub fn growing(team: Team) -> Self {
        match team {
            Team::Red => HillState::LeanRedGrowing,
            Team::Blue => HillState::LeanBlueGrowing,
        }
    }

    pub fn shrinking(team: Team) -> Self {
        match team {
            Team::Red => HillState::LeanRedShrinking,
            Team::Blue => HillState::LeanBlueShrinking,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            HillState::Idle => 0,
            HillState::LeanRedGrowing => 1,
            HillState::LeanRedShrinking => 2,
            HillState::LeanBlueGrowing => 3,
            HillState::LeanBlueShrinking => 4,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(HillState::Idle),
            1 => Some(HillState::LeanRedGrowing),
            2 => Some(HillState::LeanRedShrinking),
            3 => Some(HillState::LeanBlueGrowing),
            4 => Some(HillState::LeanBlueShrinking),
            _ => None,
        }
    }
}

/// Per-tick count of eligible players inside a hill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presence {
    pub red_count: u32,
    pub blue_count: u32,
}

/// Presence reduced to what the transition rules care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceClass {
    Empty,
    Both,
    Only(Team),
}

impl Presence {
    pub fn new(red_count: u32, blue_count: u32) -> Self {
        Self {
            red_count,
            blue_count,
        }
    }

    pub fn count(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red_count,
            Team::Blue => self.blue_count,
        }
    }

    pub fn add(&mut self, team: Team) {
        match team {
            Team::Red => self.red_count = self.red_count.saturating_add(1),
            Team::Blue => self.blue_count = self.blue_count.saturating_add(1),
        }
    }

    pub fn classify(&self) -> PresenceClass {
        match (self.red_count > 0, self.blue_count > 0) {
            (false, false) => PresenceClass::Empty,
            (true, true) => PresenceClass::Both,
            (true, false) => PresenceClass::Only(Team::Red),
            (false, true) => PresenceClass::Only(Team::Blue),
        }
    }

    /// Counts clamped to the 8-bit wire field
    pub fn clamped(&self) -> (u8, u8) {
        (clamp_u8(self.red_count), clamp_u8(self.blue_count))
    }
}

#[inline]
pub fn clamp_u8(value: u32) -> u8 {
    value.min(u8::MAX as u32) as u8
}

/// What the broadcaster last told clients about a hill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSnapshot {
    pub red_present: u8,
    pub blue_present: u8,
    pub state: HillState,
    pub steal_dir: HillOwner,
    pub progress_bucket: u8,
}

/// A capture point
#[derive(Debug, Clone)]
pub struct Hill {
    pub id: HillId,
    pub name: String,
    /// Level object the hill was built from
    pub trigger_uid: i32,
    pub volume: Volume,
    pub ownership: HillOwner,
    pub state: HillState,
    /// Fixed-point progress, percent x 1000
    pub capture_milli: u32,
    /// `capture_milli / 1000`, kept in step by `set_capture_milli`
    pub capture_progress: u8,
    pub steal_dir: HillOwner,
    /// Sub-milli progress carried between ticks, in thousandths of a milli
    pub progress_carry: u32,
    pub hold_ms_accum: u32,
    /// Most recent presence sample (server tick, client prediction or packet)
    pub presence: Presence,
    pub last_sent: Option<BroadcastSnapshot>,
}

impl Hill {
    pub fn new(id: HillId, name: String, trigger_uid: i32, volume: Volume, ownership: HillOwner) -> Self {
        Self {
            id,
            name,
            trigger_uid,
            volume,
            ownership,
            state: HillState::Idle,
            capture_milli: 0,
            capture_progress: 0,
            steal_dir: HillOwner::Neutral,
            progress_carry: 0,
            hold_ms_accum: 0,
            presence: Presence::default(),
            last_sent: None,
        }
    }

    /// Set progress, keeping the coarse percent and steal direction consistent
    pub fn set_capture_milli(&mut self, milli: u32) {
        self.capture_milli = milli.min(capture::MAX_MILLI);
        self.capture_progress = milli_to_percent(self.capture_milli);
        if self.capture_milli == 0 {
            self.steal_dir = HillOwner::Neutral;
            self.progress_carry = 0;
        }
    }

    /// Hand the hill to `owner` and clear all capture progress
    pub fn flip_to(&mut self, owner: HillOwner) {
        self.ownership = owner;
        self.capture_milli = 0;
        self.capture_progress = 0;
        self.steal_dir = HillOwner::Neutral;
        self.progress_carry = 0;
        self.state = HillState::Idle;
        self.hold_ms_accum = 0;
    }

    /// Team holding residual progress that is hostile to the current owner
    pub fn hostile_residual(&self) -> bool {
        !self.steal_dir.is_neutral() && self.steal_dir != self.ownership
    }

    /// Change-detection view of the hill
    pub fn snapshot(&self) -> BroadcastSnapshot {
        let (red_present, blue_present) = self.presence.clamped();
        BroadcastSnapshot {
            red_present,
            blue_present,
            state: self.state,
            steal_dir: self.steal_dir,
            progress_bucket: self.capture_progress / broadcast::PROGRESS_BUCKET_PERCENT,
        }
    }

    /// Whether the progress invariants hold
    pub fn invariants_hold(&self) -> bool {
        self.capture_milli <= capture::MAX_MILLI
            && self.capture_progress == milli_to_percent(self.capture_milli)
            && (self.capture_milli > 0 || self.steal_dir.is_neutral())
    }
}

/// Team scores for the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamScores {
    pub red: u32,
    pub blue: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    pub fn add(&mut self, team: Team, points: u32) {
        match team {
            Team::Red => self.red = self.red.saturating_add(points),
            Team::Blue => self.blue = self.blue.saturating_add(points),
        }
    }

    /// Scores saturated to the u16 wire fields
    pub fn to_wire(&self) -> (u16, u16) {
        (
            self.red.min(u16::MAX as u32) as u16,
            self.blue.min(u16::MAX as u32) as u16,
        )
    }
}

/// Everything KOTH keeps for one level session
#[derive(Debug, Clone, Default)]
pub struct KothMatchState {
    pub hills: Vec<Hill>,
    pub scores: TeamScores,
}

impl KothMatchState {
    pub fn new(hills: Vec<Hill>) -> Self {
        Self {
            hills,
            scores: TeamScores::default(),
        }
    }

    pub fn hill(&self, id: HillId) -> Option<&Hill> {
        self.hills.iter().find(|h| h.id == id)
    }

    pub fn hill_mut(&mut self, id: HillId) -> Option<&mut Hill> {
        self.hills.iter_mut().find(|h| h.id == id)
    }

    /// Number of hills currently owned by `team`
    pub fn hills_owned_by(&self, team: Team) -> usize {
        let owner = HillOwner::from(team);
        self.hills.iter().filter(|h| h.ownership == owner).count()
    }
}

/// Live entity of a roster player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerEntity {
    pub position: Vec3,
    pub health: f32,
    pub dying: bool,
}

impl PlayerEntity {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            health: 100.0,
            dying: false,
        }
    }

    /// Non-dying with positive health
    pub fn is_countable(&self) -> bool {
        !self.dying && self.health > 0.0
    }
}

/// Player on the roster
#[derive(Debug, Clone)]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub name: String,
    pub team: Option<Team>,
    pub entity: Option<PlayerEntity>,
    pub score: u32,
}

impl RosterPlayer {
    pub fn new(id: PlayerId, name: String, team: Option<Team>) -> Self {
        Self {
            id,
            name,
            team,
            entity: None,
            score: 0,
        }
    }
}

/// In-memory roster
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub players: Vec<RosterPlayer>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, player: RosterPlayer) {
        self.players.retain(|p| p.id != player.id);
        self.players.push(player);
    }

    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.retain(|p| p.id != id);
    }

    pub fn get(&self, id: PlayerId) -> Option<&RosterPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut RosterPlayer> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Spawn (or move) a player's entity at `position`
    pub fn spawn_at(&mut self, id: PlayerId, position: Vec3) {
        if let Some(player) = self.get_mut(id) {
            player.entity = Some(PlayerEntity::new(position));
        }
    }
}

impl PositionSource for Roster {
    fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    fn team_of(&self, id: PlayerId) -> Option<Team> {
        self.get(id).and_then(|p| p.team)
    }

    fn position_of(&self, id: PlayerId) -> Option<Vec3> {
        self.get(id).and_then(|p| p.entity).map(|e| e.position)
    }

    fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id)
            .and_then(|p| p.entity)
            .is_some_and(|e| e.is_countable())
    }
}

impl ScoreSink for Roster {
    fn award_points(&mut self, id: PlayerId, points: u32) {
        if let Some(player) = self.get_mut(id) {
            player.score = player.score.saturating_add(points);
        }
    }
}
