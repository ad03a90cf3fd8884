//! Presence sampling
//!
//! Counts the players of each team standing inside a hill's volume.

use smallvec::SmallVec;

use crate::game::geometry::Volume;
use crate::game::state::{PlayerId, Presence, Team};
use crate::util::vec3::Vec3;

/// Read-only view of the live roster
pub trait PositionSource {
    /// Every player currently on the roster
    fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_;
    /// Team of a player, `None` for spectators or unknown ids
    fn team_of(&self, id: PlayerId) -> Option<Team>;
    /// World position of the player's entity, if it has one
    fn position_of(&self, id: PlayerId) -> Option<Vec3>;
    /// Whether the player's entity is non-dying with positive health
    fn is_alive(&self, id: PlayerId) -> bool;
}

/// Receives personal score awards
pub trait ScoreSink {
    fn award_points(&mut self, id: PlayerId, points: u32);
}

/// Ids of capturing players; a hill rarely holds more than a handful
pub type CapturerList = SmallVec<[PlayerId; 8]>;

fn countable_inside<S: PositionSource>(
    volume: &Volume,
    source: &S,
    id: PlayerId,
) -> Option<Team> {
    let team = source.team_of(id)?;
    if !source.is_alive(id) {
        return None;
    }
    let position = source.position_of(id)?;
    volume.contains(position).then_some(team)
}

/// Count countable players of each team inside `volume`
pub fn sample_presence<S: PositionSource>(volume: &Volume, source: &S) -> Presence {
    let mut presence = Presence::default();
    for id in source.player_ids() {
        if let Some(team) = countable_inside(volume, source, id) {
            presence.add(team);
        }
    }
    presence
}

/// Ids of countable players of `team` inside `volume`
pub fn players_on_hill<S: PositionSource>(volume: &Volume, source: &S, team: Team) -> CapturerList {
    source
        .player_ids()
        .filter(|&id| countable_inside(volume, source, id) == Some(team))
        .collect()
}
