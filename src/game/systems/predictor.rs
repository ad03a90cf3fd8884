//! Client-side hill prediction
//!
//! Runs the server transition rules against locally known player positions so
//! the HUD moves between broadcasts. Server packets always win: every field
//! they carry overwrites the predicted one.

use tracing::{debug, info};

use crate::game::constants::percent_to_milli;
use crate::game::state::{Hill, HillId, HillOwner, HillState, KothMatchState, Presence, Team, TeamScores};
use crate::game::systems::hill::{update, CaptureRates};
use crate::game::systems::presence::{sample_presence, CapturerList, PositionSource};
use crate::net::protocol::{HillCapturedPacket, HillStatePacket};

/// Capture sound to play for a confirmed flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSound {
    /// Local team gained the hill
    Gained,
    /// Local team lost the hill to the enemy
    Lost,
    /// Local player is not on a team
    Neutral,
}

/// Events handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    OwnershipChanged {
        hill_id: HillId,
        new_owner: Team,
        announcement: String,
        sound: CaptureSound,
        capturing_players: CapturerList,
    },
}

/// HUD view of one hill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudIndicator {
    pub hill_id: HillId,
    pub name: String,
    pub ownership: HillOwner,
    pub steal_dir: HillOwner,
    pub state: HillState,
    pub progress: u8,
    pub red_present: u8,
    pub blue_present: u8,
}

impl HudIndicator {
    fn from_hill(hill: &Hill) -> Self {
        let (red_present, blue_present) = hill.presence.clamped();
        Self {
            hill_id: hill.id,
            name: hill.name.clone(),
            ownership: hill.ownership,
            steal_dir: hill.steal_dir,
            state: hill.state,
            progress: hill.capture_progress,
            red_present,
            blue_present,
        }
    }
}

/// Local mirror of the hill state machine
#[derive(Debug, Clone)]
pub struct HillPredictor {
    rates: CaptureRates,
    local_team: Option<Team>,
    /// Server scores plus predicted points since the last packet
    display_scores: TeamScores,
}

impl HillPredictor {
    pub fn new(rates: CaptureRates, local_team: Option<Team>) -> Self {
        Self {
            rates,
            local_team,
            display_scores: TeamScores::default(),
        }
    }

    pub fn set_local_team(&mut self, team: Option<Team>) {
        self.local_team = team;
    }

    pub fn display_scores(&self) -> TeamScores {
        self.display_scores
    }

    /// Forget predicted scores (level load)
    pub fn reset(&mut self) {
        self.display_scores = TeamScores::default();
    }

    /// Advance every hill locally
    pub fn predict<S: PositionSource>(
        &mut self,
        state: &mut KothMatchState,
        source: &S,
        dt_ms: u32,
        gameplay_active: bool,
    ) {
        for hill in &mut state.hills {
            let presence = sample_presence(&hill.volume, source);
            hill.presence = presence;
            let outcome = update(hill, presence, dt_ms, &self.rates, gameplay_active);
            if let Some(team) = outcome.captured_by {
                debug!("Predicted {} capture of hill {} (awaiting server)", team.name(), hill.id);
            }
            if let Some((team, points)) = outcome.points {
                self.display_scores.add(team, points);
            }
        }
    }

    /// Overwrite a hill and the scores from a server state packet
    ///
    /// Returns `false` when the hill id is unknown.
    pub fn apply_state(&mut self, state: &mut KothMatchState, packet: &HillStatePacket) -> bool {
        let Some(hill) = state.hill_mut(packet.hill_id) else {
            debug!("State packet for unknown hill {}", packet.hill_id);
            return false;
        };
        hill.ownership = packet.ownership;
        hill.state = packet.state;
        hill.steal_dir = packet.steal_dir;
        let mut milli = percent_to_milli(packet.capture_progress);
        if !packet.steal_dir.is_neutral() {
            // Sub-percent residual progress still has a holder
            milli = milli.max(1);
        }
        hill.set_capture_milli(milli);
        hill.presence = Presence::new(packet.red_present as u32, packet.blue_present as u32);

        let scores = TeamScores {
            red: packet.red_score as u32,
            blue: packet.blue_score as u32,
        };
        state.scores = scores;
        self.display_scores = scores;
        true
    }

    /// Apply a confirmed flip and produce its announcement
    pub fn apply_captured(
        &mut self,
        state: &mut KothMatchState,
        packet: &HillCapturedPacket,
    ) -> Option<PresentationEvent> {
        let new_owner = packet.new_owner.team()?;
        let Some(hill) = state.hill_mut(packet.hill_id) else {
            debug!("Captured packet for unknown hill {}", packet.hill_id);
            return None;
        };
        hill.flip_to(packet.new_owner);

        let announcement = format!("{} team captured {}!", new_owner.name(), hill.name);
        let sound = match self.local_team {
            Some(team) if team == new_owner => CaptureSound::Gained,
            Some(_) => CaptureSound::Lost,
            None => CaptureSound::Neutral,
        };
        info!("{}", announcement);
        Some(PresentationEvent::OwnershipChanged {
            hill_id: hill.id,
            new_owner,
            announcement,
            sound,
            capturing_players: packet.capturing_player_ids.clone(),
        })
    }

    /// Progress and occupancy for every hill
    pub fn hud(state: &KothMatchState) -> Vec<HudIndicator> {
        state.hills.iter().map(HudIndicator::from_hill).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Volume;
    use crate::game::state::{Roster, RosterPlayer};
    use crate::util::vec3::Vec3;

    fn match_state() -> KothMatchState {
        let volume = Volume::CylinderFromSphere {
            center: Vec3::ZERO,
            radius: 5.0,
            axis: Vec3::Y,
        };
        KothMatchState::new(vec![
            Hill::new(1, "Summit".to_string(), 10, volume, HillOwner::Neutral),
            Hill::new(
                2,
                "Far".to_string(),
                11,
                Volume::Sphere {
                    center: Vec3::new(100.0, 0.0, 0.0),
                    radius: 5.0,
                },
                HillOwner::Blue,
            ),
        ])
    }

    fn roster_with_red_on_summit() -> Roster {
        let mut roster = Roster::new();
        roster.add_player(RosterPlayer::new(1, "Red".to_string(), Some(Team::Red)));
        roster.spawn_at(1, Vec3::new(1.0, 0.0, 0.0));
        roster
    }

    fn predictor() -> HillPredictor {
        HillPredictor::new(CaptureRates::from_percent(10.0, 20.0, 5.0, 1_000), Some(Team::Blue))
    }

    #[test]
    fn test_predict_advances_progress() {
        let mut state = match_state();
        let mut predictor = predictor();
        predictor.predict(&mut state, &roster_with_red_on_summit(), 200, true);

        let hill = state.hill(1).unwrap();
        assert_eq!(hill.capture_milli, 2_000);
        assert_eq!(hill.state, HillState::LeanRedGrowing);
        assert_eq!(hill.presence, Presence::new(1, 0));
    }

    #[test]
    fn test_predicted_points_are_display_only() {
        let mut state = match_state();
        let mut predictor = predictor();
        for _ in 0..8 {
            predictor.predict(&mut state, &Roster::new(), 250, true);
        }
        // Blue holds hill 2 uncontested for 2s at 1s per point
        assert_eq!(predictor.display_scores().blue, 2);
        assert_eq!(state.scores, TeamScores::default());
    }

    #[test]
    fn test_state_packet_overwrites_prediction() {
        let mut state = match_state();
        let mut predictor = predictor();
        predictor.predict(&mut state, &roster_with_red_on_summit(), 250, true);

        let packet = HillStatePacket {
            hill_id: 1,
            ownership: HillOwner::Neutral,
            steal_dir: HillOwner::Blue,
            state: HillState::LeanBlueGrowing,
            capture_progress: 12,
            red_present: 0,
            blue_present: 3,
            red_score: 5,
            blue_score: 8,
        };
        assert!(predictor.apply_state(&mut state, &packet));

        let hill = state.hill(1).unwrap();
        assert_eq!(hill.steal_dir, HillOwner::Blue);
        assert_eq!(hill.capture_milli, 12_000);
        assert_eq!(hill.capture_progress, 12);
        assert_eq!(hill.state, HillState::LeanBlueGrowing);
        assert_eq!(hill.presence, Presence::new(0, 3));
        assert_eq!(state.scores, TeamScores { red: 5, blue: 8 });
        assert_eq!(predictor.display_scores(), TeamScores { red: 5, blue: 8 });
    }

    #[test]
    fn test_sub_percent_residual_keeps_holder() {
        let mut state = match_state();
        let mut predictor = predictor();
        let packet = HillStatePacket {
            hill_id: 1,
            ownership: HillOwner::Neutral,
            steal_dir: HillOwner::Red,
            state: HillState::LeanRedShrinking,
            capture_progress: 0,
            red_present: 0,
            blue_present: 0,
            red_score: 0,
            blue_score: 0,
        };
        predictor.apply_state(&mut state, &packet);
        let hill = state.hill(1).unwrap();
        assert_eq!(hill.steal_dir, HillOwner::Red);
        assert!(hill.invariants_hold());
    }

    #[test]
    fn test_unknown_hill_ignored() {
        let mut state = match_state();
        let mut predictor = predictor();
        let packet = HillStatePacket {
            hill_id: 42,
            ownership: HillOwner::Red,
            steal_dir: HillOwner::Neutral,
            state: HillState::Idle,
            capture_progress: 0,
            red_present: 0,
            blue_present: 0,
            red_score: 900,
            blue_score: 800,
        };
        state.scores = TeamScores { red: 3, blue: 4 };
        predictor.predict(&mut state, &Roster::new(), 250, true);
        let display_before = predictor.display_scores();

        assert!(!predictor.apply_state(&mut state, &packet));
        assert_eq!(state.hill(1).unwrap().ownership, HillOwner::Neutral);
        assert_eq!(state.scores, TeamScores { red: 3, blue: 4 });
        assert_eq!(predictor.display_scores(), display_before);

        let captured = HillCapturedPacket {
            hill_id: 42,
            new_owner: HillOwner::Red,
            capturing_player_ids: CapturerList::new(),
        };
        assert!(predictor.apply_captured(&mut state, &captured).is_none());
    }

    #[test]
    fn test_captured_packet_announces_with_sound() {
        let mut state = match_state();
        let mut predictor = predictor();
        let packet = HillCapturedPacket {
            hill_id: 1,
            new_owner: HillOwner::Red,
            capturing_player_ids: CapturerList::from_slice(&[1, 4]),
        };
        let event = predictor.apply_captured(&mut state, &packet).unwrap();
        match event {
            PresentationEvent::OwnershipChanged {
                hill_id,
                new_owner,
                announcement,
                sound,
                capturing_players,
            } => {
                assert_eq!(hill_id, 1);
                assert_eq!(new_owner, Team::Red);
                assert_eq!(announcement, "Red team captured Summit!");
                assert_eq!(sound, CaptureSound::Lost);
                assert_eq!(capturing_players.as_slice(), &[1, 4]);
            }
        }
        assert_eq!(state.hill(1).unwrap().ownership, HillOwner::Red);

        predictor.set_local_team(Some(Team::Red));
        let event = predictor.apply_captured(&mut state, &packet).unwrap();
        assert!(matches!(
            event,
            PresentationEvent::OwnershipChanged { sound: CaptureSound::Gained, .. }
        ));
    }

    #[test]
    fn test_hud_reflects_hills() {
        let mut state = match_state();
        let mut predictor = predictor();
        predictor.predict(&mut state, &roster_with_red_on_summit(), 250, true);
        let hud = HillPredictor::hud(&state);
        assert_eq!(hud.len(), 2);
        assert_eq!(hud[0].name, "Summit");
        assert_eq!(hud[0].progress, 2);
        assert_eq!(hud[0].red_present, 1);
        assert_eq!(hud[1].ownership, HillOwner::Blue);
    }
}
