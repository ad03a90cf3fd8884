//! Round result
//!
//! Computes the outcome of a KOTH round from team scores and hill ownership.

use crate::game::state::{HillOwner, KothMatchState, Team};

/// Round result information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    /// `None` for a draw
    pub winner: Option<Team>,
    pub red_score: u32,
    pub blue_score: u32,
    pub red_hills: usize,
    pub blue_hills: usize,
    pub neutral_hills: usize,
}

/// Determine the round result from the match state
///
/// Higher score wins; equal scores are broken by hills held.
pub fn determine_result(state: &KothMatchState) -> RoundResult {
    let red_hills = state.hills_owned_by(Team::Red);
    let blue_hills = state.hills_owned_by(Team::Blue);
    let neutral_hills = state
        .hills
        .iter()
        .filter(|h| h.ownership == HillOwner::Neutral)
        .count();

    let red_score = state.scores.red;
    let blue_score = state.scores.blue;

    let winner = red_score
        .cmp(&blue_score)
        .then_with(|| red_hills.cmp(&blue_hills));
    let winner = match winner {
        std::cmp::Ordering::Greater => Some(Team::Red),
        std::cmp::Ordering::Less => Some(Team::Blue),
        std::cmp::Ordering::Equal => None,
    };

    RoundResult {
        winner,
        red_score,
        blue_score,
        red_hills,
        blue_hills,
        neutral_hills,
    }
}

/// Check if the round should end
///
/// A `score_limit` of 0 means the round never ends on score.
pub fn check_round_end(state: &KothMatchState, score_limit: u32) -> Option<RoundEndReason> {
    if score_limit == 0 {
        return None;
    }

    let red = state.scores.red >= score_limit;
    let blue = state.scores.blue >= score_limit;
    match (red, blue) {
        (false, false) => None,
        (true, false) => Some(RoundEndReason::ScoreLimit { winner: Team::Red }),
        (false, true) => Some(RoundEndReason::ScoreLimit { winner: Team::Blue }),
        // Both crossed in the same frame
        (true, true) => {
            let winner = if state.scores.red >= state.scores.blue {
                Team::Red
            } else {
                Team::Blue
            };
            Some(RoundEndReason::ScoreLimit { winner })
        }
    }
}

/// Reason why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEndReason {
    /// A team reached the score limit
    ScoreLimit { winner: Team },
}
