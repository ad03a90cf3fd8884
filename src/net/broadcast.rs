//! Reconciliation broadcaster
//!
//! Decides which hills go on the wire after a server tick. A hill is resent
//! only when its change-detection snapshot (clamped presence, state,
//! steal_dir, 5% progress bucket) differs from the last one sent. Scores
//! ride along but never trigger a send on their own.
//!
//! Late-join packets and captured events bypass suppression. An optional
//! heartbeat periodically resends every hill so clients recover from loss.

use crate::game::state::{Hill, KothMatchState, TeamScores};
use crate::game::systems::presence::CapturerList;
use crate::net::protocol::{HillCapturedPacket, HillStatePacket};

/// Per-level broadcast bookkeeping
#[derive(Debug, Clone)]
pub struct ReconciliationBroadcaster {
    heartbeat_interval_ms: u32,
    since_heartbeat_ms: u32,
}

impl ReconciliationBroadcaster {
    /// `heartbeat_interval_ms` of 0 disables the heartbeat
    pub fn new(heartbeat_interval_ms: u32) -> Self {
        Self {
            heartbeat_interval_ms,
            since_heartbeat_ms: 0,
        }
    }

    /// State packets for hills whose snapshot changed, updating the snapshots
    pub fn collect_changes(&mut self, state: &mut KothMatchState) -> Vec<HillStatePacket> {
        let KothMatchState { hills, scores } = state;
        hills
            .iter_mut()
            .filter_map(|hill| Self::changed_packet(hill, scores))
            .collect()
    }

    fn changed_packet(hill: &mut Hill, scores: &TeamScores) -> Option<HillStatePacket> {
        let snapshot = hill.snapshot();
        if hill.last_sent == Some(snapshot) {
            return None;
        }
        hill.last_sent = Some(snapshot);
        Some(HillStatePacket::from_hill(hill, scores))
    }

    /// Captured event for a flip; always sent
    pub fn captured_packet(hill: &Hill, capturers: CapturerList) -> HillCapturedPacket {
        HillCapturedPacket {
            hill_id: hill.id,
            new_owner: hill.ownership,
            capturing_player_ids: capturers,
        }
    }

    /// One state packet per hill for a newly joined player
    ///
    /// Does not touch the change-detection snapshots.
    pub fn late_join_packets(state: &KothMatchState) -> Vec<HillStatePacket> {
        state
            .hills
            .iter()
            .map(|hill| HillStatePacket::from_hill(hill, &state.scores))
            .collect()
    }

    /// Advance the heartbeat clock; true when a full resync is due
    pub fn heartbeat_due(&mut self, dt_ms: u32) -> bool {
        if self.heartbeat_interval_ms == 0 {
            return false;
        }
        self.since_heartbeat_ms = self.since_heartbeat_ms.saturating_add(dt_ms);
        if self.since_heartbeat_ms < self.heartbeat_interval_ms {
            return false;
        }
        self.since_heartbeat_ms = 0;
        true
    }

    /// State packets for every hill, refreshing the snapshots
    pub fn full_resync(&mut self, state: &mut KothMatchState) -> Vec<HillStatePacket> {
        let KothMatchState { hills, scores } = state;
        hills
            .iter_mut()
            .map(|hill| {
                hill.last_sent = Some(hill.snapshot());
                HillStatePacket::from_hill(hill, scores)
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.since_heartbeat_ms = 0;
    }
}
