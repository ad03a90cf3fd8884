//! KOTH session - the per-frame entry point
//!
//! One [`KothSession`] lives for a level. Each frame it either runs the
//! authoritative hill tick and decides what to broadcast, or runs local
//! prediction and applies the packets received this frame, depending on the
//! process role fixed at construction.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::KothConfig;
use crate::game::level::{CapturePointDef, LevelDefinition, TriggerLookup};
use crate::game::match_result::{check_round_end, determine_result, RoundEndReason, RoundResult};
use crate::game::state::{HillId, KothMatchState, Team, TeamScores};
use crate::game::systems::hill::{update, CaptureRates};
use crate::game::systems::predictor::{HillPredictor, HudIndicator, PresentationEvent};
use crate::game::systems::presence::{players_on_hill, sample_presence, CapturerList, PositionSource, ScoreSink};
use crate::game::systems::registry::build_hills;
use crate::metrics::KothMetrics;
use crate::net::broadcast::ReconciliationBroadcaster;
use crate::net::protocol::{decode, encode, KothMessage};
use crate::net::transport::{Outgoing, PeerId, Target};

/// Host environment queried once per frame
pub trait MultiplayerEnv {
    fn is_multiplayer_active(&self) -> bool;
    fn is_authoritative_server(&self) -> bool;
    fn is_listen_server(&self) -> bool;
    /// False during warmup, intermission and similar phases
    fn gameplay_is_active(&self) -> bool;
    /// Monotonic clock in milliseconds
    fn now_ms(&self) -> u64;
}

/// What this process does with KOTH state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    /// No multiplayer session; KOTH is inactive
    Offline,
    /// Authoritative: dedicated or listen server
    Server,
    /// Pure client: predicts and reconciles
    Client,
}

impl ProcessRole {
    pub fn detect<E: MultiplayerEnv>(env: &E) -> Self {
        if !env.is_multiplayer_active() {
            ProcessRole::Offline
        } else if env.is_authoritative_server() || env.is_listen_server() {
            ProcessRole::Server
        } else {
            ProcessRole::Client
        }
    }
}

/// Server-side capture, reported to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub hill_id: HillId,
    pub team: Team,
    pub capturing_players: CapturerList,
}

/// Round end, reported once per level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEnd {
    pub reason: RoundEndReason,
    pub result: RoundResult,
}

/// Everything a frame produced
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Datagrams for the transport
    pub outgoing: Vec<Outgoing>,
    /// Server: ownership flips this frame
    pub captures: Vec<CaptureEvent>,
    /// Client: confirmed flips for the presentation layer
    pub presentation: Vec<PresentationEvent>,
    pub round_end: Option<RoundEnd>,
}

/// KOTH state and bookkeeping for one level
pub struct KothSession {
    role: ProcessRole,
    config: KothConfig,
    rates: CaptureRates,
    state: KothMatchState,
    broadcaster: ReconciliationBroadcaster,
    predictor: HillPredictor,
    last_frame_ms: Option<u64>,
    round_over: bool,
    metrics: Arc<KothMetrics>,
}

impl KothSession {
    pub fn new(config: KothConfig, role: ProcessRole, metrics: Arc<KothMetrics>) -> Self {
        let rates = config.rates();
        Self {
            role,
            broadcaster: ReconciliationBroadcaster::new(config.heartbeat_interval_ms),
            predictor: HillPredictor::new(rates, None),
            config,
            rates,
            state: KothMatchState::default(),
            last_frame_ms: None,
            round_over: false,
            metrics,
        }
    }

    pub fn role(&self) -> ProcessRole {
        self.role
    }

    pub fn state(&self) -> &KothMatchState {
        &self.state
    }

    pub fn is_round_over(&self) -> bool {
        self.round_over
    }

    /// Team used for client capture sounds
    pub fn set_local_team(&mut self, team: Option<Team>) {
        self.predictor.set_local_team(team);
    }

    /// Scores to show: authoritative on the server, predicted on a client
    pub fn display_scores(&self) -> TeamScores {
        match self.role {
            ProcessRole::Client => self.predictor.display_scores(),
            _ => self.state.scores,
        }
    }

    pub fn hud(&self) -> Vec<HudIndicator> {
        HillPredictor::hud(&self.state)
    }

    /// Discard all hills and scores and rebuild them for a new level
    pub fn load_level<L: TriggerLookup>(&mut self, defs: &[CapturePointDef], level: &L) {
        self.state = KothMatchState::new(build_hills(defs, level));
        self.broadcaster.reset();
        self.predictor.reset();
        self.last_frame_ms = None;
        self.round_over = false;
        self.metrics
            .hills
            .store(self.state.hills.len() as u64, Ordering::Relaxed);
        info!("KOTH level loaded: {} hills ({:?})", self.state.hills.len(), self.role);
    }

    pub fn load_level_definition(&mut self, level: &LevelDefinition) {
        self.load_level(&level.capture_points, level);
    }

    /// Run one frame
    ///
    /// `incoming` holds the datagrams received since the last frame; they are
    /// only used by a client.
    pub fn frame<E, R>(&mut self, env: &E, roster: &mut R, incoming: &[Vec<u8>]) -> FrameReport
    where
        E: MultiplayerEnv,
        R: PositionSource + ScoreSink,
    {
        if self.role == ProcessRole::Offline {
            return FrameReport::default();
        }

        let started = Instant::now();
        let now = env.now_ms();
        let dt_ms = match self.last_frame_ms {
            Some(last) => now.saturating_sub(last).min(self.config.max_frame_dt_ms as u64) as u32,
            None => 0,
        };
        self.last_frame_ms = Some(now);

        let report = match self.role {
            ProcessRole::Server => self.server_frame(env, roster, dt_ms),
            ProcessRole::Client => self.client_frame(env, &*roster, dt_ms, incoming),
            ProcessRole::Offline => FrameReport::default(),
        };

        self.metrics.record_frame_time(started.elapsed());
        report
    }

    /// State packets for a player who just joined, sent to that peer only
    pub fn on_player_joined(&self, peer: PeerId) -> Vec<Outgoing> {
        if self.role != ProcessRole::Server {
            return Vec::new();
        }
        let mut outgoing = Vec::with_capacity(self.state.hills.len());
        for packet in ReconciliationBroadcaster::late_join_packets(&self.state) {
            encode_into(&mut outgoing, Target::Peer(peer), &KothMessage::HillState(packet));
        }
        KothMetrics::add(&self.metrics.late_join_packets_sent, outgoing.len() as u64);
        debug!("Late-join sync for peer {}: {} packets", peer, outgoing.len());
        outgoing
    }

    fn server_frame<E, R>(&mut self, env: &E, roster: &mut R, dt_ms: u32) -> FrameReport
    where
        E: MultiplayerEnv,
        R: PositionSource + ScoreSink,
    {
        let mut report = FrameReport::default();
        let scoring = env.gameplay_is_active();

        let KothMatchState { hills, scores } = &mut self.state;
        for hill in hills.iter_mut() {
            let presence = sample_presence(&hill.volume, &*roster);
            hill.presence = presence;
            let outcome = update(hill, presence, dt_ms, &self.rates, scoring);

            if let Some((team, points)) = outcome.points {
                scores.add(team, points);
                KothMetrics::add(&self.metrics.score_points, points as u64);
            }

            if let Some(team) = outcome.captured_by {
                let capturers = players_on_hill(&hill.volume, &*roster, team);
                if scoring {
                    for &id in &capturers {
                        roster.award_points(id, self.config.capture_bonus);
                    }
                }
                info!(
                    "{} team captured {} (hill {}, {} players)",
                    team.name(),
                    hill.name,
                    hill.id,
                    capturers.len()
                );
                KothMetrics::add(&self.metrics.captures, 1);

                let packet = ReconciliationBroadcaster::captured_packet(hill, capturers.clone());
                if encode_into(&mut report.outgoing, Target::Broadcast, &KothMessage::HillCaptured(packet)) {
                    KothMetrics::add(&self.metrics.captured_packets_sent, 1);
                }
                report.captures.push(CaptureEvent {
                    hill_id: hill.id,
                    team,
                    capturing_players: capturers,
                });
            }
        }

        let hill_count = self.state.hills.len();
        if self.broadcaster.heartbeat_due(dt_ms) {
            let packets = self.broadcaster.full_resync(&mut self.state);
            debug!("Heartbeat: resending {} hills", packets.len());
            for packet in packets {
                if encode_into(&mut report.outgoing, Target::Broadcast, &KothMessage::HillState(packet)) {
                    KothMetrics::add(&self.metrics.heartbeat_packets_sent, 1);
                }
            }
        } else {
            let packets = self.broadcaster.collect_changes(&mut self.state);
            KothMetrics::add(
                &self.metrics.state_packets_suppressed,
                (hill_count - packets.len()) as u64,
            );
            for packet in packets {
                if encode_into(&mut report.outgoing, Target::Broadcast, &KothMessage::HillState(packet)) {
                    KothMetrics::add(&self.metrics.state_packets_sent, 1);
                }
            }
        }

        if !self.round_over {
            if let Some(reason) = check_round_end(&self.state, self.config.score_limit) {
                self.round_over = true;
                let result = determine_result(&self.state);
                info!(
                    "Round over: {:?} (red {} / blue {})",
                    result.winner.map(Team::name),
                    result.red_score,
                    result.blue_score
                );
                report.round_end = Some(RoundEnd { reason, result });
            }
        }

        self.metrics.red_score.store(self.state.scores.red as u64, Ordering::Relaxed);
        self.metrics.blue_score.store(self.state.scores.blue as u64, Ordering::Relaxed);
        KothMetrics::add(&self.metrics.server_frames, 1);
        report
    }

    fn client_frame<E, R>(&mut self, env: &E, roster: &R, dt_ms: u32, incoming: &[Vec<u8>]) -> FrameReport
    where
        E: MultiplayerEnv,
        R: PositionSource,
    {
        let mut report = FrameReport::default();

        // Prediction first so packets from this frame win
        self.predictor
            .predict(&mut self.state, roster, dt_ms, env.gameplay_is_active());

        for data in incoming {
            KothMetrics::add(&self.metrics.packets_received, 1);
            match decode(data) {
                Ok(KothMessage::HillState(packet)) => {
                    self.predictor.apply_state(&mut self.state, &packet);
                }
                Ok(KothMessage::HillCaptured(packet)) => {
                    if let Some(event) = self.predictor.apply_captured(&mut self.state, &packet) {
                        report.presentation.push(event);
                    }
                }
                Err(e) => {
                    warn!("Rejected KOTH datagram ({} bytes): {}", data.len(), e);
                    KothMetrics::add(&self.metrics.decode_errors, 1);
                }
            }
        }

        KothMetrics::add(&self.metrics.client_frames, 1);
        report
    }
}

/// Encode a message and queue it; returns false if encoding failed
fn encode_into(outgoing: &mut Vec<Outgoing>, target: Target, message: &KothMessage) -> bool {
    match encode(message) {
        Ok(data) => {
            outgoing.push(Outgoing { target, data });
            true
        }
        Err(e) => {
            warn!("Failed to encode KOTH message: {}", e);
            false
        }
    }
}
