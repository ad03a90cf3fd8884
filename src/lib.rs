//! KOTH Capture-Point Synchronizer
//!
//! Authoritative King-of-the-Hill state machine for a multiplayer game
//! server, replicated to clients that predict locally and reconcile against
//! server broadcasts.
//!
//! - [`game`] - hills, capture rules, presence sampling, client prediction
//! - [`net`] - wire protocol, broadcast decisions, per-frame session
//! - [`config`] - rules and replication settings from the environment
//! - [`metrics`] - Prometheus counters

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;
