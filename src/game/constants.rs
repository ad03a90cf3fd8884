/// Capture progress fixed-point scale
pub mod capture {
    /// Full capture in milli-percent (100% x 1000)
    pub const MAX_MILLI: u32 = 100_000;
    /// Milli-percent per whole percent
    pub const MILLI_PER_PERCENT: u32 = 1_000;
    /// Default growth rate while a single team stands on a hill (percent per second)
    pub const DEFAULT_GROW_RATE: f32 = 10.0;
    /// Default drain rate while the owner alone defends against residual progress (percent per second)
    pub const DEFAULT_DRAIN_DEFENDED_RATE: f32 = 15.0;
    /// Default drain rate while nobody stands on a hill (percent per second)
    pub const DEFAULT_DRAIN_EMPTY_RATE: f32 = 5.0;
    /// Default uncontested holding time per team score point (milliseconds)
    pub const DEFAULT_MS_PER_POINT: u32 = 5_000;
    /// Default personal score bonus for each player on a hill when it flips
    pub const DEFAULT_CAPTURE_BONUS: u32 = 2;
}

/// Frame timing constants
pub mod tick {
    /// Largest elapsed time a single tick may simulate (milliseconds)
    pub const MAX_DT_MS: u32 = 250;
    /// Demo frame rate in Hz
    pub const FRAME_RATE: u32 = 60;
    /// Frame duration in milliseconds
    pub const FRAME_DURATION_MS: u64 = 1000 / FRAME_RATE as u64;
}

/// Replication constants
pub mod broadcast {
    /// Width of a change-detection progress bucket (percent)
    pub const PROGRESS_BUCKET_PERCENT: u8 = 5;
    /// Default full-state heartbeat interval (milliseconds, 0 disables)
    pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u32 = 10_000;
}

/// Network constants
pub mod net {
    /// Maximum datagram size in bytes
    pub const MAX_DATAGRAM_SIZE: usize = 1200;
    /// Message tag for `HillStatePacket`
    pub const TAG_HILL_STATE: u8 = 0x01;
    /// Message tag for `HillCapturedPacket`
    pub const TAG_HILL_CAPTURED: u8 = 0x02;
    /// Encoded size of a `HillStatePacket` body (without tag)
    pub const HILL_STATE_BODY_SIZE: usize = 11;
    /// Fixed header of a `HillCapturedPacket` body (without tag and id list)
    pub const HILL_CAPTURED_HEADER_SIZE: usize = 3;
}

/// Level constraints
pub mod level {
    /// Hill ids are 1-based and must fit the u8 wire field
    pub const MAX_HILLS: usize = u8::MAX as usize;
}

/// Convert whole percent to milli-percent
#[inline]
pub fn percent_to_milli(percent: u8) -> u32 {
    percent as u32 * capture::MILLI_PER_PERCENT
}

/// Convert milli-percent to the coarse whole percent used on the wire and HUD
#[inline]
pub fn milli_to_percent(milli: u32) -> u8 {
    (milli.min(capture::MAX_MILLI) / capture::MILLI_PER_PERCENT) as u8
}

/// Convert a percent-per-second rate to milli-percent per second
#[inline]
pub fn rate_to_milli_per_sec(rate: f32) -> u32 {
    if rate.is_finite() && rate > 0.0 {
        (rate * capture::MILLI_PER_PERCENT as f32).round() as u32
    } else {
        0
    }
}
