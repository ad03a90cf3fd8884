//! Prometheus-compatible metrics endpoint
//!
//! Counters for hill replication and scoring.
//! Default endpoint: http://localhost:9090/metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Metrics registry for a KOTH session
#[derive(Debug)]
pub struct KothMetrics {
    // Frames
    pub server_frames: AtomicU64,
    pub client_frames: AtomicU64,
    pub frame_time_us: AtomicU64,
    pub frame_time_max_us: AtomicU64,

    // Hills
    pub hills: AtomicU64,
    pub captures: AtomicU64,
    pub score_points: AtomicU64,
    pub red_score: AtomicU64,
    pub blue_score: AtomicU64,

    // Replication
    pub state_packets_sent: AtomicU64,
    pub state_packets_suppressed: AtomicU64,
    pub captured_packets_sent: AtomicU64,
    pub late_join_packets_sent: AtomicU64,
    pub heartbeat_packets_sent: AtomicU64,
    pub packets_received: AtomicU64,
    pub decode_errors: AtomicU64,

    start_time: Instant,
}

impl KothMetrics {
    pub fn new() -> Self {
        Self {
            server_frames: AtomicU64::new(0),
            client_frames: AtomicU64::new(0),
            frame_time_us: AtomicU64::new(0),
            frame_time_max_us: AtomicU64::new(0),
            hills: AtomicU64::new(0),
            captures: AtomicU64::new(0),
            score_points: AtomicU64::new(0),
            red_score: AtomicU64::new(0),
            blue_score: AtomicU64::new(0),
            state_packets_sent: AtomicU64::new(0),
            state_packets_suppressed: AtomicU64::new(0),
            captured_packets_sent: AtomicU64::new(0),
            late_join_packets_sent: AtomicU64::new(0),
            heartbeat_packets_sent: AtomicU64::new(0),
            packets_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record how long a frame callback took
    pub fn record_frame_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.frame_time_us.store(us, Ordering::Relaxed);
        self.frame_time_max_us.fetch_max(us, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("koth_server_frames_total", "Server frames processed", "counter",
            self.server_frames.load(Ordering::Relaxed));
        metric!("koth_client_frames_total", "Client frames processed", "counter",
            self.client_frames.load(Ordering::Relaxed));
        metric!("koth_frame_time_microseconds", "Last frame time in microseconds", "gauge",
            self.frame_time_us.load(Ordering::Relaxed));
        metric!("koth_frame_time_max_microseconds", "Maximum frame time", "gauge",
            self.frame_time_max_us.load(Ordering::Relaxed));

        metric!("koth_hills", "Hills registered for the current level", "gauge",
            self.hills.load(Ordering::Relaxed));
        metric!("koth_captures_total", "Ownership flips", "counter",
            self.captures.load(Ordering::Relaxed));
        metric!("koth_score_points_total", "Holding points awarded", "counter",
            self.score_points.load(Ordering::Relaxed));
        metric!("koth_red_score", "Red team score", "gauge",
            self.red_score.load(Ordering::Relaxed));
        metric!("koth_blue_score", "Blue team score", "gauge",
            self.blue_score.load(Ordering::Relaxed));

        metric!("koth_state_packets_sent_total", "Change-triggered state packets", "counter",
            self.state_packets_sent.load(Ordering::Relaxed));
        metric!("koth_state_packets_suppressed_total", "Hill ticks with no observable change", "counter",
            self.state_packets_suppressed.load(Ordering::Relaxed));
        metric!("koth_captured_packets_sent_total", "Captured packets", "counter",
            self.captured_packets_sent.load(Ordering::Relaxed));
        metric!("koth_late_join_packets_sent_total", "State packets sent to joining players", "counter",
            self.late_join_packets_sent.load(Ordering::Relaxed));
        metric!("koth_heartbeat_packets_sent_total", "Heartbeat state packets", "counter",
            self.heartbeat_packets_sent.load(Ordering::Relaxed));
        metric!("koth_packets_received_total", "Datagrams received by clients", "counter",
            self.packets_received.load(Ordering::Relaxed));
        metric!("koth_decode_errors_total", "Rejected datagrams", "counter",
            self.decode_errors.load(Ordering::Relaxed));

        metric!("koth_uptime_seconds", "Uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for KothMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<KothMetrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics") {
                        let body = metrics.to_prometheus();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /health") {
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK".to_string()
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
