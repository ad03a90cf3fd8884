use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use koth_sync::config::KothConfig;
use koth_sync::game::constants::tick;
use koth_sync::game::level::LevelDefinition;
use koth_sync::game::state::{PlayerId, Roster, RosterPlayer, Team};
use koth_sync::metrics::{self, KothMetrics};
use koth_sync::net::session::{KothSession, MultiplayerEnv, ProcessRole};
use koth_sync::net::transport::{dispatch, drain, LoopbackClient, LoopbackHub};
use koth_sync::util::vec3::Vec3;

/// Bot walking speed (units/second)
const BOT_SPEED: f32 = 6.0;

/// Host environment for the demo processes
struct DemoEnv {
    authoritative: bool,
    started: Instant,
}

impl MultiplayerEnv for DemoEnv {
    fn is_multiplayer_active(&self) -> bool {
        true
    }
    fn is_authoritative_server(&self) -> bool {
        self.authoritative
    }
    fn is_listen_server(&self) -> bool {
        false
    }
    fn gameplay_is_active(&self) -> bool {
        true
    }
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Random-walking bot heading for a hill
struct Bot {
    id: PlayerId,
    waypoint: Vec3,
}

/// A connected client process
struct DemoClient {
    name: String,
    session: KothSession,
    link: LoopbackClient,
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn pick_waypoint(rng: &mut StdRng, hills: &[Vec3]) -> Vec3 {
    let jitter = Vec3::new(rng.gen_range(-6.0..6.0), 0.0, rng.gen_range(-6.0..6.0));
    match hills.len() {
        0 => jitter,
        n => hills[rng.gen_range(0..n)] + jitter,
    }
}

fn walk_bots(roster: &mut Roster, bots: &mut [Bot], hills: &[Vec3], dt: f32, rng: &mut StdRng) {
    for bot in bots.iter_mut() {
        let Some(entity) = roster.get_mut(bot.id).and_then(|p| p.entity.as_mut()) else {
            continue;
        };
        let to_target = bot.waypoint - entity.position;
        if to_target.length() < 1.0 || rng.gen_bool(0.002) {
            bot.waypoint = pick_waypoint(rng, hills);
            continue;
        }
        entity.position += to_target.normalize() * (BOT_SPEED * dt).min(to_target.length());
    }
}

fn connect_client(
    name: &str,
    hub: &mut LoopbackHub,
    config: &KothConfig,
    level: &LevelDefinition,
    metrics: &Arc<KothMetrics>,
    team: Team,
) -> DemoClient {
    let mut session = KothSession::new(config.clone(), ProcessRole::Client, metrics.clone());
    session.load_level_definition(level);
    session.set_local_team(Some(team));
    DemoClient {
        name: name.to_string(),
        session,
        link: hub.connect(),
    }
}

async fn run_demo(config: KothConfig, level: LevelDefinition, metrics: Arc<KothMetrics>) -> anyhow::Result<()> {
    let bot_count: u8 = env_or("BOT_COUNT", 8);
    let loss_rate: f64 = env_or("LOSS_RATE", 0.05);
    let late_join_secs: u64 = env_or("LATE_JOIN_SECS", 15);
    let seed: u64 = env_or("DEMO_SEED", 0x4b07);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut hub = LoopbackHub::with_loss(1024, loss_rate, seed);

    let server_env = DemoEnv {
        authoritative: true,
        started: Instant::now(),
    };
    let client_env = DemoEnv {
        authoritative: false,
        started: server_env.started,
    };

    let mut server = KothSession::new(config.clone(), ProcessRole::Server, metrics.clone());
    server.load_level_definition(&level);
    let hill_centers: Vec<Vec3> = server.state().hills.iter().map(|h| h.volume.center()).collect();

    let mut roster = Roster::new();
    let mut bots = Vec::with_capacity(bot_count as usize);
    for i in 0..bot_count {
        let id = i + 1;
        let team = if i % 2 == 0 { Team::Red } else { Team::Blue };
        roster.add_player(RosterPlayer::new(id, format!("bot-{}", id), Some(team)));
        roster.spawn_at(id, pick_waypoint(&mut rng, &hill_centers));
        bots.push(Bot {
            id,
            waypoint: pick_waypoint(&mut rng, &hill_centers),
        });
    }

    let mut clients = vec![connect_client("early", &mut hub, &config, &level, &metrics, Team::Red)];
    let mut late_joined = false;

    info!(
        "Demo running: {} bots, {} hills, {:.0}% loss, late join after {}s",
        bot_count,
        hill_centers.len(),
        loss_rate * 100.0,
        late_join_secs
    );

    let mut ticker = interval(Duration::from_millis(tick::FRAME_DURATION_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();
    let mut last_stats = Instant::now();

    loop {
        ticker.tick().await;
        let dt = last_tick.elapsed().as_secs_f32();
        last_tick = Instant::now();

        walk_bots(&mut roster, &mut bots, &hill_centers, dt, &mut rng);

        let report = server.frame(&server_env, &mut roster, &[]);
        dispatch(&mut hub, &report.outgoing);

        if !late_joined && server_env.started.elapsed() >= Duration::from_secs(late_join_secs) {
            let client = connect_client("late", &mut hub, &config, &level, &metrics, Team::Blue);
            dispatch(&mut hub, &server.on_player_joined(client.link.peer()));
            info!("Client '{}' joined late as peer {}", client.name, client.link.peer());
            clients.push(client);
            late_joined = true;
        }

        for client in &mut clients {
            let incoming = drain(&mut client.link);
            let mut view = roster.clone();
            let report = client.session.frame(&client_env, &mut view, &incoming);
            for event in report.presentation {
                info!("[{}] {:?}", client.name, event);
            }
        }

        if let Some(end) = report.round_end {
            info!("Round finished: {:?}, starting a new round", end.result);
            server.load_level_definition(&level);
            for client in &mut clients {
                client.session.load_level_definition(&level);
            }
        }

        if last_stats.elapsed() >= Duration::from_secs(5) {
            last_stats = Instant::now();
            let scores = server.display_scores();
            info!(
                "Score red {} / blue {} | sent {} dropped {}",
                scores.red,
                scores.blue,
                hub.sent(),
                hub.dropped()
            );
            for hud in server.hud() {
                info!(
                    "  {} {:?} {:?} {}% (red {} / blue {})",
                    hud.name, hud.ownership, hud.state, hud.progress, hud.red_present, hud.blue_present
                );
            }
            for client in &clients {
                let view = client.session.display_scores();
                info!("  client '{}' sees red {} / blue {}", client.name, view.red, view.blue);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("KOTH sync demo v{}", env!("CARGO_PKG_VERSION"));

    let config = KothConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: grow {}%/s, {}ms per point, heartbeat {}ms, score limit {}",
        config.grow_rate, config.ms_per_point, config.heartbeat_interval_ms, config.score_limit
    );

    let level = match &config.level_path {
        Some(path) => LevelDefinition::load(path).with_context(|| format!("loading level {}", path))?,
        None => LevelDefinition::demo(),
    };
    info!("Level '{}': {} capture points", level.name, level.capture_points.len());

    let metrics = Arc::new(KothMetrics::new());

    // Start metrics server on port 9090 (configurable via METRICS_PORT)
    let metrics_port: u16 = env_or("METRICS_PORT", 9090);
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = run_demo(config, level, metrics) => {
            if let Err(e) = result {
                error!("Demo error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
