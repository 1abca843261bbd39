// meshlink - host node binary
// Brings up the configured links and drives them from a cooperative tick loop

use clap::Parser;
use meshlink::link::{SerialLink, SocketLink};
use meshlink::node::{
    assemble, JoinState, LinkPolicy, NodeConfig, NodeError, SerialConfig, StartupLinks, StdioChannel,
};
use meshlink::{Link, MAX_FRAME_SIZE};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

/// How often link counters are logged
const STATS_PERIOD: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "meshlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen for a TCP client on this port
    #[arg(short, long)]
    port: Option<u16>,

    /// Link arbitration policy
    #[arg(long, value_enum)]
    policy: Option<LinkPolicy>,

    /// Poll period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Carry frames over stdin/stdout as a serial link
    #[arg(long)]
    serial: bool,

    /// Write every received frame back out
    #[arg(long)]
    echo: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn node_config(&self) -> Result<NodeConfig, NodeError> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None if self.serial || self.port.is_some() => NodeConfig::new(),
            None => NodeConfig::listening(),
        };

        if let Some(port) = self.port {
            let socket = config.socket.take().unwrap_or_default();
            config.socket = Some(socket.with_port(port));
        }
        if self.serial && config.serial.is_none() {
            config.serial = Some(SerialConfig::default());
        }
        if let Some(policy) = self.policy {
            config.node.policy = policy;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.node.tick_ms = tick_ms;
        }
        config.node.echo |= self.echo;

        config.validate()?;
        Ok(config)
    }
}

fn start_links(config: &NodeConfig) -> Result<StartupLinks<'static>, NodeError> {
    if config.wireless.is_some() {
        return Err(NodeError::WirelessUnavailable);
    }

    let mut links = StartupLinks::new();

    if let Some(socket) = &config.socket {
        if config.network.credentials.has_usable() {
            tracing::warn!("host network is managed by the operating system, credentials ignored");
        }
        links = links.with_socket(SocketLink::bind(socket.clone())?);
    }

    if let Some(serial) = &config.serial {
        if serial.device != "stdio" {
            return Err(NodeError::SerialUnavailable(serial.device.clone()));
        }
        let mut link = SerialLink::new(StdioChannel::new());
        link.begin()?;
        links = links.with_serial(link);
    }

    Ok(links)
}

async fn run(cli: Cli) -> Result<(), NodeError> {
    let config = cli.node_config()?;
    let links = start_links(&config)?;
    let mut link = assemble(
        config.node.policy,
        links,
        &JoinState::NotRequired,
        config.node.health_check_ticks,
    )?;

    let tick = Duration::from_millis(config.node.tick_ms);
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let stats_every = u64::try_from(STATS_PERIOD.as_millis() / tick.as_millis().max(1))
        .unwrap_or(u64::MAX)
        .max(1);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut frame = [0u8; MAX_FRAME_SIZE];
    let mut ticks: u64 = 0;

    tracing::info!(kind = %link.kind(), policy = ?config.node.policy, "node running");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
            _ = ticker.tick() => {
                let len = link.check_recv_frame(&mut frame);
                if len > 0 {
                    tracing::debug!(len, "frame received");
                    if config.node.echo && link.write_frame(&frame[..len]) == 0 {
                        tracing::debug!(len, "echo dropped");
                    }
                }

                ticks += 1;
                if ticks % stats_every == 0 {
                    let stats = link.stats();
                    tracing::info!(
                        connected = link.is_connected(),
                        sent = stats.frames_sent,
                        received = stats.frames_received,
                        dropped = stats.frames_dropped,
                        peers = stats.peers_accepted,
                        "link stats"
                    );
                }
            }
        }
    }

    link.disable();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "node failed");
        std::process::exit(1);
    }
}
