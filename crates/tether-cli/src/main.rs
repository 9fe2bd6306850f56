mod heartbeat;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use heartbeat::{HeartbeatConfig, HeartbeatEndpoint};
use tether_core::{Address, Cryptor, Supervisor, SupervisorConfig};

#[derive(Parser)]
#[command(name = "tether", about = "Run and inspect Tether endpoints")]
struct Cli {
    /// Shared secret used by both ends of a link.
    #[arg(long, env = "TETHER_SECRET", hide_env_values = true)]
    secret: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a heartbeat endpoint under the supervisor.
    Run {
        /// Instance name of this endpoint.
        #[arg(short, long, default_value = "node")]
        name: String,
        /// Peer address the heartbeats are addressed to (host:port).
        #[arg(long, default_value = "127.0.0.1:7700")]
        peer: Address,
        /// Delay between heartbeats in ms.
        #[arg(long, default_value = "500")]
        interval_ms: u64,
        /// Stop from outside after this many seconds.
        #[arg(long, default_value = "5")]
        duration_secs: u64,
        /// Let the main loop stop itself after N heartbeats.
        #[arg(long)]
        self_stop_after: Option<u64>,
        /// Directory for the endpoint log file (default: $TETHER_LOG_DIR).
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Encrypt text and print the sealed payload as hex.
    Seal {
        /// Text to encrypt.
        text: String,
    },

    /// Decrypt a hex payload produced by `seal`.
    Open {
        /// Sealed payload (hex).
        payload: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            name,
            peer,
            interval_ms,
            duration_secs,
            self_stop_after,
            log_dir,
        } => {
            let mut config = SupervisorConfig::new();
            if let Some(dir) = log_dir {
                config = config.log_dir(dir);
            }
            let endpoint = HeartbeatEndpoint::new(HeartbeatConfig {
                peer,
                interval: Duration::from_millis(interval_ms),
                self_stop_after,
            });
            run(
                Supervisor::with_config(name, &cli.secret, endpoint, config),
                Duration::from_secs(duration_secs),
            )?;
        }

        Command::Seal { text } => {
            let sealed = Cryptor::new(&cli.secret).encrypt_str(&text)?;
            println!("{}", hex::encode(sealed));
        }

        Command::Open { payload } => {
            let sealed = hex::decode(payload.trim()).context("payload is not valid hex")?;
            let text = Cryptor::new(&cli.secret).decrypt_str(&sealed)?;
            println!("{text}");
        }
    }

    Ok(())
}

fn run(supervisor: Supervisor<HeartbeatEndpoint>, duration: Duration) -> anyhow::Result<()> {
    let start = Instant::now();

    eprintln!("tether v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Endpoint: {}", supervisor.identity_name());
    if let Some(path) = supervisor.logger().file_path() {
        eprintln!("Log file: {}", path.display());
    }
    eprintln!();

    supervisor.start()?;

    let deadline = start + duration;
    while supervisor.is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    let stopped_itself = !supervisor.is_running();
    supervisor.stop();

    eprintln!(
        "{} heartbeats in {:.1}s ({})",
        supervisor.endpoint().beats(),
        start.elapsed().as_secs_f64(),
        if stopped_itself {
            "main loop stopped itself"
        } else {
            "stopped by deadline"
        }
    );
    Ok(())
}
