use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use tether_core::{Address, Endpoint, RunContext};

/// Heartbeat endpoint settings.
pub struct HeartbeatConfig {
    pub peer: Address,
    pub interval: Duration,
    /// Stop from inside the main loop after this many beats.
    pub self_stop_after: Option<u64>,
}

/// Demo endpoint: seals and opens a heartbeat message every interval.
///
/// No I/O: the peer address only labels the heartbeats.
pub struct HeartbeatEndpoint {
    config: HeartbeatConfig,
    beats: AtomicU64,
}

impl HeartbeatEndpoint {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            beats: AtomicU64::new(0),
        }
    }

    /// Heartbeats sent across all runs.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    fn beat(&self, ctx: &RunContext<Self>, seq: u64) -> anyhow::Result<()> {
        let message = format!(
            "heartbeat #{seq} from {} to {}",
            ctx.supervisor().identity_name(),
            self.config.peer
        );
        let sealed = ctx.cryptor().encrypt_str(&message)?;
        let opened = ctx
            .cryptor()
            .decrypt_str(&sealed)
            .context("heartbeat failed to open under its own key")?;
        anyhow::ensure!(opened == message, "heartbeat #{seq} corrupted in transit");

        ctx.logger().info(format_args!(
            "beat #{seq} -> {} ({} bytes sealed)",
            self.config.peer,
            sealed.len()
        ));
        Ok(())
    }
}

impl Endpoint for HeartbeatEndpoint {
    fn log_file_name(&self) -> Option<String> {
        Some("heartbeat".into())
    }

    fn main_loop_name(&self) -> String {
        "HeartbeatLoop".into()
    }

    fn main_loop(&self, ctx: &RunContext<Self>) -> anyhow::Result<()> {
        let watchdog_token = ctx.cancel_token().clone();
        let identity = ctx.supervisor().identity_name().to_string();
        ctx.spawn_worker("Watchdog", move || {
            watchdog_token.wait();
            tracing::info!(endpoint = %identity, "watchdog observed cancellation");
        })?;

        let mut run_beats = 0u64;
        while !ctx.wait_cancelled(self.config.interval) {
            let seq = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
            self.beat(ctx, seq)?;
            run_beats += 1;

            if self.config.self_stop_after == Some(run_beats) {
                ctx.logger()
                    .info(format_args!("stopping after {run_beats} beats"));
                ctx.supervisor().stop();
                break;
            }
        }
        Ok(())
    }
}
