//! Tether endpoint base.
//!
//! Supervises the worker threads of long-lived clients and servers that talk
//! over a shared-secret encrypted channel: one main-loop worker per run,
//! any number of auxiliary workers, and an idempotent `stop()` that joins
//! them all without ever joining the calling thread.
//!
//! Crypto: HKDF-SHA256 key derivation + XChaCha20-Poly1305 encryption.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tether_core::{Endpoint, RunContext, Supervisor};
//!
//! struct Echo;
//!
//! impl Endpoint for Echo {
//!     fn main_loop(&self, ctx: &RunContext<Self>) -> anyhow::Result<()> {
//!         while !ctx.wait_cancelled(Duration::from_millis(100)) {
//!             let sealed = ctx.cryptor().encrypt(b"tick")?;
//!             ctx.logger().debug(format_args!("sealed {} bytes", sealed.len()));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), tether_core::TetherError> {
//! let supervisor = Supervisor::new("node-A", "shared secret", Echo);
//! supervisor.start()?;
//! std::thread::sleep(Duration::from_secs(1));
//! supervisor.stop();
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logger;
pub mod supervisor;

pub use address::Address;
pub use config::SupervisorConfig;
pub use crypto::Cryptor;
pub use error::TetherError;
pub use logger::EndpointLogger;
pub use supervisor::{CancelToken, Endpoint, RunContext, Supervisor, DEFAULT_MAIN_LOOP_NAME};
