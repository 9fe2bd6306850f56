/// Errors raised by the endpoint supervisor and its collaborators.
///
/// `stop()` has no error path: skipping a self-join is a logged warning.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error("endpoint {name} is already running")]
    AlreadyRunning { name: String },

    #[error("failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
