use std::time::Duration;
use thiserror::Error;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Failures of the child-process transport. Any of these ends the sweep.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The server binary could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the child's pipes failed
    #[error("I/O error talking to tool server: {0}")]
    Io(#[from] std::io::Error),

    /// A request could not be serialized
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The child did not exit within the batch budget; the batch is lost
    #[error("tool server did not finish within {after:?}")]
    Timeout { after: Duration },
}

impl ChannelError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout { .. })
    }
}
