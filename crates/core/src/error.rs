/// Result alias that carries the custom [`SoundCueError`] type.
pub type Result<T> = std::result::Result<T, SoundCueError>;

/// Common error type for the core crate.
///
/// None of these ever reach the code that triggers a cue: the service turns
/// them into log lines and silence at its public boundary.
#[derive(Debug, thiserror::Error)]
pub enum SoundCueError {
    /// Free-form failure that does not fit one of the other variants.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The asset source has no file for the requested path.
    #[error("sound file not found: {path}")]
    NotFound { path: String },
    /// The asset server answered with a non-success status.
    #[error("sound file `{path}` returned status {status}")]
    Status { path: String, status: u16 },
    /// Transport level failure while fetching asset bytes.
    #[error("network error while fetching `{path}`: {reason}")]
    Network { path: String, reason: String },
    /// The fetched bytes could not be decoded into samples.
    #[error("failed to decode `{path}`: {reason}")]
    Decode { path: String, reason: String },
    /// The platform audio output refused to open or start a voice.
    #[error("audio output error: {0}")]
    Output(String),
    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SoundCueError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true when the failure happened while obtaining asset bytes,
    /// as opposed to decoding or playing them.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Status { .. } | Self::Network { .. } | Self::Io(_)
        )
    }
}

impl From<&str> for SoundCueError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SoundCueError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
