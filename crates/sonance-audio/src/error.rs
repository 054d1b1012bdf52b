//! Error types for the audio layer.

use std::path::PathBuf;

use thiserror::Error;

/// Audio layer error types.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The manager was used before a backend was installed.
    #[error("Audio system not initialized")]
    NotInitialized,

    /// A backend is already installed; shut it down first.
    #[error("Audio system already initialized")]
    AlreadyInitialized,

    /// Malformed flags or out-of-domain numeric input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Sound index or channel outside the instance table.
    #[error("Sound index {index} out of range (count: {count})")]
    IndexOutOfRange {
        /// The offending index.
        index: i64,
        /// Number of instances in the table.
        count: usize,
    },

    /// Operation on a cleared instance.
    #[error("Precondition violated: {0}")]
    PreconditionViolated(String),

    /// The playback device could not be opened.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The backend could not open or decode a file.
    #[error("Failed to load sound '{path}': {message}")]
    ResourceLoadFailed {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The instance table is full.
    #[error("Sound table full (max: {max})")]
    CapacityExceeded {
        /// Maximum number of instances.
        max: usize,
    },

    /// The manager was called back from inside one of its own closures.
    #[error("Audio manager is busy with an outer call")]
    Busy,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Build a load failure for `path`.
    pub fn load_failed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ResourceLoadFailed {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Build an out-of-range error for an index into a table of `count`.
    pub fn out_of_range(index: impl TryInto<i64>, count: usize) -> Self {
        Self::IndexOutOfRange {
            index: index.try_into().unwrap_or(i64::MAX),
            count,
        }
    }
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Reject NaN and infinities before they reach a backend.
pub(crate) fn ensure_finite(name: &str, value: f32) -> AudioResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AudioError::InvalidArgument(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AudioError::NotInitialized;
        assert!(err.to_string().contains("not initialized"));

        let err = AudioError::out_of_range(7usize, 2);
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("count: 2"));

        let err = AudioError::load_failed("sfx/boom.wav", "no such file");
        assert!(err.to_string().contains("boom.wav"));
    }

    #[test]
    fn test_out_of_range_negative_channel() {
        match AudioError::out_of_range(-1i32, 3) {
            AudioError::IndexOutOfRange { index, count } => {
                assert_eq!(index, -1);
                assert_eq!(count, 3);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("volume", 0.5).is_ok());
        assert!(matches!(
            ensure_finite("volume", f32::NAN),
            Err(AudioError::InvalidArgument(_))
        ));
        assert!(ensure_finite("pan", f32::INFINITY).is_err());
    }
}
