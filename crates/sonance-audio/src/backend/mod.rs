//! Native audio bindings.
//!
//! A backend opens the playback device and turns `(path, flags)` requests into
//! [`SoundInstance`] values. The [`AudioSystem`](crate::system::AudioSystem)
//! owns the resulting instances; the backend only creates them.
//!
//! | kind    | device      | 3D  | use                        |
//! |---------|-------------|-----|----------------------------|
//! | `rodio` | default out | no  | normal playback            |
//! | `null`  | none        | yes | headless hosts and tests   |

mod null_backend;
mod rodio_backend;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};
use crate::flags::SoundFlags;
use crate::handle::SoundChannel;
use crate::instance::SoundInstance;

pub use self::null_backend::{NullBackend, NullSound};
pub use self::rodio_backend::{AudioDevice, RodioBackend, RodioSound};

/// A binding to a native audio library.
pub trait AudioBackend: fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Open the playback device.
    fn init(&mut self) -> AudioResult<()>;

    /// Whether [`init`](Self::init) has succeeded.
    fn is_initialized(&self) -> bool;

    /// Load or open `path` and wrap it in a new instance.
    fn create_sound(
        &mut self,
        path: &Path,
        flags: SoundFlags,
    ) -> AudioResult<Box<dyn SoundInstance>>;

    /// Whether 3D positions and ranges have any effect.
    fn supports_3d(&self) -> bool {
        false
    }

    /// Set the attenuation range of a channel. 2D backends accept and ignore it.
    fn set_3d_range(
        &mut self,
        _channel: SoundChannel,
        _min_distance: f32,
        _max_distance: f32,
    ) -> AudioResult<()> {
        Ok(())
    }

    /// Release the playback device.
    fn shutdown(&mut self) {}
}

/// Backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Real playback through rodio.
    #[default]
    Rodio,
    /// No device; transport is tracked as state only.
    Null,
}

impl BackendKind {
    /// Config/CLI name of the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rodio => "rodio",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rodio" => Ok(Self::Rodio),
            "null" => Ok(Self::Null),
            other => Err(AudioError::InvalidArgument(format!(
                "unknown audio backend '{other}'"
            ))),
        }
    }
}

/// Build an uninitialized backend of the given kind.
#[must_use]
pub fn create_backend(kind: BackendKind) -> Box<dyn AudioBackend> {
    match kind {
        BackendKind::Rodio => Box::new(RodioBackend::new()),
        BackendKind::Null => Box::new(NullBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("rodio".parse::<BackendKind>().ok(), Some(BackendKind::Rodio));
        assert_eq!("NULL".parse::<BackendKind>().ok(), Some(BackendKind::Null));
        assert!(matches!(
            "openal".parse::<BackendKind>(),
            Err(AudioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_backend_kind_display_round_trip() {
        for kind in [BackendKind::Rodio, BackendKind::Null] {
            assert_eq!(kind.to_string().parse::<BackendKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn test_create_backend() {
        let backend = create_backend(BackendKind::Null);
        assert_eq!(backend.name(), "null");
        assert!(!backend.is_initialized());

        // Constructing the rodio backend must not touch the device.
        let backend = create_backend(BackendKind::Rodio);
        assert_eq!(backend.name(), "rodio");
        assert!(!backend.is_initialized());
    }
}
