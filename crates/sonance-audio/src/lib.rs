//! # Sonance Audio
//!
//! Backend-agnostic sound handles for game hosts.
//!
//! This crate provides:
//! - Sound flags classifying each request (2D/3D, loaded/streamed, looping)
//! - The per-sound playback contract shared by every backend
//! - A sound table that deduplicates identical requests and hands out stable indices
//! - A manager facade that owns one installed backend
//! - A rodio backend for real playback and a device-free backend
//!
//! ## Architecture
//!
//! ```text
//! host ──▶ AudioManager ──▶ AudioSystem ──▶ Box<dyn SoundInstance> ──▶ device
//!                              │
//!                              └── Box<dyn AudioBackend> (creates instances)
//! ```
//!
//! Callers hold integer-like [`SoundIndex`] values; the table keeps ownership
//! of every instance. The manager is single-threaded; calls are
//! synchronous and never spawn threads.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod error;
pub mod flags;
pub mod handle;
pub mod instance;
pub mod manager;
pub mod system;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{create_backend, AudioBackend, BackendKind, NullBackend, RodioBackend};
    pub use crate::config::AudioConfig;
    pub use crate::error::{AudioError, AudioResult};
    pub use crate::flags::SoundFlags;
    pub use crate::handle::{SoundChannel, SoundIndex, INVALID_SOUND_CHANNEL, MAX_SOUND_CHANNELS};
    pub use crate::instance::SoundInstance;
    pub use crate::manager::AudioManager;
    pub use crate::system::AudioSystem;
    pub use glam::Vec3;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_SOUND_CHANNELS, 200);
        assert_eq!(INVALID_SOUND_CHANNEL, -1);
        assert_eq!(SoundChannel::INVALID.raw(), INVALID_SOUND_CHANNEL);
    }

    #[test]
    fn test_prelude_end_to_end() {
        let backend = NullBackend::new().with_clip("music/theme.ogg", Duration::from_secs(90));
        let audio = AudioManager::with_config(AudioConfig::default().with_volume(0.5));
        audio.init(Box::new(backend)).expect("init");

        let flags = SoundFlags::SOUND_2D | SoundFlags::STREAM | SoundFlags::LOOPABLE;
        let music = audio.create_sound("music/theme.ogg", flags).expect("create");
        audio.play(music, None).expect("play");

        assert!(audio.repeat(music).expect("repeat"));
        assert!((audio.volume(music).expect("volume") - 0.5).abs() < f32::EPSILON);

        audio.stop_all().expect("stop");
        audio.shutdown();
    }
}
