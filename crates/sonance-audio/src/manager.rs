//! Caller-facing audio facade.
//!
//! [`AudioManager`] is constructed by the host and passed by reference to
//! whatever needs sound. It holds at most one [`AudioSystem`], installed by
//! [`init`](AudioManager::init) and removed by
//! [`shutdown`](AudioManager::shutdown). Every other method forwards to the
//! installed system and fails with [`AudioError::NotInitialized`] before
//! `init`, without touching any state.
//!
//! # Example
//!
//! ```ignore
//! use sonance_audio::prelude::*;
//!
//! let audio = AudioManager::with_config(AudioConfig::default());
//! audio.init(create_backend(BackendKind::Rodio))?;
//!
//! let flags = SoundFlags::SOUND_2D | SoundFlags::STREAM | SoundFlags::LOOPABLE;
//! let music = audio.create_sound("assets/music/theme.ogg", flags)?;
//! let channel = audio.play(music, None)?;
//! audio.set_volume(music, 0.7)?;
//!
//! audio.stop(channel)?;
//! audio.shutdown();
//! ```
//!
//! The manager is single-threaded: backends own device handles that stay on
//! the thread that opened them. Closures passed to
//! [`with_sound_instance`](AudioManager::with_sound_instance) may call the
//! manager's read-only queries again; anything that mutates fails with
//! [`AudioError::Busy`] until the outer call returns.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use tracing::{info, warn};

use crate::backend::{create_backend, AudioBackend};
use crate::config::AudioConfig;
use crate::error::{AudioError, AudioResult};
use crate::flags::SoundFlags;
use crate::handle::{SoundChannel, SoundIndex};
use crate::instance::SoundInstance;
use crate::system::AudioSystem;

/// Owns the process's audio system.
#[derive(Debug, Default)]
pub struct AudioManager {
    config: AudioConfig,
    system: RefCell<Option<AudioSystem>>,
}

impl AudioManager {
    /// Create an uninitialized manager with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an uninitialized manager with the given configuration.
    #[must_use]
    pub fn with_config(config: AudioConfig) -> Self {
        Self {
            config,
            system: RefCell::new(None),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Install `backend` and initialize it.
    ///
    /// Fails with `AlreadyInitialized` while a backend is installed. If the
    /// backend's own init fails, nothing is installed.
    pub fn init(&self, backend: Box<dyn AudioBackend>) -> AudioResult<()> {
        let mut slot = self.system.try_borrow_mut().map_err(|_| AudioError::Busy)?;
        if slot.is_some() {
            return Err(AudioError::AlreadyInitialized);
        }

        let mut system = AudioSystem::new(backend, self.config.clone());
        system.init()?;

        info!("Audio manager ready on '{}' backend", system.backend_name());
        *slot = Some(system);
        Ok(())
    }

    /// Install the backend named by the configuration.
    pub fn init_from_config(&self) -> AudioResult<()> {
        self.init(create_backend(self.config.backend))
    }

    /// Stop everything and release the installed backend.
    ///
    /// Ignored with a warning when called from inside a
    /// [`with_sound_instance`](Self::with_sound_instance) closure.
    pub fn shutdown(&self) {
        let system = match self.system.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                warn!("Audio manager shutdown requested during an outer call, ignored");
                return;
            },
        };
        if let Some(mut system) = system {
            system.shutdown();
            info!("Audio manager shut down");
        }
    }

    /// Whether a backend is installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        // A held borrow means a call on an installed system is running.
        self.system.try_borrow().map_or(true, |slot| slot.is_some())
    }

    fn with_system<R>(&self, f: impl FnOnce(&AudioSystem) -> AudioResult<R>) -> AudioResult<R> {
        let guard = self.system.try_borrow().map_err(|_| AudioError::Busy)?;
        let system = guard.as_ref().ok_or(AudioError::NotInitialized)?;
        f(system)
    }

    fn with_system_mut<R>(
        &self,
        f: impl FnOnce(&mut AudioSystem) -> AudioResult<R>,
    ) -> AudioResult<R> {
        let mut guard = self.system.try_borrow_mut().map_err(|_| AudioError::Busy)?;
        let system = guard.as_mut().ok_or(AudioError::NotInitialized)?;
        f(system)
    }

    /// Name of the installed backend.
    pub fn backend_name(&self) -> AudioResult<&'static str> {
        self.with_system(|system| Ok(system.backend_name()))
    }

    /// Whether the installed backend honours 3D positions and ranges.
    pub fn supports_3d(&self) -> AudioResult<bool> {
        self.with_system(|system| Ok(system.supports_3d()))
    }

    // ============================================
    // Table
    // ============================================

    /// Return the index of `path` loaded with `flags`, creating it if needed.
    pub fn create_sound(
        &self,
        path: impl AsRef<Path>,
        flags: SoundFlags,
    ) -> AudioResult<SoundIndex> {
        self.with_system_mut(|system| system.create_sound(path, flags))
    }

    /// First live instance created from `path` with `flags`.
    pub fn find(
        &self,
        path: impl AsRef<Path>,
        flags: SoundFlags,
    ) -> AudioResult<Option<SoundIndex>> {
        self.with_system(|system| Ok(system.find(path, flags)))
    }

    /// Number of instances in the table.
    pub fn sound_count(&self) -> AudioResult<usize> {
        self.with_system(|system| Ok(system.sound_count()))
    }

    /// Number of instances currently playing.
    pub fn playing_count(&self) -> AudioResult<usize> {
        self.with_system(|system| Ok(system.playing_count()))
    }

    /// Run `f` against the instance at `index`.
    pub fn with_sound_instance<R>(
        &self,
        index: SoundIndex,
        f: impl FnOnce(&dyn SoundInstance) -> R,
    ) -> AudioResult<R> {
        self.with_system(|system| Ok(f(system.sound_instance(index)?)))
    }

    /// Run `f` against the instance at `index` with mutable access.
    pub fn with_sound_instance_mut<R>(
        &self,
        index: SoundIndex,
        f: impl FnOnce(&mut dyn SoundInstance) -> R,
    ) -> AudioResult<R> {
        self.with_system_mut(|system| Ok(f(system.sound_instance_mut(index)?)))
    }

    /// Release the backend resource behind `index`.
    pub fn clear_sound(&self, index: SoundIndex) -> AudioResult<()> {
        self.with_system_mut(|system| system.clear_sound(index))
    }

    // ============================================
    // Playback
    // ============================================

    /// Play the sound at `index`, optionally placing it in space first.
    pub fn play(&self, index: SoundIndex, position: Option<Vec3>) -> AudioResult<SoundChannel> {
        self.with_system_mut(|system| system.play(index, position))
    }

    /// Stop whatever plays on `channel`.
    pub fn stop(&self, channel: SoundChannel) -> AudioResult<()> {
        self.with_system_mut(|system| system.stop(channel))
    }

    /// Stop every live instance.
    pub fn stop_all(&self) -> AudioResult<()> {
        self.with_system_mut(AudioSystem::stop_all)
    }

    /// Whether the sound at `index` is playing.
    pub fn is_playing(&self, index: SoundIndex) -> AudioResult<bool> {
        self.with_system(|system| system.is_playing(index))
    }

    /// Whether the sound at `index` can seek.
    pub fn is_seekable(&self, index: SoundIndex) -> AudioResult<bool> {
        self.with_system(|system| system.is_seekable(index))
    }

    /// Length of the sound at `index`.
    pub fn length(&self, index: SoundIndex) -> AudioResult<Duration> {
        self.with_system(|system| system.length(index))
    }

    /// Playback position of the sound at `index`.
    pub fn position(&self, index: SoundIndex) -> AudioResult<Duration> {
        self.with_system(|system| system.position(index))
    }

    /// Move the playback position of the sound at `index`.
    pub fn set_position(&self, index: SoundIndex, position: Duration) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_position(index, position))
    }

    /// Rewind the sound at `index`.
    pub fn restart(&self, index: SoundIndex) -> AudioResult<()> {
        self.with_system_mut(|system| system.restart(index))
    }

    /// Whether the sound at `index` loops.
    pub fn repeat(&self, index: SoundIndex) -> AudioResult<bool> {
        self.with_system(|system| system.repeat(index))
    }

    /// Enable or disable looping for the sound at `index`.
    pub fn set_repeat(&self, index: SoundIndex, repeat: bool) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_repeat(index, repeat))
    }

    /// Set the attenuation range of `channel`; ignored by 2D backends.
    pub fn set_3d_range(
        &self,
        channel: SoundChannel,
        min_distance: f32,
        max_distance: f32,
    ) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_3d_range(channel, min_distance, max_distance))
    }

    // ============================================
    // Properties
    // ============================================

    /// Volume of the sound at `index`.
    pub fn volume(&self, index: SoundIndex) -> AudioResult<f32> {
        self.with_system(|system| system.volume(index))
    }

    /// Set the volume of the sound at `index`.
    pub fn set_volume(&self, index: SoundIndex, volume: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_volume(index, volume))
    }

    /// Scale the volume of the sound at `index`.
    pub fn multiply_volume(&self, index: SoundIndex, ratio: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.multiply_volume(index, ratio))
    }

    /// Set the volume of every live instance.
    pub fn set_volume_all(&self, volume: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_volume_all(volume))
    }

    /// Scale the volume of every live instance.
    pub fn multiply_volume_all(&self, ratio: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.multiply_volume_all(ratio))
    }

    /// Pan of the sound at `index`.
    pub fn pan(&self, index: SoundIndex) -> AudioResult<f32> {
        self.with_system(|system| system.pan(index))
    }

    /// Set the pan of the sound at `index`.
    pub fn set_pan(&self, index: SoundIndex, pan: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_pan(index, pan))
    }

    /// Pitch offset of the sound at `index`.
    pub fn pitch_offset(&self, index: SoundIndex) -> AudioResult<f32> {
        self.with_system(|system| system.pitch_offset(index))
    }

    /// Set the pitch offset of the sound at `index`.
    pub fn set_pitch_offset(&self, index: SoundIndex, pitch: f32) -> AudioResult<()> {
        self.with_system_mut(|system| system.set_pitch_offset(index, pitch))
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        if let Some(mut system) = self.system.get_mut().take() {
            system.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, NullBackend};

    fn loaded_2d() -> SoundFlags {
        SoundFlags::SOUND_2D | SoundFlags::SOUND
    }

    fn null_backend() -> Box<dyn AudioBackend> {
        Box::new(
            NullBackend::new()
                .with_clip("a.wav", Duration::from_secs(3))
                .with_clip("b.wav", Duration::from_secs(1)),
        )
    }

    /// Backend whose device never opens.
    #[derive(Debug)]
    struct NoDevice;

    impl AudioBackend for NoDevice {
        fn name(&self) -> &'static str {
            "no-device"
        }

        fn init(&mut self) -> AudioResult<()> {
            Err(AudioError::DeviceUnavailable("unplugged".to_string()))
        }

        fn is_initialized(&self) -> bool {
            false
        }

        fn create_sound(
            &mut self,
            path: &Path,
            _flags: SoundFlags,
        ) -> AudioResult<Box<dyn SoundInstance>> {
            Err(AudioError::load_failed(path, "no device"))
        }
    }

    #[test]
    fn test_scenario() {
        let audio = AudioManager::new();
        audio.init(null_backend()).expect("init");
        let looping = loaded_2d() | SoundFlags::LOOPABLE;

        assert_eq!(audio.create_sound("a.wav", looping).expect("a"), SoundIndex::new(0));
        assert_eq!(audio.create_sound("a.wav", looping).expect("a"), SoundIndex::new(0));
        assert_eq!(audio.create_sound("b.wav", loaded_2d()).expect("b"), SoundIndex::new(1));
        assert_eq!(audio.sound_count().expect("count"), 2);
        assert_eq!(audio.find("a.wav", looping).expect("find"), Some(SoundIndex::new(0)));
        assert_eq!(audio.find("missing.wav", loaded_2d()).expect("find"), None);
    }

    #[test]
    fn test_everything_fails_before_init() {
        let audio = AudioManager::new();
        let index = SoundIndex::new(0);
        let channel = SoundChannel::new(0);
        let not_init = |result: AudioResult<()>| matches!(result, Err(AudioError::NotInitialized));

        assert!(not_init(audio.create_sound("a.wav", loaded_2d()).map(drop)));
        assert!(not_init(audio.find("a.wav", loaded_2d()).map(drop)));
        assert!(not_init(audio.sound_count().map(drop)));
        assert!(not_init(audio.backend_name().map(drop)));
        assert!(not_init(audio.playing_count().map(drop)));
        assert!(not_init(audio.play(index, None).map(drop)));
        assert!(not_init(audio.stop(channel)));
        assert!(not_init(audio.stop_all()));
        assert!(not_init(audio.is_playing(index).map(drop)));
        assert!(not_init(audio.is_seekable(index).map(drop)));
        assert!(not_init(audio.length(index).map(drop)));
        assert!(not_init(audio.position(index).map(drop)));
        assert!(not_init(audio.set_position(index, Duration::ZERO)));
        assert!(not_init(audio.restart(index)));
        assert!(not_init(audio.repeat(index).map(drop)));
        assert!(not_init(audio.set_repeat(index, true)));
        assert!(not_init(audio.set_3d_range(channel, 1.0, 2.0)));
        assert!(not_init(audio.volume(index).map(drop)));
        assert!(not_init(audio.set_volume(index, 0.5)));
        assert!(not_init(audio.multiply_volume(index, 0.5)));
        assert!(not_init(audio.set_volume_all(0.5)));
        assert!(not_init(audio.multiply_volume_all(0.5)));
        assert!(not_init(audio.pan(index).map(drop)));
        assert!(not_init(audio.set_pan(index, 0.0)));
        assert!(not_init(audio.pitch_offset(index).map(drop)));
        assert!(not_init(audio.set_pitch_offset(index, 1.0)));
        assert!(not_init(audio.clear_sound(index)));
        assert!(not_init(audio.with_sound_instance(index, |_| ())));

        assert!(!audio.is_initialized());
    }

    #[test]
    fn test_double_init_requires_shutdown() {
        let audio = AudioManager::new();
        audio.init(null_backend()).expect("init");
        let index = audio.create_sound("a.wav", loaded_2d()).expect("create");

        assert!(matches!(
            audio.init(null_backend()),
            Err(AudioError::AlreadyInitialized)
        ));
        // The first backend is untouched.
        assert!(audio.volume(index).is_ok());

        audio.shutdown();
        assert!(!audio.is_initialized());
        audio.init(null_backend()).expect("re-init");
        assert_eq!(audio.sound_count().expect("count"), 0);
    }

    #[test]
    fn test_failed_device_installs_nothing() {
        let audio = AudioManager::new();
        assert!(matches!(
            audio.init(Box::new(NoDevice)),
            Err(AudioError::DeviceUnavailable(_))
        ));
        assert!(!audio.is_initialized());
        audio.init(null_backend()).expect("fallback");
    }

    #[test]
    fn test_init_from_config() {
        let config = AudioConfig::default().with_backend(BackendKind::Null);
        let audio = AudioManager::with_config(config);
        audio.init_from_config().expect("init");
        assert!(audio.is_initialized());
        assert_eq!(audio.backend_name().expect("name"), "null");
        assert!(audio.supports_3d().expect("3d"));
    }

    #[test]
    fn test_shutdown_without_init_is_noop() {
        let audio = AudioManager::new();
        audio.shutdown();
        assert!(!audio.is_initialized());
    }

    #[test]
    fn test_sound_instance_access() {
        let audio = AudioManager::new();
        audio.init(null_backend()).expect("init");
        let index = audio.create_sound("b.wav", loaded_2d()).expect("create");

        let name = audio
            .with_sound_instance(index, |sound| sound.file_name().to_path_buf())
            .expect("borrow");
        assert_eq!(name, Path::new("b.wav"));

        audio
            .with_sound_instance_mut(index, |sound| sound.set_pan(0.25))
            .expect("borrow")
            .expect("pan");
        assert!((audio.pan(index).expect("pan") - 0.25).abs() < f32::EPSILON);

        assert!(matches!(
            audio.with_sound_instance(SoundIndex::new(5), |_| ()),
            Err(AudioError::IndexOutOfRange { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_queries_from_inside_closures() {
        let audio = AudioManager::new();
        audio.init(null_backend()).expect("init");
        let index = audio.create_sound("a.wav", loaded_2d()).expect("create");

        let count = audio
            .with_sound_instance(index, |_| audio.sound_count())
            .expect("outer")
            .expect("inner");
        assert_eq!(count, 1);

        let nested = audio
            .with_sound_instance(index, |_| audio.set_volume(index, 0.5))
            .expect("outer");
        assert!(matches!(nested, Err(AudioError::Busy)));

        let nested = audio
            .with_sound_instance_mut(index, |_| audio.sound_count())
            .expect("outer");
        assert!(matches!(nested, Err(AudioError::Busy)));

        let reinit = audio
            .with_sound_instance(index, |_| audio.init(null_backend()))
            .expect("outer");
        assert!(matches!(reinit, Err(AudioError::Busy)));

        audio.with_sound_instance(index, |_| audio.shutdown()).expect("outer");
        assert!(audio.is_initialized());
        assert!((audio.volume(index).expect("volume") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_forwarded_transport() {
        let audio = AudioManager::new();
        audio.init(null_backend()).expect("init");
        let index = audio.create_sound("a.wav", loaded_2d()).expect("create");

        let channel = audio.play(index, None).expect("play");
        assert!(audio.is_playing(index).expect("playing"));
        assert_eq!(audio.playing_count().expect("count"), 1);

        audio.set_position(index, Duration::from_secs(2)).expect("seek");
        assert_eq!(audio.position(index).expect("position"), Duration::from_secs(2));
        audio.restart(index).expect("restart");
        assert_eq!(audio.position(index).expect("position"), Duration::ZERO);

        audio.set_volume(index, 0.8).expect("volume");
        audio.multiply_volume(index, 0.5).expect("multiply");
        assert!((audio.volume(index).expect("volume") - 0.4).abs() < 1e-6);

        audio.stop(channel).expect("stop");
        assert!(!audio.is_playing(index).expect("playing"));
    }
}
