//! The sound table.
//!
//! [`AudioSystem`] owns one backend and every instance that backend created.
//! A sound's position in the table is its [`SoundIndex`]; entries are never
//! removed or reordered, so indices stay stable until the system is dropped.
//!
//! ```text
//! create_sound(path, flags)
//!        │
//!        ├── find(path, flags) ── hit ──▶ existing index
//!        │
//!        └── miss ──▶ backend.create_sound ──▶ push ──▶ new index
//! ```
//!
//! Bulk operations (`stop_all`, `set_volume_all`, `multiply_volume_all`)
//! walk the table in index order and skip cleared instances. The first
//! failure ends the walk and is returned; instances already visited keep
//! their new state.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::backend::AudioBackend;
use crate::config::AudioConfig;
use crate::error::{ensure_finite, AudioError, AudioResult};
use crate::flags::SoundFlags;
use crate::handle::{SoundChannel, SoundIndex};
use crate::instance::SoundInstance;

/// Sound table over one backend.
pub struct AudioSystem {
    backend: Box<dyn AudioBackend>,
    sounds: Vec<Box<dyn SoundInstance>>,
    config: AudioConfig,
}

impl fmt::Debug for AudioSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSystem")
            .field("backend", &self.backend.name())
            .field("sounds", &self.sounds.len())
            .field("config", &self.config)
            .finish()
    }
}

impl AudioSystem {
    /// Create a system over an uninitialized backend.
    #[must_use]
    pub fn new(backend: Box<dyn AudioBackend>, config: AudioConfig) -> Self {
        let config = config.normalized();
        Self {
            backend,
            sounds: Vec::with_capacity(config.max_sounds.min(64)),
            config,
        }
    }

    /// Initialize the backend.
    pub fn init(&mut self) -> AudioResult<()> {
        self.backend.init()?;
        info!(
            "Audio system initialized on '{}' backend ({} slots)",
            self.backend.name(),
            self.config.max_sounds
        );
        Ok(())
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Name of the installed backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether the backend honours 3D positions and ranges.
    #[must_use]
    pub fn supports_3d(&self) -> bool {
        self.backend.supports_3d()
    }

    // ============================================
    // Table
    // ============================================

    /// Return the index of `path` loaded with `flags`, creating it if needed.
    pub fn create_sound(
        &mut self,
        path: impl AsRef<Path>,
        flags: SoundFlags,
    ) -> AudioResult<SoundIndex> {
        let path = path.as_ref();
        flags.validate()?;

        if let Some(index) = self.find(path, flags) {
            debug!("Reusing sound {index} for '{}' ({flags})", path.display());
            return Ok(index);
        }

        if self.sounds.len() >= self.config.max_sounds {
            return Err(AudioError::CapacityExceeded {
                max: self.config.max_sounds,
            });
        }

        let mut sound = self.backend.create_sound(path, flags)?;
        sound.set_volume(self.config.default_volume)?;

        let index = SoundIndex::new(self.sounds.len());
        self.sounds.push(sound);

        debug!("Created sound {index} for '{}' ({flags})", path.display());
        Ok(index)
    }

    /// First live instance created from `path` with `flags`.
    #[must_use]
    pub fn find(&self, path: impl AsRef<Path>, flags: SoundFlags) -> Option<SoundIndex> {
        if !flags.is_valid() {
            return None;
        }
        let path = path.as_ref();
        self.sounds
            .iter()
            .position(|sound| sound.flags() == flags && sound.file_name() == path)
            .map(SoundIndex::new)
    }

    /// Number of instances in the table, cleared ones included.
    #[must_use]
    pub fn sound_count(&self) -> usize {
        self.sounds.len()
    }

    /// Number of live instances currently playing.
    #[must_use]
    pub fn playing_count(&self) -> usize {
        self.sounds
            .iter()
            .filter(|sound| !sound.is_cleared() && matches!(sound.is_playing(), Ok(true)))
            .count()
    }

    /// Borrow the instance at `index`.
    pub fn sound_instance(&self, index: SoundIndex) -> AudioResult<&dyn SoundInstance> {
        let count = self.sounds.len();
        let sound: &dyn SoundInstance = &**self
            .sounds
            .get(index.raw())
            .ok_or_else(|| AudioError::out_of_range(index.raw(), count))?;
        Ok(sound)
    }

    /// Mutably borrow the instance at `index`.
    pub fn sound_instance_mut(
        &mut self,
        index: SoundIndex,
    ) -> AudioResult<&mut dyn SoundInstance> {
        let count = self.sounds.len();
        let sound: &mut dyn SoundInstance = &mut **self
            .sounds
            .get_mut(index.raw())
            .ok_or_else(|| AudioError::out_of_range(index.raw(), count))?;
        Ok(sound)
    }

    /// Release the backend resource behind `index`. The slot stays taken.
    pub fn clear_sound(&mut self, index: SoundIndex) -> AudioResult<()> {
        self.sound_instance_mut(index)?.clear();
        debug!("Cleared sound {index}");
        Ok(())
    }

    fn channel_index(&self, channel: SoundChannel) -> AudioResult<SoundIndex> {
        channel
            .to_index()
            .filter(|index| index.raw() < self.sounds.len())
            .ok_or_else(|| AudioError::out_of_range(channel.raw(), self.sounds.len()))
    }

    fn live_sounds(&mut self) -> impl Iterator<Item = &mut Box<dyn SoundInstance>> {
        self.sounds.iter_mut().filter(|sound| !sound.is_cleared())
    }

    // ============================================
    // Playback
    // ============================================

    /// Play the sound at `index`, optionally placing it in space first.
    pub fn play(&mut self, index: SoundIndex, position: Option<Vec3>) -> AudioResult<SoundChannel> {
        let sound = self.sound_instance_mut(index)?;
        if let Some(position) = position {
            sound.set_3d_position(position)?;
        }
        sound.play()?;

        let channel = SoundChannel::from_index(index);
        debug!("Playing sound {index} on {channel}");
        Ok(channel)
    }

    /// Stop whatever plays on `channel`.
    pub fn stop(&mut self, channel: SoundChannel) -> AudioResult<()> {
        let index = self.channel_index(channel)?;
        self.sound_instance_mut(index)?.stop()
    }

    /// Stop every live instance.
    pub fn stop_all(&mut self) -> AudioResult<()> {
        for sound in self.live_sounds() {
            sound.stop()?;
        }
        debug!("Stopped all sounds");
        Ok(())
    }

    /// Whether the sound at `index` is playing.
    pub fn is_playing(&self, index: SoundIndex) -> AudioResult<bool> {
        self.sound_instance(index)?.is_playing()
    }

    /// Whether the sound at `index` can seek.
    pub fn is_seekable(&self, index: SoundIndex) -> AudioResult<bool> {
        self.sound_instance(index)?.is_seekable()
    }

    /// Length of the sound at `index`, zero when not seekable.
    pub fn length(&self, index: SoundIndex) -> AudioResult<Duration> {
        self.sound_instance(index)?.length()
    }

    /// Playback position of the sound at `index`.
    pub fn position(&self, index: SoundIndex) -> AudioResult<Duration> {
        self.sound_instance(index)?.position()
    }

    /// Move the playback position of the sound at `index`.
    pub fn set_position(&mut self, index: SoundIndex, position: Duration) -> AudioResult<()> {
        self.sound_instance_mut(index)?.set_position(position)
    }

    /// Rewind the sound at `index`.
    pub fn restart(&mut self, index: SoundIndex) -> AudioResult<()> {
        self.sound_instance_mut(index)?.restart()
    }

    /// Whether the sound at `index` loops.
    pub fn repeat(&self, index: SoundIndex) -> AudioResult<bool> {
        self.sound_instance(index)?.repeat()
    }

    /// Enable or disable looping for the sound at `index`.
    pub fn set_repeat(&mut self, index: SoundIndex, repeat: bool) -> AudioResult<()> {
        self.sound_instance_mut(index)?.set_repeat(repeat)
    }

    /// Set the attenuation range of `channel`.
    pub fn set_3d_range(
        &mut self,
        channel: SoundChannel,
        min_distance: f32,
        max_distance: f32,
    ) -> AudioResult<()> {
        let min_distance = ensure_finite("min distance", min_distance)?;
        let max_distance = ensure_finite("max distance", max_distance)?;
        if min_distance < 0.0 || max_distance < min_distance {
            return Err(AudioError::InvalidArgument(format!(
                "3D range must satisfy 0 <= min <= max, got {min_distance}..{max_distance}"
            )));
        }
        self.channel_index(channel)?;

        if !self.backend.supports_3d() {
            debug!("Backend '{}' ignores 3D ranges", self.backend.name());
        }
        self.backend.set_3d_range(channel, min_distance, max_distance)
    }

    // ============================================
    // Properties
    // ============================================

    /// Volume of the sound at `index`.
    pub fn volume(&self, index: SoundIndex) -> AudioResult<f32> {
        self.sound_instance(index)?.volume()
    }

    /// Set the volume of the sound at `index`.
    pub fn set_volume(&mut self, index: SoundIndex, volume: f32) -> AudioResult<()> {
        self.sound_instance_mut(index)?.set_volume(volume)
    }

    /// Scale the volume of the sound at `index`.
    pub fn multiply_volume(&mut self, index: SoundIndex, ratio: f32) -> AudioResult<()> {
        self.sound_instance_mut(index)?.multiply_volume(ratio)
    }

    /// Set the volume of every live instance.
    pub fn set_volume_all(&mut self, volume: f32) -> AudioResult<()> {
        let volume = ensure_finite("volume", volume)?;
        for sound in self.live_sounds() {
            sound.set_volume(volume)?;
        }
        Ok(())
    }

    /// Scale the volume of every live instance.
    pub fn multiply_volume_all(&mut self, ratio: f32) -> AudioResult<()> {
        let ratio = ensure_finite("volume ratio", ratio)?;
        for sound in self.live_sounds() {
            sound.multiply_volume(ratio)?;
        }
        Ok(())
    }

    /// Pan of the sound at `index`.
    pub fn pan(&self, index: SoundIndex) -> AudioResult<f32> {
        self.sound_instance(index)?.pan()
    }

    /// Set the pan of the sound at `index`.
    pub fn set_pan(&mut self, index: SoundIndex, pan: f32) -> AudioResult<()> {
        self.sound_instance_mut(index)?.set_pan(pan)
    }

    /// Pitch offset of the sound at `index`.
    pub fn pitch_offset(&self, index: SoundIndex) -> AudioResult<f32> {
        self.sound_instance(index)?.pitch_offset()
    }

    /// Set the pitch offset of the sound at `index`.
    pub fn set_pitch_offset(&mut self, index: SoundIndex, pitch: f32) -> AudioResult<()> {
        self.sound_instance_mut(index)?.set_pitch_offset(pitch)
    }

    // ============================================
    // Teardown
    // ============================================

    /// Stop and drop every instance, then release the device.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.stop_all() {
            warn!("Failed to stop sounds during shutdown: {e}");
        }
        self.sounds.clear();
        self.backend.shutdown();
        info!("Audio system on '{}' backend shut down", self.backend.name());
    }
}
