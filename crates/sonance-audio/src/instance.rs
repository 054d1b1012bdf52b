//! The per-sound playback contract.
//!
//! Every backend hands out `Box<dyn SoundInstance>` values. An instance wraps
//! one loaded or streamed resource and exposes transport controls plus its
//! volume, pan and pitch. Once [`SoundInstance::clear`] has run the instance
//! is terminal: every other operation fails with
//! [`AudioError::PreconditionViolated`].
//!
//! # Property ranges
//!
//! | property     | range         | default |
//! |--------------|---------------|---------|
//! | volume       | `0.0..=1.0`   | `1.0`   |
//! | pan          | `-1.0..=1.0`  | `0.0`   |
//! | pitch offset | `0.1..=4.0`   | `1.0`   |
//!
//! Out-of-range values are clamped; NaN and infinities are rejected.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;

use crate::error::{ensure_finite, AudioError, AudioResult};
use crate::flags::SoundFlags;

/// Lowest accepted volume.
pub const MIN_VOLUME: f32 = 0.0;
/// Highest accepted volume.
pub const MAX_VOLUME: f32 = 1.0;
/// Full left.
pub const MIN_PAN: f32 = -1.0;
/// Full right.
pub const MAX_PAN: f32 = 1.0;
/// Slowest playback rate.
pub const MIN_PITCH_OFFSET: f32 = 0.1;
/// Fastest playback rate.
pub const MAX_PITCH_OFFSET: f32 = 4.0;

/// Volume, pan, pitch and repeat state shared by all backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceProperties {
    /// Volume multiplier.
    pub volume: f32,
    /// Stereo pan (-1.0 = full left, 0.0 = center, 1.0 = full right).
    pub pan: f32,
    /// Playback rate multiplier.
    pub pitch_offset: f32,
    /// Whether playback loops.
    pub repeat: bool,
}

impl Default for InstanceProperties {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            pan: 0.0,
            pitch_offset: 1.0,
            repeat: false,
        }
    }
}

impl InstanceProperties {
    /// Initial properties for a sound created with `flags`.
    #[must_use]
    pub fn from_flags(flags: SoundFlags) -> Self {
        Self {
            repeat: flags.is_loopable(),
            ..Self::default()
        }
    }

    /// Store a clamped volume and return the applied value.
    pub fn set_volume(&mut self, volume: f32) -> AudioResult<f32> {
        self.volume = ensure_finite("volume", volume)?.clamp(MIN_VOLUME, MAX_VOLUME);
        Ok(self.volume)
    }

    /// Store a clamped pan and return the applied value.
    pub fn set_pan(&mut self, pan: f32) -> AudioResult<f32> {
        self.pan = ensure_finite("pan", pan)?.clamp(MIN_PAN, MAX_PAN);
        Ok(self.pan)
    }

    /// Store a clamped pitch offset and return the applied value.
    pub fn set_pitch_offset(&mut self, pitch: f32) -> AudioResult<f32> {
        self.pitch_offset =
            ensure_finite("pitch offset", pitch)?.clamp(MIN_PITCH_OFFSET, MAX_PITCH_OFFSET);
        Ok(self.pitch_offset)
    }
}

/// One playable resource owned by a backend.
pub trait SoundInstance: fmt::Debug {
    /// Path the instance was created from.
    fn file_name(&self) -> &Path;

    /// Flags used at creation, or [`SoundFlags::INVALID`] once cleared.
    fn flags(&self) -> SoundFlags;

    /// Whether [`clear`](Self::clear) has run.
    fn is_cleared(&self) -> bool {
        self.flags() == SoundFlags::INVALID
    }

    /// Fail with `PreconditionViolated` if the instance is cleared.
    fn ensure_live(&self) -> AudioResult<()> {
        if self.is_cleared() {
            Err(AudioError::PreconditionViolated(format!(
                "sound '{}' has been cleared",
                self.file_name().display()
            )))
        } else {
            Ok(())
        }
    }

    /// Start or resume playback.
    fn play(&mut self) -> AudioResult<()>;

    /// Halt playback and rewind to the start.
    fn stop(&mut self) -> AudioResult<()>;

    /// Whether audio is currently being produced.
    fn is_playing(&self) -> AudioResult<bool>;

    /// Whether the position can be queried and changed.
    fn is_seekable(&self) -> AudioResult<bool>;

    /// Total length, zero when not seekable.
    fn length(&self) -> AudioResult<Duration>;

    /// Current playback position, zero when not seekable.
    fn position(&self) -> AudioResult<Duration>;

    /// Move the playback position. No-op when not seekable.
    fn set_position(&mut self, position: Duration) -> AudioResult<()>;

    /// Rewind to the start, keeping the transport state where possible.
    fn restart(&mut self) -> AudioResult<()> {
        if self.is_seekable()? {
            self.set_position(Duration::ZERO)
        } else {
            self.stop()?;
            self.play()
        }
    }

    /// Enable or disable looping.
    fn set_repeat(&mut self, repeat: bool) -> AudioResult<()>;

    /// Whether playback loops.
    fn repeat(&self) -> AudioResult<bool>;

    /// Set the volume, clamped to `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> AudioResult<()>;

    /// Current volume.
    fn volume(&self) -> AudioResult<f32>;

    /// Scale the current volume by `ratio`.
    fn multiply_volume(&mut self, ratio: f32) -> AudioResult<()> {
        let ratio = ensure_finite("volume ratio", ratio)?;
        let volume = self.volume()?;
        self.set_volume(volume * ratio)
    }

    /// Set the stereo pan, clamped to `-1.0..=1.0`.
    fn set_pan(&mut self, pan: f32) -> AudioResult<()>;

    /// Current stereo pan.
    fn pan(&self) -> AudioResult<f32>;

    /// Set the playback rate multiplier, clamped to `0.1..=4.0`.
    fn set_pitch_offset(&mut self, pitch: f32) -> AudioResult<()>;

    /// Current playback rate multiplier.
    fn pitch_offset(&self) -> AudioResult<f32>;

    /// Place the sound in space. Backends without 3D support ignore this.
    fn set_3d_position(&mut self, _position: Vec3) -> AudioResult<()> {
        self.ensure_live()
    }

    /// Release the backend resource and mark the instance invalid.
    fn clear(&mut self);
}
