//! Device-free backend.
//!
//! Transport and properties are tracked as plain state, so hosts without an
//! audio device (dedicated servers, CI) keep the same sound table semantics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info};

use super::AudioBackend;
use crate::error::{AudioError, AudioResult};
use crate::flags::SoundFlags;
use crate::handle::SoundChannel;
use crate::instance::{InstanceProperties, SoundInstance};

/// Backend that never opens a device.
#[derive(Debug, Default)]
pub struct NullBackend {
    initialized: bool,
    /// Known clip lengths; registered clips are seekable.
    clips: HashMap<PathBuf, Duration>,
    /// Last attenuation range per channel.
    ranges: HashMap<SoundChannel, (f32, f32)>,
}

impl NullBackend {
    /// Create an uninitialized backend with no registered clips.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip of known length.
    #[must_use]
    pub fn with_clip(mut self, path: impl Into<PathBuf>, length: Duration) -> Self {
        self.register_clip(path, length);
        self
    }

    /// Register a clip of known length.
    pub fn register_clip(&mut self, path: impl Into<PathBuf>, length: Duration) {
        self.clips.insert(path.into(), length);
    }

    /// Last range set for `channel`.
    #[must_use]
    pub fn range_3d(&self, channel: SoundChannel) -> Option<(f32, f32)> {
        self.ranges.get(&channel).copied()
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn init(&mut self) -> AudioResult<()> {
        self.initialized = true;
        info!("Null audio backend initialized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn create_sound(
        &mut self,
        path: &Path,
        flags: SoundFlags,
    ) -> AudioResult<Box<dyn SoundInstance>> {
        if !self.initialized {
            return Err(AudioError::NotInitialized);
        }
        flags.validate()?;

        let length = match self.clips.get(path) {
            Some(length) => Some(*length),
            None if path.is_file() => None,
            None => return Err(AudioError::load_failed(path, "file not found")),
        };

        debug!("Null sound {} ({flags}), length {length:?}", path.display());
        Ok(Box::new(NullSound::new(path, flags, length)))
    }

    fn supports_3d(&self) -> bool {
        true
    }

    fn set_3d_range(
        &mut self,
        channel: SoundChannel,
        min_distance: f32,
        max_distance: f32,
    ) -> AudioResult<()> {
        self.ranges.insert(channel, (min_distance, max_distance));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.ranges.clear();
    }
}

/// Sound instance of the [`NullBackend`].
#[derive(Debug, Clone)]
pub struct NullSound {
    file_name: PathBuf,
    flags: SoundFlags,
    props: InstanceProperties,
    length: Option<Duration>,
    position: Duration,
    playing: bool,
    position_3d: Option<Vec3>,
}

impl NullSound {
    /// Create an instance; `length` of `None` makes it unseekable.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, flags: SoundFlags, length: Option<Duration>) -> Self {
        Self {
            file_name: path.into(),
            flags,
            props: InstanceProperties::from_flags(flags),
            length,
            position: Duration::ZERO,
            playing: false,
            position_3d: None,
        }
    }

    /// Last position set through `set_3d_position` on a 3D sound.
    #[must_use]
    pub const fn position_3d(&self) -> Option<Vec3> {
        self.position_3d
    }
}

impl SoundInstance for NullSound {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn flags(&self) -> SoundFlags {
        self.flags
    }

    fn play(&mut self) -> AudioResult<()> {
        self.ensure_live()?;
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.ensure_live()?;
        self.playing = false;
        self.position = Duration::ZERO;
        Ok(())
    }

    fn is_playing(&self) -> AudioResult<bool> {
        self.ensure_live()?;
        Ok(self.playing)
    }

    fn is_seekable(&self) -> AudioResult<bool> {
        self.ensure_live()?;
        Ok(self.length.is_some())
    }

    fn length(&self) -> AudioResult<Duration> {
        self.ensure_live()?;
        Ok(self.length.unwrap_or_default())
    }

    fn position(&self) -> AudioResult<Duration> {
        self.ensure_live()?;
        Ok(self.position)
    }

    fn set_position(&mut self, position: Duration) -> AudioResult<()> {
        self.ensure_live()?;
        if let Some(length) = self.length {
            self.position = position.min(length);
        }
        Ok(())
    }

    fn set_repeat(&mut self, repeat: bool) -> AudioResult<()> {
        self.ensure_live()?;
        self.props.repeat = repeat;
        Ok(())
    }

    fn repeat(&self) -> AudioResult<bool> {
        self.ensure_live()?;
        Ok(self.props.repeat)
    }

    fn set_volume(&mut self, volume: f32) -> AudioResult<()> {
        self.ensure_live()?;
        self.props.set_volume(volume).map(drop)
    }

    fn volume(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.volume)
    }

    fn set_pan(&mut self, pan: f32) -> AudioResult<()> {
        self.ensure_live()?;
        self.props.set_pan(pan).map(drop)
    }

    fn pan(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.pan)
    }

    fn set_pitch_offset(&mut self, pitch: f32) -> AudioResult<()> {
        self.ensure_live()?;
        self.props.set_pitch_offset(pitch).map(drop)
    }

    fn pitch_offset(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.pitch_offset)
    }

    fn set_3d_position(&mut self, position: Vec3) -> AudioResult<()> {
        self.ensure_live()?;
        if self.flags.is_3d() {
            self.position_3d = Some(position);
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.flags = SoundFlags::INVALID;
        self.playing = false;
        self.position = Duration::ZERO;
        self.position_3d = None;
    }
}
