//! Sound request classification.
//!
//! A [`SoundFlags`] value combines one spatial mode, one resource mode and an
//! optional loop bit:
//!
//! ```text
//! spatial   SOUND_2D | SOUND_3D    (exactly one)
//! resource  SOUND    | STREAM      (exactly one)
//! loop      LOOPABLE               (optional)
//! ```

use std::fmt;

use bitflags::bitflags;

use crate::error::{AudioError, AudioResult};

bitflags! {
    /// Bitmask describing spatial mode, resource mode and loopability.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SoundFlags: u32 {
        /// Plays without spatial positioning.
        const SOUND_2D = 1 << 0;
        /// Positioned in 3D space (backend permitting).
        const SOUND_3D = 1 << 1;
        /// Decoded entirely into memory at creation.
        const SOUND = 1 << 2;
        /// Decoded incrementally from disk during playback.
        const STREAM = 1 << 3;
        /// Starts with repeat enabled.
        const LOOPABLE = 1 << 4;
    }
}

impl SoundFlags {
    /// Marks a cleared or uninitialized instance.
    pub const INVALID: Self = Self::empty();

    const SPATIAL: Self = Self::SOUND_2D.union(Self::SOUND_3D);
    const RESOURCE: Self = Self::SOUND.union(Self::STREAM);

    /// Check that exactly one spatial bit and one resource bit are set.
    pub fn validate(self) -> AudioResult<()> {
        let spatial = self.intersection(Self::SPATIAL).bits().count_ones();
        let resource = self.intersection(Self::RESOURCE).bits().count_ones();

        if spatial != 1 {
            return Err(AudioError::InvalidArgument(format!(
                "flags {self} must set exactly one of 2D/3D"
            )));
        }
        if resource != 1 {
            return Err(AudioError::InvalidArgument(format!(
                "flags {self} must set exactly one of Sound/Stream"
            )));
        }
        Ok(())
    }

    /// Whether this is a well-formed creation request.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.validate().is_ok()
    }

    /// Spatial mode is 3D.
    #[must_use]
    pub const fn is_3d(self) -> bool {
        self.contains(Self::SOUND_3D)
    }

    /// Resource mode is streaming.
    #[must_use]
    pub const fn is_streamed(self) -> bool {
        self.contains(Self::STREAM)
    }

    /// Repeat starts enabled.
    #[must_use]
    pub const fn is_loopable(self) -> bool {
        self.contains(Self::LOOPABLE)
    }
}

impl fmt::Display for SoundFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Invalid");
        }

        let names = [
            (Self::SOUND_2D, "2D"),
            (Self::SOUND_3D, "3D"),
            (Self::SOUND, "Sound"),
            (Self::STREAM, "Stream"),
            (Self::LOOPABLE, "Loopable"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
