//! Sound table indices and playback channels.

use std::fmt;

/// Default capacity of the sound table.
pub const MAX_SOUND_CHANNELS: usize = 200;

/// Raw value of a channel that refers to nothing.
pub const INVALID_SOUND_CHANNEL: i32 = -1;

/// Position of a sound instance in its system's table.
///
/// Indices are handed out in creation order and never reused, so an index
/// stays valid for the lifetime of the system that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundIndex(usize);

impl SoundIndex {
    /// Create an index from a raw table position.
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Get the raw table position.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for SoundIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Playback slot returned by `play` and accepted by `stop`.
///
/// The base system maps channel N to sound index N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundChannel(i32);

impl SoundChannel {
    /// Channel that refers to nothing.
    pub const INVALID: Self = Self(INVALID_SOUND_CHANNEL);

    /// Create a channel from a raw value.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw channel value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether the channel could refer to a slot.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Channel that plays the sound at `index`.
    #[must_use]
    pub fn from_index(index: SoundIndex) -> Self {
        i32::try_from(index.raw()).map_or(Self::INVALID, Self)
    }

    /// Sound index this channel plays, if any.
    #[must_use]
    pub fn to_index(self) -> Option<SoundIndex> {
        usize::try_from(self.0).ok().map(SoundIndex::new)
    }
}

impl Default for SoundChannel {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for SoundChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ch{}", self.0)
        } else {
            f.write_str("ch-invalid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_index_mapping() {
        let index = SoundIndex::new(17);
        let channel = SoundChannel::from_index(index);
        assert_eq!(channel.raw(), 17);
        assert_eq!(channel.to_index(), Some(index));
    }

    #[test]
    fn test_invalid_channel() {
        assert!(!SoundChannel::INVALID.is_valid());
        assert_eq!(SoundChannel::INVALID.to_index(), None);
        assert_eq!(SoundChannel::default(), SoundChannel::INVALID);
        assert_eq!(SoundChannel::new(-5).to_index(), None);
    }

    #[test]
    fn test_oversized_index_has_no_channel() {
        let index = SoundIndex::new(usize::MAX);
        assert_eq!(SoundChannel::from_index(index), SoundChannel::INVALID);
    }
}
