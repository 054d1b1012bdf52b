//! Rodio Backend
//!
//! Plays sounds on the default output device through rodio.
//!
//! ```text
//! ┌──────────────┐   create_sound   ┌──────────────┐   play   ┌──────────┐
//! │ RodioBackend │ ───────────────▶ │  RodioSound  │ ───────▶ │   Sink   │
//! │ (AudioDevice)│                  │ (buffer or   │          │ (rodio)  │
//! └──────────────┘                  │  file path)  │          └──────────┘
//!                                   └──────────────┘
//! ```
//!
//! `SOUND` requests decode the whole file into memory at creation.
//! `STREAM` requests probe the file at creation and decode it incrementally
//! on every play. Each play gets a fresh sink; stopping drops it.
//!
//! The backend is 2D-only: 3D flags are accepted and have no spatial effect.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::source::SeekError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use super::AudioBackend;
use crate::error::{AudioError, AudioResult};
use crate::flags::SoundFlags;
use crate::instance::{InstanceProperties, SoundInstance};

/// Wraps rodio's output stream for audio playback.
pub struct AudioDevice {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").finish_non_exhaustive()
    }
}

impl AudioDevice {
    /// Open the default output device.
    pub fn open_default() -> AudioResult<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Get a reference to the output stream handle.
    #[must_use]
    pub fn handle(&self) -> &OutputStreamHandle {
        &self.handle
    }
}

/// Backend that plays through the default rodio output stream.
#[derive(Debug, Default)]
pub struct RodioBackend {
    device: Option<AudioDevice>,
}

impl RodioBackend {
    /// Create a backend; the device is opened by `init`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn init(&mut self) -> AudioResult<()> {
        if self.device.is_some() {
            debug!("Rodio device already open");
            return Ok(());
        }
        self.device = Some(AudioDevice::open_default()?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    fn create_sound(
        &mut self,
        path: &Path,
        flags: SoundFlags,
    ) -> AudioResult<Box<dyn SoundInstance>> {
        let device = self.device.as_ref().ok_or(AudioError::NotInitialized)?;
        flags.validate()?;

        if flags.is_3d() {
            debug!("3D flags on '{}' have no spatial effect", path.display());
        }

        let (data, length) = if flags.is_streamed() {
            (SoundData::Streamed, probe_stream(path)?)
        } else {
            let data = decode_buffer(path)?;
            let length = data.buffered_length();
            (data, length)
        };

        debug!("Loaded sound: {} ({flags}), length {length:?}", path.display());

        Ok(Box::new(RodioSound {
            file_name: path.to_path_buf(),
            flags,
            data: Some(data),
            output: device.handle().clone(),
            sink: None,
            props: InstanceProperties::from_flags(flags),
            pan: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            length,
            start_at: Duration::ZERO,
            clock: PlaybackClock::new(),
        }))
    }

    fn shutdown(&mut self) {
        if self.device.take().is_some() {
            info!("Audio device closed");
        }
    }
}

fn open_reader(path: &Path) -> AudioResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| AudioError::load_failed(path, e))
}

fn decode_buffer(path: &Path) -> AudioResult<SoundData> {
    let decoder = Decoder::new(open_reader(path)?).map_err(|e| AudioError::load_failed(path, e))?;

    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    if sample_rate == 0 || channels == 0 {
        return Err(AudioError::load_failed(path, "no audio channels"));
    }

    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    Ok(SoundData::Buffered {
        channels,
        sample_rate,
        samples: Arc::new(samples),
    })
}

fn probe_stream(path: &Path) -> AudioResult<Option<Duration>> {
    let decoder = Decoder::new(open_reader(path)?).map_err(|e| AudioError::load_failed(path, e))?;
    Ok(decoder.total_duration())
}

/// Decoded samples or a file to stream from.
#[derive(Debug)]
enum SoundData {
    Buffered {
        channels: u16,
        sample_rate: u32,
        samples: Arc<Vec<f32>>,
    },
    Streamed,
}

impl SoundData {
    fn buffered_length(&self) -> Option<Duration> {
        match self {
            Self::Buffered {
                channels,
                sample_rate,
                samples,
            } => {
                let frames = samples.len() / usize::from(*channels);
                Some(Duration::from_secs_f64(
                    frames as f64 / f64::from(*sample_rate),
                ))
            },
            Self::Streamed => None,
        }
    }
}

/// Sound instance of the [`RodioBackend`].
pub struct RodioSound {
    file_name: PathBuf,
    flags: SoundFlags,
    /// `None` once cleared.
    data: Option<SoundData>,
    output: OutputStreamHandle,
    /// Present from `play` until `stop`.
    sink: Option<Sink>,
    props: InstanceProperties,
    /// Pan as `f32` bits, read live by the playing source.
    pan: Arc<AtomicU32>,
    /// Known only for seekable sounds.
    length: Option<Duration>,
    /// Offset the next fresh play starts from.
    start_at: Duration,
    clock: PlaybackClock,
}

impl std::fmt::Debug for RodioSound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSound")
            .field("file_name", &self.file_name)
            .field("flags", &self.flags)
            .field("props", &self.props)
            .field("length", &self.length)
            .field("active", &self.active_sink().is_some())
            .finish_non_exhaustive()
    }
}

impl RodioSound {
    fn active_sink(&self) -> Option<&Sink> {
        self.sink.as_ref().filter(|sink| !sink.empty())
    }

    /// Append a freshly built source to `sink`.
    fn queue(&self, sink: &Sink) -> AudioResult<()> {
        let pan = Arc::clone(&self.pan);

        match &self.data {
            Some(SoundData::Buffered {
                channels,
                sample_rate,
                samples,
            }) => {
                let source = SamplesBuffer::new(*channels, *sample_rate, samples.to_vec());
                if self.props.repeat {
                    sink.append(PanControl::new(source.repeat_infinite(), pan));
                } else {
                    sink.append(PanControl::new(source, pan));
                }
            },
            Some(SoundData::Streamed) => {
                let path = &self.file_name;
                let reader = open_reader(path)?;
                if self.props.repeat {
                    let decoder =
                        Decoder::new_looped(reader).map_err(|e| AudioError::load_failed(path, e))?;
                    sink.append(PanControl::new(decoder.convert_samples::<f32>(), pan));
                } else {
                    let decoder =
                        Decoder::new(reader).map_err(|e| AudioError::load_failed(path, e))?;
                    sink.append(PanControl::new(decoder.convert_samples::<f32>(), pan));
                }
            },
            None => self.ensure_live()?,
        }
        Ok(())
    }

    /// Rebuild the playing source at the current position.
    fn requeue(&mut self) -> AudioResult<()> {
        let position = self.position()?;
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.start_at = position;
        self.play()
    }
}

impl SoundInstance for RodioSound {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn flags(&self) -> SoundFlags {
        self.flags
    }

    fn play(&mut self) -> AudioResult<()> {
        self.ensure_live()?;
        if self.active_sink().is_some() {
            return Ok(());
        }

        let sink =
            Sink::try_new(&self.output).map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        sink.set_volume(self.props.volume);
        sink.set_speed(self.props.pitch_offset);
        self.queue(&sink)?;

        let requested = std::mem::take(&mut self.start_at);
        let start = start_offset(&self.file_name, requested, |offset| sink.try_seek(offset));

        sink.play();
        self.clock.start(start, self.props.pitch_offset, Instant::now());
        self.sink = Some(sink);

        debug!("Playing '{}' from {start:?}", self.file_name.display());
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.ensure_live()?;
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.start_at = Duration::ZERO;
        self.clock.halt();
        Ok(())
    }

    fn is_playing(&self) -> AudioResult<bool> {
        self.ensure_live()?;
        Ok(self.active_sink().is_some())
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
        let Some(length) = self.length else {
            return Ok(Duration::ZERO);
        };

        let position = match (&self.sink, self.active_sink()) {
            (_, Some(_)) => wrap_position(
                self.clock.position_at(Instant::now()),
                length,
                self.props.repeat,
            ),
            // Finished on its own.
            (Some(_), None) => length,
            (None, None) => self.start_at,
        };
        Ok(position)
    }

    fn set_position(&mut self, position: Duration) -> AudioResult<()> {
        self.ensure_live()?;
        let Some(length) = self.length else {
            debug!("'{}' is not seekable", self.file_name.display());
            return Ok(());
        };
        let position = position.min(length);

        match self.active_sink().map(|sink| sink.try_seek(position)) {
            Some(Ok(())) => self.clock.seek(position, Instant::now()),
            Some(Err(e)) => {
                warn!(
                    "Seek on '{}' failed, restarting at {position:?}: {e:?}",
                    self.file_name.display()
                );
                if let Some(sink) = self.sink.take() {
                    sink.stop();
                }
                self.start_at = position;
                self.play()?;
            },
            None => {
                self.sink = None;
                self.start_at = position;
            },
        }
        Ok(())
    }

    fn set_repeat(&mut self, repeat: bool) -> AudioResult<()> {
        self.ensure_live()?;
        if self.props.repeat == repeat {
            return Ok(());
        }
        self.props.repeat = repeat;

        if self.active_sink().is_some() {
            self.requeue()?;
        }
        Ok(())
    }

    fn repeat(&self) -> AudioResult<bool> {
        self.ensure_live()?;
        Ok(self.props.repeat)
    }

    fn set_volume(&mut self, volume: f32) -> AudioResult<()> {
        self.ensure_live()?;
        let volume = self.props.set_volume(volume)?;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
        Ok(())
    }

    fn volume(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.volume)
    }

    fn set_pan(&mut self, pan: f32) -> AudioResult<()> {
        self.ensure_live()?;
        let pan = self.props.set_pan(pan)?;
        self.pan.store(pan.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn pan(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.pan)
    }

    fn set_pitch_offset(&mut self, pitch: f32) -> AudioResult<()> {
        self.ensure_live()?;
        let pitch = self.props.set_pitch_offset(pitch)?;
        if let Some(sink) = &self.sink {
            sink.set_speed(pitch);
        }
        self.clock.set_speed(pitch, Instant::now());
        Ok(())
    }

    fn pitch_offset(&self) -> AudioResult<f32> {
        self.ensure_live()?;
        Ok(self.props.pitch_offset)
    }

    fn clear(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        if self.data.take().is_some() {
            debug!("Cleared sound '{}'", self.file_name.display());
        }
        self.flags = SoundFlags::INVALID;
        self.start_at = Duration::ZERO;
        self.clock.halt();
    }
}

/// Offset a fresh sink actually starts from after seeking to `requested`.
fn start_offset(
    path: &Path,
    requested: Duration,
    seek: impl FnOnce(Duration) -> Result<(), SeekError>,
) -> Duration {
    if requested.is_zero() {
        return Duration::ZERO;
    }
    match seek(requested) {
        Ok(()) => requested,
        Err(e) => {
            warn!("Seek on '{}' failed, playing from the start: {e:?}", path.display());
            Duration::ZERO
        },
    }
}

/// Fold a running position into `0..=length`.
fn wrap_position(position: Duration, length: Duration, repeat: bool) -> Duration {
    if length.is_zero() {
        Duration::ZERO
    } else if repeat {
        Duration::from_secs_f64(position.as_secs_f64() % length.as_secs_f64())
    } else {
        position.min(length)
    }
}

/// Left/right gains for a pan value in `-1.0..=1.0`.
fn pan_gains(pan: f32) -> (f32, f32) {
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}

/// Tracks playback position from wall time and playback rate.
#[derive(Debug, Clone, Copy)]
struct PlaybackClock {
    /// Position at `anchor`.
    base: Duration,
    /// Set while running.
    anchor: Option<Instant>,
    speed: f32,
}

impl PlaybackClock {
    const fn new() -> Self {
        Self {
            base: Duration::ZERO,
            anchor: None,
            speed: 1.0,
        }
    }

    fn start(&mut self, from: Duration, speed: f32, now: Instant) {
        self.base = from;
        self.speed = speed;
        self.anchor = Some(now);
    }

    fn halt(&mut self) {
        self.base = Duration::ZERO;
        self.anchor = None;
    }

    fn seek(&mut self, to: Duration, now: Instant) {
        self.base = to;
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    fn set_speed(&mut self, speed: f32, now: Instant) {
        self.base = self.position_at(now);
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
        self.speed = speed;
    }

    fn position_at(&self, now: Instant) -> Duration {
        match self.anchor {
            Some(anchor) => self.base + now.saturating_duration_since(anchor).mul_f32(self.speed),
            None => self.base,
        }
    }
}

/// Applies a live stereo pan to an `f32` source.
///
/// Non-stereo input passes through unchanged.
struct PanControl<S> {
    input: S,
    pan: Arc<AtomicU32>,
    /// Channel of the next sample within the current frame.
    channel: u16,
}

impl<S> PanControl<S> {
    fn new(input: S, pan: Arc<AtomicU32>) -> Self {
        Self {
            input,
            pan,
            channel: 0,
        }
    }
}

impl<S> Iterator for PanControl<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let channels = self.input.channels().max(1);
        let sample = self.input.next()?;

        let out = if channels == 2 {
            let (left, right) = pan_gains(f32::from_bits(self.pan.load(Ordering::Relaxed)));
            if self.channel == 0 {
                sample * left
            } else {
                sample * right
            }
        } else {
            sample
        };

        self.channel = (self.channel + 1) % channels;
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.input.size_hint()
    }
}

impl<S> Source for PanControl<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.input.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.input.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.input.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.input.try_seek(pos)?;
        self.channel = 0;
        Ok(())
    }
}
