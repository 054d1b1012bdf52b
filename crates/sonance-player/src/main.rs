//! Sonance player
//!
//! Plays audio files through the Sonance audio layer, one after another.
//!
//! ```text
//! sonance [--config PATH] [--backend rodio|null] [--stream] [--loop] [--3d] [--seconds N] FILE...
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use sonance_audio::config::CONFIG_FILE;
use sonance_audio::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How often playback state is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Playback limit for looping sounds when `--seconds` is not given.
const DEFAULT_LOOP_LIMIT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "sonance", about = "Play audio files through the Sonance audio layer")]
struct Args {
    /// Path to the audio configuration file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Backend to install, overriding the configuration ("rodio" or "null").
    #[arg(long)]
    backend: Option<BackendKind>,
    /// Stream files from disk instead of decoding them up front.
    #[arg(long)]
    stream: bool,
    /// Loop every file.
    #[arg(long = "loop")]
    looping: bool,
    /// Create the sounds as 3D sounds placed at the origin.
    #[arg(long = "3d")]
    spatial: bool,
    /// Stop each file after this many seconds.
    #[arg(long, value_name = "N", value_parser = parse_seconds)]
    seconds: Option<Duration>,
    /// Files to play, in order.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl Args {
    fn flags(&self) -> SoundFlags {
        let mut flags = if self.spatial {
            SoundFlags::SOUND_3D
        } else {
            SoundFlags::SOUND_2D
        };
        flags |= if self.stream {
            SoundFlags::STREAM
        } else {
            SoundFlags::SOUND
        };
        if self.looping {
            flags |= SoundFlags::LOOPABLE;
        }
        flags
    }

    fn limit(&self) -> Option<Duration> {
        match self.seconds {
            Some(limit) => Some(limit),
            None if self.looping => Some(DEFAULT_LOOP_LIMIT),
            None => None,
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{e}"))
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sonance=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = AudioConfig::load_from(&args.config);
    if let Some(backend) = args.backend {
        config = config.with_backend(backend);
    }

    let audio = AudioManager::with_config(config);
    audio
        .init_from_config()
        .context("failed to initialize audio")?;

    let result = run(&audio, &args);
    audio.shutdown();
    result
}

/// Create every sound, then play them in order.
fn run(audio: &AudioManager, args: &Args) -> Result<()> {
    let flags = args.flags();
    info!("Playing {} file(s) as {flags}", args.files.len());

    let mut sounds = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let index = audio
            .create_sound(file, flags)
            .with_context(|| format!("failed to load {}", file.display()))?;
        sounds.push((file, index));
    }

    for (file, index) in sounds {
        let position = args.spatial.then_some(Vec3::ZERO);
        let channel = audio.play(index, position)?;
        info!("{} on {channel}", file.display());

        wait_for(audio, index, args.limit())?;
        audio.stop(channel)?;
    }

    Ok(())
}

/// Block until `index` stops playing or `limit` elapses.
fn wait_for(audio: &AudioManager, index: SoundIndex, limit: Option<Duration>) -> Result<()> {
    let started = Instant::now();

    while audio.is_playing(index)? {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            if !audio.repeat(index)? {
                warn!("Stopping {index} after {:?}", started.elapsed());
            }
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("sonance").chain(list.iter().copied()))
    }

    fn null_audio() -> AudioManager {
        let config = AudioConfig::default().with_backend(BackendKind::Null);
        let audio = AudioManager::with_config(config);
        audio.init_from_config().expect("init");
        audio
    }

    #[test]
    fn test_parse_defaults() {
        let parsed = args(&["a.wav"]).expect("parse");
        assert_eq!(parsed.config, PathBuf::from(CONFIG_FILE));
        assert_eq!(parsed.backend, None);
        assert_eq!(parsed.files, vec![PathBuf::from("a.wav")]);
        assert_eq!(parsed.flags(), SoundFlags::SOUND_2D | SoundFlags::SOUND);
        assert_eq!(parsed.limit(), None);
    }

    #[test]
    fn test_parse_all_options() {
        let parsed = args(&[
            "--config",
            "custom.toml",
            "--backend",
            "null",
            "--stream",
            "--loop",
            "--3d",
            "--seconds",
            "1.5",
            "a.ogg",
            "b.ogg",
        ])
        .expect("parse");

        assert_eq!(parsed.config, PathBuf::from("custom.toml"));
        assert_eq!(parsed.backend, Some(BackendKind::Null));
        assert_eq!(
            parsed.flags(),
            SoundFlags::SOUND_3D | SoundFlags::STREAM | SoundFlags::LOOPABLE
        );
        assert_eq!(parsed.limit(), Some(Duration::from_millis(1500)));
        assert_eq!(parsed.files.len(), 2);
    }

    #[test]
    fn test_looping_gets_default_limit() {
        let parsed = args(&["--loop", "a.wav"]).expect("parse");
        assert_eq!(parsed.limit(), Some(DEFAULT_LOOP_LIMIT));
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--backend", "openal", "a.wav"]).is_err());
        assert!(args(&["--seconds", "-2", "a.wav"]).is_err());
        assert!(args(&["--seconds", "soon", "a.wav"]).is_err());
        assert!(args(&["--volume", "a.wav"]).is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("0"), Ok(Duration::ZERO));
        assert_eq!(parse_seconds("2.5"), Ok(Duration::from_millis(2500)));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("inf").is_err());
    }

    #[test]
    fn test_run_on_null_backend() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("click.wav");
        std::fs::write(&file, b"RIFF").expect("write");

        let audio = null_audio();
        let file = file.to_str().expect("utf-8 path");
        let parsed = args(&["--seconds", "0", file]).expect("parse");
        run(&audio, &parsed).expect("run");

        assert_eq!(audio.sound_count().expect("count"), 1);
        assert_eq!(audio.playing_count().expect("playing"), 0);
        audio.shutdown();
    }

    #[test]
    fn test_run_reports_missing_file() {
        let audio = null_audio();
        let parsed = args(&["does/not/exist.wav"]).expect("parse");
        assert!(run(&audio, &parsed).is_err());
    }
}
