//! Audio/video merge.
//!
//! [`AvMerger`] hands the renumbered frame sequence and the narration track to
//! `ffmpeg`, trimming the output to the shorter stream.  A merge failure is
//! final: the inputs are already validated, so the same call would fail the
//! same way again.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::MergeConfig;
use crate::render::{count_frames, FRAME_PATTERN};

/// Trailing stderr kept in an encoder error.
const STDERR_TAIL_LINES: usize = 8;

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("missing merge input: {0}")]
    MissingInput(String),

    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder exited with {code:?}: {stderr}")]
    Encoder { code: Option<i32>, stderr: String },

    #[error("encoder produced no output at {0}")]
    EmptyOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Merger trait
// ---------------------------------------------------------------------------

/// A finished merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

#[async_trait]
pub trait Merger: Send + Sync {
    async fn merge(
        &self,
        frames_dir: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<MergedArtifact, MergeError>;
}

// ---------------------------------------------------------------------------
// AvMerger
// ---------------------------------------------------------------------------

pub struct AvMerger {
    config: MergeConfig,
}

impl AvMerger {
    pub fn from_config(config: &MergeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Full `ffmpeg` argument list (program excluded).
    pub fn build_args(&self, frames_dir: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let c = &self.config;
        let pattern = frames_dir.join(FRAME_PATTERN);

        vec![
            "-y".into(),
            "-framerate".into(),
            c.framerate.to_string(),
            "-i".into(),
            pattern.to_string_lossy().into_owned(),
            "-i".into(),
            audio.to_string_lossy().into_owned(),
            "-c:v".into(),
            c.video_codec.clone(),
            "-b:v".into(),
            c.video_bitrate.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            c.audio_codec.clone(),
            "-b:a".into(),
            c.audio_bitrate.clone(),
            "-shortest".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    fn check_inputs(frames_dir: &Path, audio: &Path) -> Result<usize, MergeError> {
        let frames = count_frames(frames_dir)?;
        if frames == 0 {
            return Err(MergeError::MissingInput(format!(
                "no frames in {}",
                frames_dir.display()
            )));
        }
        if !audio.is_file() {
            return Err(MergeError::MissingInput(format!(
                "audio track {} not found",
                audio.display()
            )));
        }
        Ok(frames)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

#[async_trait]
impl Merger for AvMerger {
    async fn merge(
        &self,
        frames_dir: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<MergedArtifact, MergeError> {
        let frames = Self::check_inputs(frames_dir, audio)?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        log::info!(
            "merge: encoding {frames} frame(s) at {} fps with {}",
            self.config.framerate,
            audio.display()
        );

        let result = Command::new(&self.config.ffmpeg)
            .args(self.build_args(frames_dir, audio, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MergeError::Spawn {
                program: self.config.ffmpeg.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(MergeError::Encoder {
                code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        let bytes = match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(MergeError::EmptyOutput(output.to_path_buf())),
        };

        log::info!("merge: wrote {} ({bytes} bytes)", output.display());
        Ok(MergedArtifact {
            path: output.to_path_buf(),
            bytes,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn args_follow_encoder_contract() {
        let merger = AvMerger::from_config(&MergeConfig::default());
        let args = merger.build_args(
            Path::new("/w/temp/frames"),
            Path::new("/w/temp/audio.mp3"),
            Path::new("/w/exports/word_of_the_day.mp4"),
        );

        assert_eq!(
            args,
            vec![
                "-y",
                "-framerate",
                "30",
                "-i",
                "/w/temp/frames/frame%06d.png",
                "-i",
                "/w/temp/audio.mp3",
                "-c:v",
                "libx264",
                "-b:v",
                "8000k",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-shortest",
                "/w/exports/word_of_the_day.mp4",
            ]
        );
    }

    #[test]
    fn codec_is_configurable() {
        let config = MergeConfig {
            video_codec: "h264_videotoolbox".into(),
            framerate: 60,
            ..MergeConfig::default()
        };
        let args = AvMerger::from_config(&config).build_args(
            Path::new("f"),
            Path::new("a.mp3"),
            Path::new("o.mp4"),
        );
        assert!(args.windows(2).any(|w| w == ["-c:v", "h264_videotoolbox"]));
        assert!(args.windows(2).any(|w| w == ["-framerate", "60"]));
    }

    #[tokio::test]
    async fn missing_frames_fail_before_encoding() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("audio.mp3");
        std::fs::write(&audio, b"id3").unwrap();

        let merger = AvMerger::from_config(&MergeConfig::default());
        let err = merger
            .merge(&dir.path().join("frames"), &audio, &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingInput(ref m) if m.contains("no frames")));
    }

    #[tokio::test]
    async fn missing_audio_fails_before_encoding() {
        let dir = tempdir().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        std::fs::write(frames.join("frame000000.png"), b"png").unwrap();

        let merger = AvMerger::from_config(&MergeConfig::default());
        let err = merger
            .merge(&frames, &dir.path().join("audio.mp3"), &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingInput(ref m) if m.contains("audio")));
    }

    #[tokio::test]
    async fn missing_encoder_is_spawn_error() {
        let dir = tempdir().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        std::fs::write(frames.join("frame000000.png"), b"png").unwrap();
        let audio = dir.path().join("audio.mp3");
        std::fs::write(&audio, b"id3").unwrap();

        let config = MergeConfig {
            ffmpeg: "definitely-not-ffmpeg".into(),
            ..MergeConfig::default()
        };
        let err = AvMerger::from_config(&config)
            .merge(&frames, &audio, &dir.path().join("out/o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::Spawn { .. }));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let noise: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(noise.as_bytes());
        assert_eq!(tail.split(" | ").count(), STDERR_TAIL_LINES);
        assert!(tail.starts_with("line 12 | "));
        assert!(tail.ends_with("line 19"));
        assert!(!tail.contains('\n'));
    }
}
