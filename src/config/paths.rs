//! Filesystem layout for a pipeline workspace plus the settings location.
//!
//! Workspace layout (relative to the project root):
//!
//! ```text
//! data_bridge.json            persisted ContentPackage handoff
//! local_fallback.json         fallback word records
//! HANDOVER.md                 append-only run journal
//! temp/                       transient working area (removable)
//!   audio.mp3
//!   frames/frame000000.png …
//! exports/word_of_the_day.mp4 latest merged artifact
//! permanent_archive/YYYY-MM-DD/
//! ```
//!
//! Settings file:
//!   Linux:   ~/.config/wotd-reel/settings.toml
//!   macOS:   ~/Library/Application Support/wotd-reel/settings.toml
//!   Windows: %APPDATA%\wotd-reel\settings.toml

use std::path::{Path, PathBuf};

/// All resolved paths for one project root.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Project root every other workspace path hangs off.
    pub root: PathBuf,
    /// The persisted ContentPackage read by the renderer and synthesizer.
    pub content_package: PathBuf,
    /// JSON array of fallback word records.
    pub fallback_file: PathBuf,
    /// Append-only markdown run journal.
    pub journal_file: PathBuf,
    /// Transient working area; removed wholesale by cleanup.
    pub temp_dir: PathBuf,
    /// Renumbered frames handed to the merger.
    pub frames_dir: PathBuf,
    /// Synthesized narration track.
    pub audio_file: PathBuf,
    /// Durable location of the latest artifact.
    pub exports_dir: PathBuf,
    /// Where `produce` writes the merged artifact.
    pub export_file: PathBuf,
    /// Date-partitioned archive for distributed artifacts.
    pub archive_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "wotd-reel";

    /// Resolve the workspace layout under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let temp_dir = root.join("temp");
        let exports_dir = root.join("exports");

        Self {
            content_package: root.join("data_bridge.json"),
            fallback_file: root.join("local_fallback.json"),
            journal_file: root.join("HANDOVER.md"),
            frames_dir: temp_dir.join("frames"),
            audio_file: temp_dir.join("audio.mp3"),
            export_file: exports_dir.join("word_of_the_day.mp4"),
            archive_dir: root.join("permanent_archive"),
            temp_dir,
            exports_dir,
            root,
        }
    }

    /// Default `settings.toml` location in the platform config directory.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn default_settings_file() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME)
            .join("settings.toml")
    }

    /// Resolve `path` against the project root unless it is already absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
