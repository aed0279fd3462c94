//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to collaborators
//! at construction time.  Every table is `#[serde(default)]`, so a partial
//! `settings.toml` only needs the keys it overrides.
//!
//! Credentials are usually kept out of the TOML file and supplied through the
//! environment instead; see [`AppConfig::apply_env`].

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Live word-of-the-day source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Page carrying the embedded word-of-the-day JSON.
    pub url: String,
    /// Maximum seconds to wait for the page.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://www.dictionary.com/e/word-of-the-day/".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

/// Generative text backend (any OpenAI-compatible chat-completions API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the API endpoint, without the `/v1/...` suffix.
    pub base_url: String,
    /// Bearer token; `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for one completion.
    pub timeout_secs: u64,
    /// Total generation attempts before giving up.
    pub max_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// ElevenLabs text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            voice_id: "onwK4e9ZLuTAKqWW03F9".into(),
            model_id: "eleven_multilingual_v2".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderConfig
// ---------------------------------------------------------------------------

/// Headless render session and the completion watcher's timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Program that starts the render session.
    pub program: String,
    /// Arguments passed to `program`.
    pub args: Vec<String>,
    /// Working directory for the session, relative to the project root.
    pub working_dir: String,
    /// Directory the session writes PNG frames into, relative to the project
    /// root.
    pub output_dir: String,
    /// Milliseconds between two polls of the output directory.
    pub poll_interval_ms: u64,
    /// Consecutive unchanged, positive-count polls required for completion.
    pub debounce_threshold: u32,
    /// Hard ceiling in seconds from launch to completion.
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: "node".into(),
            args: vec!["render.mjs".into()],
            working_dir: "motion-canvas".into(),
            output_dir: "motion-canvas/output".into(),
            poll_interval_ms: 1_000,
            debounce_threshold: 3,
            timeout_secs: 180,
        }
    }
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// ffmpeg invocation used to mux frames and narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub ffmpeg: String,
    pub framerate: u32,
    /// `libx264` by default; `h264_videotoolbox` on Apple silicon.
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            framerate: 30,
            video_codec: "libx264".into(),
            video_bitrate: "8000k".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertConfig
// ---------------------------------------------------------------------------

/// SMTP settings for operator alerts.  Alerts are skipped unless the
/// username, password and recipient are all present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 465,
            username: None,
            password: None,
            recipient: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Command used to open the artifact for review; empty disables preview.
    pub preview_command: String,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        let preview_command = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Self {
            preview_command: preview_command.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Platform credentials
// ---------------------------------------------------------------------------

/// TikTok Content Posting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TikTokConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    /// `SELF_ONLY` until the account is cleared for public posting.
    pub privacy_level: String,
    pub timeout_secs: u64,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            api_base: "https://open.tiktokapis.com".into(),
            access_token: None,
            privacy_level: "SELF_ONLY".into(),
            timeout_secs: 120,
        }
    }
}

/// Instagram Graph API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramConfig {
    pub graph_base: String,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            graph_base: "https://graph.facebook.com/v21.0".into(),
            user_id: None,
            access_token: None,
            timeout_secs: 120,
        }
    }
}

/// Distribution targets plus caption settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Hashtags appended after the fixed caption set (without `#`).
    pub extra_hashtags: Vec<String>,
    pub tiktok: TikTokConfig,
    pub instagram: InstagramConfig,
}

// ---------------------------------------------------------------------------
// ArchiveConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Transient files are removed only when the artifact is larger than
    /// this many bytes.
    pub min_artifact_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            min_artifact_bytes: 1_048_576,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use wotd_reel::config::AppConfig;
///
/// // Load (returns Default when file is missing), then overlay credentials.
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env(|key| std::env::var(key).ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub generator: GeneratorConfig,
    pub speech: SpeechConfig,
    pub render: RenderConfig,
    pub merge: MergeConfig,
    pub alert: AlertConfig,
    pub approval: ApprovalConfig,
    pub distribution: DistributionConfig,
    pub archive: ArchiveConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::default_settings_file())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay credentials from an environment lookup.
    ///
    /// Only keys that resolve to a real value replace the configured ones;
    /// empty strings and `your_…` placeholders are ignored.  Pass
    /// `|k| std::env::var(k).ok()` in production and a map lookup in tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|v| credential(Some(v)));

        overlay(&mut self.generator.api_key, get("WOTD_LLM_API_KEY"));
        overlay(&mut self.speech.api_key, get("ELEVENLABS_API_KEY"));
        overlay(
            &mut self.distribution.tiktok.access_token,
            get("TIKTOK_ACCESS_TOKEN"),
        );
        overlay(
            &mut self.distribution.instagram.user_id,
            get("INSTAGRAM_USER_ID"),
        );
        overlay(
            &mut self.distribution.instagram.access_token,
            get("INSTAGRAM_ACCESS_TOKEN"),
        );
        overlay(&mut self.alert.username, get("EMAIL_USER"));
        overlay(&mut self.alert.password, get("EMAIL_PASS"));
        overlay(&mut self.alert.recipient, get("RECIPIENT_EMAIL"));
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Normalise an optional credential: blank values and `your_…` template
/// placeholders count as absent.
pub fn credential(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.starts_with("your_"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
