//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each pipeline
//! stage, `AppPaths` for the workspace layout, TOML persistence via
//! `AppConfig::load` / `AppConfig::save_to`, and the environment credential
//! overlay `AppConfig::apply_env`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    credential, AlertConfig, AppConfig, ApprovalConfig, ArchiveConfig, DistributionConfig,
    GeneratorConfig, InstagramConfig, MergeConfig, RenderConfig, SourceConfig, SpeechConfig,
    TikTokConfig,
};
