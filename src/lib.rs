//! Word-of-the-day reel pipeline.
//!
//! Drives a chain of external producers (word source, text generator, speech
//! synthesizer, frame renderer, encoder, social publishers) into one short
//! vertical video, with a human approval gate before distribution.
//!
//! ```text
//! SourceAcquirer ─▶ ContentGenerator ─▶ { RenderWatcher, SpeechSynthesizer }
//!                                              │
//!                                              ▼
//!                     AvMerger ─▶ ApprovalGate ─▶ Distributor ─▶ Archiver
//! ```
//!
//! [`pipeline::PipelineOrchestrator`] sequences the stages; each subsystem
//! lives in its own module.

pub mod alert;
pub mod approval;
pub mod archive;
pub mod config;
pub mod content;
pub mod distribute;
pub mod merge;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod speech;
