//! # gapmark
//!
//! Grade handwritten listening gap-fill exercises with a multimodal LLM.
//!
//! ## Why this crate?
//!
//! Marking dictation/gap-fill sheets by hand is slow and the write-up for
//! parents is slower. gapmark photographs both sides of the job away: it
//! sends the student's handwritten sheet plus the reference transcript to a
//! vision model with a fixed grading rubric, then turns the model's
//! markdown report into a styled, printable document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads
//!  │
//!  ├─ 1. Encode   file bytes → base64 payload + preview handle
//!  ├─ 2. Assemble ordered attachment/text parts (order is a contract)
//!  ├─ 3. Infer    one generateContent call, thinking disabled
//!  ├─ 4. Clean    deterministic markdown fixes (fences, tables, CRLF)
//!  └─ 5. Render   styled HTML report / printable document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gapmark::{grade, GradingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from GEMINI_API_KEY.
//!     let config = GradingConfig::default();
//!     let output = grade(
//!         "student_work.jpg",
//!         None,
//!         "1. environment\n2. pollution\n3. sustainable",
//!         &config,
//!     )
//!     .await?;
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! Interactive hosts that let users swap uploads between submissions should
//! use [`GradingSession`] directly; it owns the upload slots, validates the
//! submission invariant, and discards stale completions when a newer
//! submission supersedes an in-flight one.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gapmark` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod grade;
pub mod pipeline;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GradingConfig, GradingConfigBuilder, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use error::GradeError;
pub use grade::{grade, grade_to_file, grade_with_client, GradeOutput, GradeStats};
pub use pipeline::encode::{encode_file, EncodedFile, PreviewHandle};
pub use pipeline::llm::{GeminiClient, InferenceClient};
pub use pipeline::render::{render_document, render_report};
pub use pipeline::request::{assemble_parts, RequestPart};
pub use session::{AnalysisState, GradingSession, Submission};
