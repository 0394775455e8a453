//! Pipeline stages for exercise grading.
//!
//! Each submodule implements exactly one transformation step, keeping every
//! stage independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ request ──▶ llm ──▶ postprocess ──▶ render
//! (base64)   (parts)    (API)    (cleanup)       (HTML)
//! ```
//!
//! 1. [`encode`]  — read an uploaded file into a base64 payload plus a
//!    preview handle backed by the original bytes
//! 2. [`request`] — assemble the ordered attachment/text part sequence for
//!    one submission
//! 3. [`llm`]     — send the parts to the inference endpoint; the only stage
//!    with network I/O
//! 4. [`postprocess`] — deterministic text cleanup of the model's markdown
//!    (stray fences, CRLF, broken tables)
//! 5. [`render`]  — map the markdown report to styled, printable HTML

pub mod encode;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod request;
