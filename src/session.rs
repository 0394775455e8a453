//! Grading session: upload slots, validation, and the submission state machine.
//!
//! The session owns everything a UI mutates between submissions: the two
//! upload slots, the typed transcript, and one [`AnalysisState`]. It does
//! not own the network call itself — submissions are split into
//! [`GradingSession::begin_submit`] (synchronous: validate, clear stale
//! output, build the part sequence, hand out an id) and
//! [`GradingSession::complete`] (apply the outcome). The async
//! [`GradingSession::submit`] convenience drives both around an injected
//! [`InferenceClient`].
//!
//! ## The stale-response rule
//!
//! Nothing cancels an in-flight request: a new submit simply supersedes the
//! old one. Every submission carries a monotonically increasing id, and
//! `complete` applies the transition only when the finishing id is still
//! the latest — a superseded completion is discarded silently instead of
//! overwriting newer state.

use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::pipeline::encode::EncodedFile;
use crate::pipeline::llm::InferenceClient;
use crate::pipeline::postprocess;
use crate::pipeline::request::{assemble_parts, RequestPart};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the session stands with respect to the current submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisState {
    /// Nothing submitted yet, or inputs changed since the last outcome.
    Idle,
    /// A submission has been issued and no (current) completion has arrived.
    InFlight,
    /// The latest submission produced a report (cleaned markdown).
    Succeeded(String),
    /// The latest submission failed; holds the user-facing message.
    Failed(String),
}

/// A validated, assembled submission waiting to be sent.
#[derive(Debug)]
pub struct Submission {
    /// Monotonic id; [`GradingSession::complete`] checks it for staleness.
    pub id: u64,
    /// The ordered part sequence for this submission.
    pub parts: Vec<RequestPart>,
}

/// Owns the upload slots and the single analysis state.
pub struct GradingSession {
    client: Arc<dyn InferenceClient>,
    config: GradingConfig,
    student_work: Option<EncodedFile>,
    transcript_file: Option<EncodedFile>,
    transcript_text: String,
    state: AnalysisState,
    latest_submission: u64,
}

impl GradingSession {
    /// Create a session around an injected inference client.
    pub fn new(client: Arc<dyn InferenceClient>, config: GradingConfig) -> Self {
        Self {
            client,
            config,
            student_work: None,
            transcript_file: None,
            transcript_text: String::new(),
            state: AnalysisState::Idle,
            latest_submission: 0,
        }
    }

    // ── Slots ─────────────────────────────────────────────────────────────

    /// Place (or replace) the student-work upload. The previous file, if
    /// any, is dropped wholesale — its preview handle is released here.
    pub fn set_student_work(&mut self, file: EncodedFile) {
        self.student_work = Some(file);
    }

    /// Clear the student-work slot. Legal in any state; idempotent.
    pub fn clear_student_work(&mut self) {
        self.student_work = None;
    }

    /// Place (or replace) the transcript upload.
    pub fn set_transcript_file(&mut self, file: EncodedFile) {
        self.transcript_file = Some(file);
    }

    /// Clear the transcript upload slot. Legal in any state; idempotent.
    pub fn clear_transcript_file(&mut self) {
        self.transcript_file = None;
    }

    /// Replace the typed transcript text.
    pub fn set_transcript_text(&mut self, text: impl Into<String>) {
        self.transcript_text = text.into();
    }

    pub fn student_work(&self) -> Option<&EncodedFile> {
        self.student_work.as_ref()
    }

    pub fn transcript_file(&self) -> Option<&EncodedFile> {
        self.transcript_file.as_ref()
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Check the submission invariant: student work present, and at least
    /// one transcript form (upload or non-empty text).
    pub fn validate(&self) -> Result<(), GradeError> {
        self.prepare_parts().map(|_| ())
    }

    /// Validate and assemble in one step, so a passing validation always
    /// comes with the borrowed slots it promised.
    fn prepare_parts(&self) -> Result<Vec<RequestPart>, GradeError> {
        let student = self
            .student_work
            .as_ref()
            .ok_or_else(|| GradeError::Validation {
                field: "student_work",
                message: "upload the student's work image before submitting".into(),
            })?;
        if self.transcript_file.is_none() && self.transcript_text.trim().is_empty() {
            return Err(GradeError::Validation {
                field: "transcript",
                message: "upload a transcript image or type the transcript text".into(),
            });
        }
        Ok(assemble_parts(
            student,
            self.transcript_file.as_ref(),
            &self.transcript_text,
            self.config.instruction.as_deref(),
        ))
    }

    /// Validate and assemble a new submission.
    ///
    /// On success the previous result or error is cleared *now* — not when
    /// the request completes — and the state moves to [`AnalysisState::InFlight`].
    /// On validation failure the state becomes [`AnalysisState::Failed`]
    /// with the field-specific message and no request is issued.
    pub fn begin_submit(&mut self) -> Result<Submission, GradeError> {
        let parts = match self.prepare_parts() {
            Ok(parts) => parts,
            Err(e) => {
                self.state = AnalysisState::Failed(e.to_string());
                return Err(e);
            }
        };

        self.latest_submission += 1;
        self.state = AnalysisState::InFlight;
        info!(
            "Submission {} issued ({} parts)",
            self.latest_submission,
            parts.len()
        );

        Ok(Submission {
            id: self.latest_submission,
            parts,
        })
    }

    /// Apply a submission outcome.
    ///
    /// Returns `true` when the transition was applied, `false` when the
    /// completing id was superseded by a newer submission and discarded.
    /// Successful text passes through [`postprocess::clean_report`] before
    /// being stored.
    pub fn complete(&mut self, id: u64, outcome: Result<String, GradeError>) -> bool {
        if id != self.latest_submission {
            debug!(
                "Discarding stale completion {} (latest is {})",
                id, self.latest_submission
            );
            return false;
        }
        self.state = match outcome {
            Ok(text) => AnalysisState::Succeeded(postprocess::clean_report(&text)),
            Err(e) => AnalysisState::Failed(e.to_string()),
        };
        true
    }

    /// Validate, send, and apply the outcome in one step.
    ///
    /// Returns the cleaned report on success. The applied state can still
    /// belong to a newer submission if one was issued concurrently through
    /// the split API; in that case this call's outcome is discarded and the
    /// error/result is returned to the caller anyway.
    pub async fn submit(&mut self) -> Result<String, GradeError> {
        let submission = self.begin_submit()?;
        self.submit_prepared(submission).await
    }

    /// Send an already-assembled submission and apply its outcome.
    ///
    /// Exposed for callers that need the part sequence (or its length)
    /// before sending; [`GradingSession::submit`] is this plus
    /// [`GradingSession::begin_submit`].
    pub async fn submit_prepared(&mut self, submission: Submission) -> Result<String, GradeError> {
        let client = Arc::clone(&self.client);
        match client.generate(&submission.parts).await {
            Ok(text) => {
                let report = postprocess::clean_report(&text);
                self.complete(submission.id, Ok(text));
                Ok(report)
            }
            Err(e) => {
                // Same staleness guard as complete(), without consuming the
                // error the caller still needs.
                if submission.id == self.latest_submission {
                    self.state = AnalysisState::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }
}
