//! Eager (one-shot) grading entry points.
//!
//! The session API in [`crate::session`] exists for interactive hosts that
//! mutate slots between submissions. Library and CLI callers usually have
//! everything up front; [`grade`] runs the whole pipeline once — encode →
//! assemble → infer → clean — and returns the report plus run stats.

use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::pipeline::encode;
use crate::pipeline::llm::{GeminiClient, InferenceClient};
use crate::pipeline::render;
use crate::session::GradingSession;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Timing and size figures for one grading run.
#[derive(Debug, Clone, Serialize)]
pub struct GradeStats {
    /// Milliseconds spent reading and encoding the uploads.
    pub encode_duration_ms: u64,
    /// Milliseconds spent in the remote call.
    pub inference_duration_ms: u64,
    /// End-to-end milliseconds.
    pub total_duration_ms: u64,
    /// Number of parts in the assembled request.
    pub part_count: usize,
    /// Byte length of the cleaned report markdown.
    pub report_bytes: usize,
}

/// The result of a grading run.
#[derive(Debug, Clone, Serialize)]
pub struct GradeOutput {
    /// Cleaned report markdown — this is also the copy-to-clipboard text.
    pub markdown: String,
    /// The report as a styled HTML fragment.
    pub html: String,
    pub stats: GradeStats,
}

/// Grade a student's work against a transcript.
///
/// # Arguments
/// * `student_image`    — path to the photographed student work (required)
/// * `transcript_image` — optional path to a photographed answer key
/// * `transcript_text`  — typed answer key; may be empty when
///   `transcript_image` is given
/// * `config`           — model, credential, and timeout settings
///
/// # Errors
/// [`GradeError::Validation`] before any remote call when the input
/// invariant fails; [`GradeError::Encoding`] when a file cannot be read;
/// [`GradeError::Transport`] / [`GradeError::EmptyResponse`] from the call.
pub async fn grade(
    student_image: impl AsRef<Path>,
    transcript_image: Option<&Path>,
    transcript_text: &str,
    config: &GradingConfig,
) -> Result<GradeOutput, GradeError> {
    let client = Arc::new(GeminiClient::new(config.clone())?);
    grade_with_client(client, student_image, transcript_image, transcript_text, config).await
}

/// [`grade`] with a caller-supplied client — the seam tests use.
pub async fn grade_with_client(
    client: Arc<dyn InferenceClient>,
    student_image: impl AsRef<Path>,
    transcript_image: Option<&Path>,
    transcript_text: &str,
    config: &GradingConfig,
) -> Result<GradeOutput, GradeError> {
    let total_start = Instant::now();
    let mut session = GradingSession::new(client, config.clone());

    // ── Step 1: Encode uploads ───────────────────────────────────────────
    let encode_start = Instant::now();
    session.set_student_work(encode::encode_file(student_image.as_ref(), None).await?);
    if let Some(path) = transcript_image {
        session.set_transcript_file(encode::encode_file(path, None).await?);
    }
    session.set_transcript_text(transcript_text);
    let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

    // ── Step 2: Validate, assemble, send ─────────────────────────────────
    let submission = session.begin_submit()?;
    let part_count = submission.parts.len();

    let inference_start = Instant::now();
    let markdown = session.submit_prepared(submission).await?;
    let inference_duration_ms = inference_start.elapsed().as_millis() as u64;

    // ── Step 3: Render ───────────────────────────────────────────────────
    let html = render::render_report(&markdown);

    let stats = GradeStats {
        encode_duration_ms,
        inference_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        part_count,
        report_bytes: markdown.len(),
    };

    info!(
        "Graded in {}ms ({} parts, {} byte report)",
        stats.total_duration_ms, stats.part_count, stats.report_bytes
    );

    Ok(GradeOutput {
        markdown,
        html,
        stats,
    })
}

/// Grade and write the printable HTML document to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. The
/// report header shows today's date.
pub async fn grade_to_file(
    student_image: impl AsRef<Path>,
    transcript_image: Option<&Path>,
    transcript_text: &str,
    config: &GradingConfig,
    output_path: impl AsRef<Path>,
) -> Result<GradeStats, GradeError> {
    let output = grade(student_image, transcript_image, transcript_text, config).await?;
    let path = output_path.as_ref();

    let generated_on = chrono::Local::now().format("%Y-%m-%d").to_string();
    let document = render::render_document(&output.markdown, &generated_on);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GradeError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, &document)
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| GradeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::GenerateFuture;
    use crate::pipeline::request::RequestPart;

    struct FixedClient(&'static str);

    impl InferenceClient for FixedClient {
        fn generate<'a>(&'a self, _parts: &'a [RequestPart]) -> GenerateFuture<'a> {
            let text = self.0.to_string();
            Box::pin(async move { Ok(text) })
        }
    }

    fn config() -> GradingConfig {
        GradingConfig::builder().api_key("test").build().unwrap()
    }

    #[tokio::test]
    async fn grades_text_transcript_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work.jpg");
        std::fs::write(&work, b"jpeg-bytes").unwrap();

        let output = grade_with_client(
            Arc::new(FixedClient("# Score: 9/10\n\n| Item | Result |\n|---|---|\n| 1 | ✅ |")),
            &work,
            None,
            "1. environment\n2. pollution",
            &config(),
        )
        .await
        .unwrap();

        assert!(output.markdown.starts_with("# Score: 9/10"));
        assert!(output.html.contains("score-banner"));
        assert!(output.html.contains("cell-pass"));
        assert_eq!(output.stats.part_count, 4);
        assert_eq!(output.stats.report_bytes, output.markdown.len());
    }

    #[tokio::test]
    async fn missing_transcript_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work.jpg");
        std::fs::write(&work, b"jpeg-bytes").unwrap();

        struct PanickingClient;
        impl InferenceClient for PanickingClient {
            fn generate<'a>(&'a self, _parts: &'a [RequestPart]) -> GenerateFuture<'a> {
                panic!("the client must not be invoked on validation failure");
            }
        }

        let err = grade_with_client(Arc::new(PanickingClient), &work, None, "  ", &config())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GradeError::Validation {
                field: "transcript",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unreadable_student_image_is_encoding_error() {
        let err = grade_with_client(
            Arc::new(FixedClient("unused")),
            "/nonexistent/work.jpg",
            None,
            "answers",
            &config(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GradeError::Encoding { .. }));
    }
}
