//! Request assembly: encoded uploads + transcript text → ordered parts.
//!
//! ## Part Layout
//!
//! The model is sensitive to both part order and caption wording, so the
//! sequence is a hard contract, not a convention:
//!
//! 1. Attachment — the student's work image
//! 2. Text — [`STUDENT_WORK_CAPTION`]
//! 3. *(if a transcript image was uploaded)* Attachment — the transcript,
//!    then Text — [`TRANSCRIPT_IMAGE_CAPTION`]
//! 4. *(if transcript text is non-empty after trimming)* Text —
//!    [`TRANSCRIPT_TEXT_PREFIX`] followed by the typed transcript
//! 5. Text — the grading instruction template
//!
//! Parts are transient: a fresh sequence is built for every submission and
//! consumed by the client.

use crate::pipeline::encode::EncodedFile;
use crate::prompts::{
    INSTRUCTION_TEMPLATE, STUDENT_WORK_CAPTION, TRANSCRIPT_IMAGE_CAPTION, TRANSCRIPT_TEXT_PREFIX,
};
use serde::Serialize;

/// One unit of a multimodal request. Order-significant.
///
/// A closed union rather than a loose JSON list so the assembler's output
/// is statically checkable and tests can match on exact sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    /// A binary payload plus MIME type, serialised as Gemini `inlineData`.
    Attachment {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// A plain text segment.
    Text { text: String },
}

/// The wire shape of an attachment's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl RequestPart {
    /// Build an attachment part from an encoded upload.
    pub fn attachment(file: &EncodedFile) -> Self {
        RequestPart::Attachment {
            inline_data: InlineData {
                mime_type: file.mime_type.clone(),
                data: file.data.clone(),
            },
        }
    }

    /// Build a text part.
    pub fn text(s: impl Into<String>) -> Self {
        RequestPart::Text { text: s.into() }
    }
}

/// Assemble the ordered part sequence for one submission.
///
/// `student` is required; callers must have validated the §"at least one
/// transcript form" invariant before getting here — this function encodes
/// layout, not policy, and will happily emit a transcript-free sequence.
///
/// `instruction` overrides the built-in template when `Some`.
pub fn assemble_parts(
    student: &EncodedFile,
    transcript_file: Option<&EncodedFile>,
    transcript_text: &str,
    instruction: Option<&str>,
) -> Vec<RequestPart> {
    let mut parts = Vec::with_capacity(6);

    parts.push(RequestPart::attachment(student));
    parts.push(RequestPart::text(STUDENT_WORK_CAPTION));

    if let Some(transcript) = transcript_file {
        parts.push(RequestPart::attachment(transcript));
        parts.push(RequestPart::text(TRANSCRIPT_IMAGE_CAPTION));
    }

    let trimmed = transcript_text.trim();
    if !trimmed.is_empty() {
        parts.push(RequestPart::text(format!(
            "{TRANSCRIPT_TEXT_PREFIX}{transcript_text}"
        )));
    }

    parts.push(RequestPart::text(
        instruction.unwrap_or(INSTRUCTION_TEMPLATE),
    ));

    parts
}
