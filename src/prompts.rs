//! Captions and the grading instruction template.
//!
//! Centralising every prompt string here serves two purposes:
//!
//! 1. **Single source of truth** — the part ordering contract in
//!    [`crate::pipeline::request`] references these constants by name, so a
//!    caption change cannot silently diverge between assembler and tests.
//!
//! 2. **A shared glyph contract** — the instruction template tells the model
//!    to mark each answer with [`PASS_GLYPH`] or [`FAIL_GLYPH`], and the
//!    renderer styles table cells by matching those same constants. Template
//!    and renderer can only change together.
//!
//! Callers can override the template via
//! [`crate::config::GradingConfig::instruction`]; the constants here are
//! used when no override is provided.

/// Caption sent immediately after the student-work attachment.
pub const STUDENT_WORK_CAPTION: &str = "This is the image of the student's work.";

/// Caption sent immediately after the transcript attachment, when present.
pub const TRANSCRIPT_IMAGE_CAPTION: &str =
    "This is the image of the reference transcript (answer key).";

/// Prefix prepended to typed transcript text, when present.
pub const TRANSCRIPT_TEXT_PREFIX: &str = "TRANSCRIPT CONTENT (REFERENCE ANSWER):\n";

/// Result glyph the model must place in a correct-answer cell.
pub const PASS_GLYPH: &str = "✅";

/// Result glyph the model must place in a wrong-answer cell.
pub const FAIL_GLYPH: &str = "❌";

/// Default grading instruction, sent as the final text part of every request.
///
/// The output format it mandates is load-bearing: the first-level heading
/// carries the score banner, the blockquote carries the parent-facing
/// message, and the per-item table uses the pass/fail glyphs the renderer
/// keys its cell styling on.
pub const INSTRUCTION_TEMPLATE: &str = r#"
You are a professional AI assistant that grades English listening gap-fill exercises.
Analyse the student's work and compare it against the reference transcript.

TASK: Produce TWO separate report sections the teacher will use for two different audiences.

---
### SECTION 1: MESSAGE FOR PARENTS
Write in messaging-app style (short, concrete, warm and encouraging).
**Required format:**
Listening gap-fill result: [correct]/[total] ([percent]%)

Strengths: [One sentence on what went well. Example: Your child hears keywords very reliably...]

To improve: [Name the specific mistakes (if few) or the dominant error pattern. Example: One slip in item 10 — the verb "copy" was heard as "write".]

[One closing sentence of advice or encouragement.]

---
### SECTION 2: PROFESSIONAL REPORT (for the teacher)
1. **CEFR estimate:** Estimate the level (A1/A2/B1...) from the student's work and the transcript's vocabulary difficulty.
2. **Detailed error table:** Compare every item.

---
⚠️ GRADING RULES:
1. **Final answer only**: If words are crossed out, grade only the clearest final word.
2. **Ignore**: Existing teacher tick marks and eraser smudges.
3. **Handwriting**: Interpret the handwriting as charitably as possible.

---
OUTPUT FORMAT (Markdown, mandatory):

# 📨 MESSAGE FOR PARENTS (draft)

> Listening gap-fill result: [score]/[total] ([%])
>
> **Strengths:** ...
>
> **To improve:** ...
>
> ... (closing advice) ...

---

# 👩‍🏫 TEACHER REPORT

### 1. Level Assessment
*   **CEFR estimate:** [Level]
*   **Verdict:** [Pass / Needs work]

### 2. Item Detail
| Item | Student answer | Reference answer | Result | Error/Note |
|:---:|:---|:---|:---:|:---|
| 1 | ... | ... | ✅ | - |
| 2 | ... | ... | ❌ | Spelling error... |

---
*Report generated automatically by an AI grading system.*
"#;
