//! Report rendering: markdown → styled HTML.
//!
//! Markdown parsing is delegated entirely to pulldown-cmark; this module
//! only maps constructs to presentation classes by rewriting the event
//! stream before handing it to the stock HTML emitter:
//!
//! * `#` heading   → centred score banner (`score-banner`)
//! * `##` heading  → uppercase section divider (`section-divider`)
//! * table         → wrapped grid with a distinct header row
//! * table cell    → `cell-pass` / `cell-fail` by literal glyph match on the
//!   cell's text content — the glyph set is a contract shared with
//!   [`crate::prompts::INSTRUCTION_TEMPLATE`], not semantic parsing
//! * blockquote    → highlighted callout (the parent-facing message block)
//!
//! [`render_document`] additionally wraps the fragment into a printable
//! page: embedded stylesheet, report header with the generation date, and
//! `@media print` rules that hide anything marked `no-print`.

use crate::prompts::{FAIL_GLYPH, PASS_GLYPH};
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Render the report markdown to an HTML fragment with presentation classes.
pub fn render_report(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options).collect();
    let rewritten = rewrite_events(events);

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, rewritten.into_iter());
    out
}

/// Decide the styling class for a table cell from its plain-text content.
///
/// Literal substring match; a cell containing both glyphs counts as a pass,
/// matching the original presentation behaviour.
fn cell_class(text: &str) -> &'static str {
    if text.contains(PASS_GLYPH) {
        "cell cell-pass"
    } else if text.contains(FAIL_GLYPH) {
        "cell cell-fail"
    } else {
        "cell"
    }
}

fn raw<'a>(s: impl Into<CowStr<'a>>) -> Event<'a> {
    Event::Html(s.into())
}

/// Replace the structural tags we style with raw HTML carrying our classes.
/// Everything else passes through to the stock emitter untouched, so inline
/// escaping and nesting stay pulldown-cmark's problem.
fn rewrite_events(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len() + 16);
    let mut in_head = false;
    let mut iter = events.into_iter();

    while let Some(ev) = iter.next() {
        match ev {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => out.push(raw("<h1 class=\"score-banner\">")),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => out.push(raw("</h1>\n")),

            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) => out.push(raw("<h2 class=\"section-divider\">")),
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => out.push(raw("</h2>\n")),

            Event::Start(Tag::BlockQuote(_)) => {
                out.push(raw("<blockquote class=\"callout\">\n"))
            }
            Event::End(TagEnd::BlockQuote(_)) => out.push(raw("</blockquote>\n")),

            Event::Start(Tag::Table(_)) => {
                out.push(raw("<div class=\"report-table\"><table>"))
            }
            Event::End(TagEnd::Table) => out.push(raw("</tbody></table></div>\n")),

            Event::Start(Tag::TableHead) => {
                in_head = true;
                out.push(raw("<thead class=\"report-head\"><tr>"));
            }
            Event::End(TagEnd::TableHead) => {
                in_head = false;
                out.push(raw("</tr></thead><tbody>"));
            }

            Event::Start(Tag::TableRow) => out.push(raw("<tr>")),
            Event::End(TagEnd::TableRow) => out.push(raw("</tr>")),

            // Cells need lookahead: the class depends on the cell's text,
            // so buffer inner events until the matching end tag.
            Event::Start(Tag::TableCell) => {
                let mut inner = Vec::new();
                let mut text = String::new();
                for cell_ev in iter.by_ref() {
                    if matches!(cell_ev, Event::End(TagEnd::TableCell)) {
                        break;
                    }
                    match &cell_ev {
                        Event::Text(t) | Event::Code(t) => text.push_str(t),
                        _ => {}
                    }
                    inner.push(cell_ev);
                }
                let tag = if in_head { "th" } else { "td" };
                out.push(raw(format!("<{tag} class=\"{}\">", cell_class(&text))));
                out.extend(inner);
                out.push(raw(format!("</{tag}>")));
            }

            other => out.push(other),
        }
    }

    out
}

/// Stylesheet embedded into exported documents.
///
/// Scoped to the classes [`render_report`] emits. The `no-print` rule is
/// part of the export contract: anything interactive an embedding page adds
/// around the report should carry that class.
const REPORT_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; color: #1f2937;
       max-width: 52rem; margin: 0 auto; padding: 2rem 1.5rem; line-height: 1.6; }
.report-header { border-bottom: 1px solid #e5e7eb; padding-bottom: 0.75rem; margin-bottom: 1.5rem; }
.report-header h1 { font-size: 1.4rem; margin: 0; }
.report-header .generated-on { color: #6b7280; font-size: 0.85rem; }
h1.score-banner { text-align: center; color: #667eea; font-size: 1.8rem;
                  padding-bottom: 0.75rem; border-bottom: 1px dashed #e5e7eb; }
h2.section-divider { text-transform: uppercase; letter-spacing: 0.05em;
                     border-left: 4px solid #667eea; padding-left: 0.6rem; }
.report-table { overflow-x: auto; margin: 1.2rem 0; border: 1px solid #e5e7eb; border-radius: 6px; }
.report-table table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
.report-table th, .report-table td { padding: 0.6rem 0.9rem; border-bottom: 1px solid #f3f4f6;
                                     text-align: left; vertical-align: top; }
thead.report-head { background: #f1f5f9; color: #334155; text-transform: uppercase;
                    font-size: 0.75rem; letter-spacing: 0.04em; }
td.cell-pass { color: #059669; background: #ecfdf580; text-align: center; font-weight: 700; }
td.cell-fail { color: #dc2626; background: #fef2f280; text-align: center; font-weight: 700; }
blockquote.callout { border-left: 4px solid #34d399; background: #ecfdf5;
                     margin: 1rem 0; padding: 0.8rem 1rem; border-radius: 0 6px 6px 0; }
@media print {
  body { max-width: none; padding: 0; }
  .no-print { display: none !important; }
}
"#;

/// Wrap a rendered report into a complete printable HTML document.
///
/// `generated_on` is the human-readable date shown in the report header;
/// callers pass the current date when exporting.
pub fn render_document(markdown: &str, generated_on: &str) -> String {
    let fragment = render_report(markdown);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Listening Gap-Fill Report</title>\n<style>{REPORT_STYLE}</style>\n</head>\n<body>\n\
         <div class=\"report-header\">\n<h1>Listening Gap-Fill Report</h1>\n\
         <p class=\"generated-on\">Generated: {}</p>\n\
         <button class=\"no-print\" onclick=\"window.print()\">Print</button>\n</div>\n\
         {fragment}</body>\n</html>\n",
        escape_html(generated_on)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
