//! Message templates.
//!
//! Each template renders a headline plus a list of detail lines into a
//! markdown-flavoured plain body and, where the notification has one, an
//! HTML rich body.
//!
//! | Template | Plain | Rich |
//! |----------|-------|------|
//! | [`print_started`] | yes | yes |
//! | [`print_update`] | yes | yes |
//! | [`print_done`] | yes | no |

// ============================================================================
// Imports
// ============================================================================

use maud::html;

use crate::protocol::{JobStatus, PrintPayload};

use super::format::{duration, length, size};

// ============================================================================
// Constants
// ============================================================================

/// Name shown when neither the event nor the job names the file.
const UNKNOWN_FILE: &str = "unknown file";

// ============================================================================
// Rendered
// ============================================================================

/// Output of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Plain (markdown) body.
    pub plain: String,
    /// HTML body.
    pub rich: Option<String>,
}

/// Headline and detail lines shared by both variants.
struct Body<'a> {
    action: &'a str,
    subject: &'a str,
    suffix: Option<String>,
    details: Vec<(&'static str, String)>,
}

impl Body<'_> {
    fn plain(&self) -> String {
        let mut out = format!("{} **{}**", self.action, self.subject);
        if let Some(suffix) = &self.suffix {
            out.push_str(suffix);
        }
        for (label, value) in &self.details {
            out.push_str(&format!("\n- {label}: {value}"));
        }
        out
    }

    fn rich(&self) -> String {
        html! {
            (self.action) " " b { (self.subject) }
            @if let Some(suffix) = &self.suffix {
                (suffix)
            }
            @if !self.details.is_empty() {
                ul {
                    @for (label, value) in &self.details {
                        li { (label) ": " code { (value) } }
                    }
                }
            }
        }
        .into_string()
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Renders the "print started" notification.
#[must_use]
pub fn print_started(event: &PrintPayload, job: &JobStatus) -> Rendered {
    let mut details = Vec::new();
    if let Some(secs) = job.estimated_print_time() {
        details.push(("Estimated print time", duration(secs)));
    }
    if let Some(millis) = job.filament_length() {
        details.push(("Filament", length(millis)));
    }
    if let Some(bytes) = event.size.or(job.job.file.size) {
        details.push(("File size", size(bytes)));
    }
    if let Some(user) = event.owner.as_deref().or(job.job.user.as_deref()) {
        details.push(("Started by", user.to_string()));
    }

    let body = Body {
        action: "Started printing",
        subject: event.name.as_deref().or(job.file_name()).unwrap_or(UNKNOWN_FILE),
        suffix: None,
        details,
    };

    Rendered {
        plain: body.plain(),
        rich: Some(body.rich()),
    }
}

/// Renders the periodic job status update.
#[must_use]
pub fn print_update(job: &JobStatus) -> Rendered {
    let mut details = Vec::new();
    if !job.state.is_empty() {
        details.push(("State", job.state.clone()));
    }
    if let Some(secs) = job.print_time() {
        details.push(("Elapsed", duration(secs)));
    }
    if let Some(secs) = job.estimated_time_left() {
        details.push(("Remaining", duration(secs)));
    }

    let body = Body {
        action: "Printing",
        subject: job.file_name().unwrap_or(UNKNOWN_FILE),
        suffix: job
            .progress
            .completion
            .map(|completion| format!(": {completion:.1}% complete")),
        details,
    };

    Rendered {
        plain: body.plain(),
        rich: Some(body.rich()),
    }
}

/// Renders the "print done" notification (plain only).
#[must_use]
pub fn print_done(event: &PrintPayload) -> Rendered {
    let body = Body {
        action: "Finished printing",
        subject: event.name.as_deref().unwrap_or(UNKNOWN_FILE),
        suffix: event
            .time
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| format!(" in {}", duration(secs as u64))),
        details: Vec::new(),
    };

    Rendered {
        plain: body.plain(),
        rich: None,
    }
}

// ============================================================================
// Tests
// ============================================================================
