//! Classification and display shaping of captured tool output.
//!
//! Compiler output is never printed raw when a display mode is configured:
//! machine-readable mode extracts `<severity> <location> <message>` lines,
//! verbose mode passes the text through, and the default mode keeps only
//! lines carrying an error, warning or "required from here" marker.

use crate::core::config::PipelineConfiguration;

pub const TAG_ERROR: &str = "error:";
pub const TAG_WARNING: &str = "warning:";
pub const TAG_HINT: &str = "required from here";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl Severity {
    pub fn word(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        }
    }
}

/// Classify a single output line by its strongest marker.
///
/// Pure function; `None` means the line carries no recognized marker.
pub fn classify_line(line: &str) -> Option<Severity> {
    if line.contains(TAG_ERROR) {
        Some(Severity::Error)
    } else if line.contains(TAG_WARNING) {
        Some(Severity::Warning)
    } else if line.contains(TAG_HINT) {
        Some(Severity::Hint)
    } else {
        None
    }
}

/// Rewrite one line into the machine-readable `<severity> <location> <message>`
/// form. Only error and warning markers produce output; the location is the
/// prefix up to the last `file:line:column` component before the marker.
pub fn machine_readable_line(line: &str) -> Option<String> {
    let (severity, tag, tag_pos) = [
        (Severity::Error, TAG_ERROR),
        (Severity::Warning, TAG_WARNING),
    ]
    .iter()
    .find_map(|(severity, tag)| line.find(tag).map(|pos| (*severity, *tag, pos)))?;

    let bytes = line.as_bytes();

    let mut message_pos = tag_pos + tag.len();
    while message_pos < bytes.len() && bytes[message_pos].is_ascii_whitespace() {
        message_pos += 1;
    }

    // Scan back over the line/column digits to the end of the location.
    let mut location_end = tag_pos;
    for i in (0..tag_pos).rev() {
        match bytes[i] {
            b':' => {
                location_end = i;
                break;
            }
            c if c.is_ascii_digit() => {
                location_end = i + 1;
                break;
            }
            _ => {}
        }
    }

    Some(format!(
        "{} {} {}",
        severity.word(),
        &line[..location_end],
        &line[message_pos..]
    ))
}

/// Shape a captured output block for display according to the run
/// configuration. See the module docs for the three modes.
pub fn process_message(message: &str, config: &PipelineConfiguration) -> String {
    if config.machine_readable {
        message
            .lines()
            .filter_map(machine_readable_line)
            .collect::<Vec<_>>()
            .join("\n")
    } else if config.verbose {
        message.to_string()
    } else {
        message
            .lines()
            .filter(|line| classify_line(line).is_some())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
