//! The persisted script header: emitter and parser, kept together.
//!
//! The comment header is the only durable metadata a recording has; listing
//! and loading recover everything by re-scanning these literal markers. The
//! emitter and parser share this module (and its tests) so the two sides of
//! the format cannot drift apart silently.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const PREAMBLE: &str = "import { test, expect } from '@playwright/test';";
pub const ID_MARKER: &str = "// Recording ID:";
pub const CREATED_MARKER: &str = "// Created:";
pub const DESCRIPTION_MARKER: &str = "// Description:";
pub const MANUAL_STEP_MARKER: &str = "// MANUAL STEP:";
const TEST_BLOCK_OPEN: &str = "test('";
const NAVIGATE_OPEN: &str = "navigate('";

/// Emit the preamble and comment header.
pub fn emit(
    out: &mut String,
    id: &str,
    created_at: DateTime<Utc>,
    description: Option<&str>,
) {
    out.push_str(PREAMBLE);
    out.push_str("\n\n");
    let _ = writeln!(out, "{} {}", ID_MARKER, id);
    let _ = writeln!(
        out,
        "{} {}",
        CREATED_MARKER,
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "{} {}", DESCRIPTION_MARKER, description);
    }
    out.push('\n');
}

/// Emit the opening of the named test block.
pub fn emit_test_open(out: &mut String, name: &str) {
    let _ = writeln!(
        out,
        "test('{}', async ({{ page }}) => {{",
        escape_single_quoted(name)
    );
}

/// Emit the closing of the test block.
pub fn emit_test_close(out: &mut String) {
    out.push_str("});\n");
}

/// Escape a value for embedding between single quotes.
pub fn escape_single_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

/// Metadata recovered by scanning a script's comment markers.
#[derive(Debug, Clone, Default)]
pub struct ScriptHeader {
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub target_site: Option<String>,
    pub manual_steps: usize,
}

/// Re-scan a script for the header markers, the test-block name, the first
/// navigate target, and manual-step comments. Tolerates hand-edited text:
/// anything missing simply stays `None`.
pub fn parse(text: &str) -> ScriptHeader {
    let mut header = ScriptHeader::default();

    for line in text.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(ID_MARKER) {
            header.id.get_or_insert_with(|| rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(CREATED_MARKER) {
            if header.created_at.is_none() {
                header.created_at = DateTime::parse_from_rfc3339(rest.trim())
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
        } else if let Some(rest) = line.strip_prefix(DESCRIPTION_MARKER) {
            header
                .description
                .get_or_insert_with(|| rest.trim().to_string());
        } else if line.starts_with(MANUAL_STEP_MARKER) {
            header.manual_steps += 1;
        } else if let Some(rest) = line.strip_prefix(TEST_BLOCK_OPEN) {
            if header.name.is_none() {
                header.name = quoted_prefix(rest);
            }
        } else if let Some(rest) = line.strip_prefix(NAVIGATE_OPEN) {
            if header.target_site.is_none() {
                header.target_site = quoted_prefix(rest);
            }
        }
    }

    header
}

/// Take the escaped single-quoted value opening `rest`, unescaped.
fn quoted_prefix(rest: &str) -> Option<String> {
    let mut value = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some(escaped) => value.push(escaped),
                None => return None,
            },
            '\'' => return Some(value),
            _ => value.push(c),
        }
    }
    None
}

/// Metadata-only view of a stored recording, recovered from its script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub target_site: Option<String>,
    pub manual_steps: usize,
}

/// Build a summary from script text. A script lacking the ID comment falls
/// back to its filename stem as the id.
pub fn summarize(filename_stem: &str, text: &str) -> RecordingSummary {
    let header = parse(text);
    let id = header.id.unwrap_or_else(|| filename_stem.to_string());
    let name = header.name.unwrap_or_else(|| id.clone());
    RecordingSummary {
        id,
        name,
        description: header.description,
        created_at: header.created_at,
        target_site: header.target_site,
        manual_steps: header.manual_steps,
    }
}
