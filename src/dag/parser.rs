// src/dag/parser.rs

//! Extraction of structured metadata from task descriptions.
//!
//! Plan files carry dependencies inline, e.g.:
//!
//! ```text
//! 3.2 Wire the retry path into the executor (depends: 3.1, 2.4)
//! ```
//!
//! and optional advisory phase annotations (`[SEQUENTIAL]`, `[PARALLEL]`).

use std::sync::LazyLock;

use regex::Regex;

use crate::dag::task::PhaseAnnotation;

static DEPENDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(depends:\s*([^)]+)\)").expect("dependency marker regex is valid")
});

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(SEQUENTIAL|PARALLEL)\]").expect("phase annotation regex is valid")
});

/// Parse all dependency ids out of `(depends: id, id, ...)` markers.
///
/// Multiple markers are merged; duplicates are dropped while preserving
/// first-occurrence order. Ids are returned verbatim (still strings); the
/// graph builder validates them against the task list.
pub fn parse_dependencies(description: &str) -> Vec<String> {
    let mut deps = Vec::new();

    for capture in DEPENDS_RE.captures_iter(description) {
        for id in capture[1].split(',') {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            if !deps.iter().any(|d| d == id) {
                deps.push(id.to_string());
            }
        }
    }

    deps
}

/// Parse an advisory `[SEQUENTIAL]` / `[PARALLEL]` annotation, if present.
///
/// The first annotation wins if a description carries several.
pub fn parse_phase_annotation(text: &str) -> Option<PhaseAnnotation> {
    let capture = ANNOTATION_RE.captures(text)?;
    match &capture[1] {
        "SEQUENTIAL" => Some(PhaseAnnotation::Sequential),
        "PARALLEL" => Some(PhaseAnnotation::Parallel),
        _ => None,
    }
}
