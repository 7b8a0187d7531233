//! Duplicate detection for candidate emails.
//!
//! Raw email text always differs by a volatile token even when the human
//! content is identical: the forwarder's candidates by the MIME boundary
//! line between header and content, constructed rotation messages by their
//! generated Message-ID and Date headers. Each comparison strips its tokens
//! from both sides before judging "same email"; a side without the token
//! degrades to a full-content compare.

/// Separator between header matter and the forwarded content proper.
const HEADER_BOUNDARY: &str = "________________________________";

fn after_boundary(content: &str) -> &str {
    content
        .split_once(HEADER_BOUNDARY)
        .map(|(_, rest)| rest)
        .unwrap_or(content)
}

/// Forwarder policy: compare everything after the first boundary line.
pub fn is_duplicate_content(candidate: &str, previous: &str) -> bool {
    after_boundary(candidate) == after_boundary(previous)
}

/// Headers regenerated on every message build; never part of "the email".
const VOLATILE_HEADERS: [&str; 2] = ["message-id:", "date:"];

/// Drop the Message-ID and Date header lines (and their folded continuation
/// lines), normalizing line endings on the way.
pub fn without_volatile_headers(content: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut in_volatile = false;
    for line in content.lines() {
        if in_volatile && (line.starts_with(' ') || line.starts_with('\t')) {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        in_volatile = VOLATILE_HEADERS.iter().any(|h| lower.starts_with(h));
        if !in_volatile {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Rotation policy: compare with the unique Message-ID (and build Date)
/// stripped.
pub fn is_duplicate_message(candidate: &str, previous: &str) -> bool {
    without_volatile_headers(candidate) == without_volatile_headers(previous)
}
