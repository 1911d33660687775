//! Parser for the token-delimited email envelope format.
//!
//! Grammar (regular): an envelope is a sequence of tagged sections in any
//! order, each introduced by a marker `@#<Tag> -` where `<Tag>` is one of
//! `Subject`, `From`, `To`, `Body`, with optional whitespace around the tag
//! and the dash. A section's text runs from its marker to the start of the
//! next marker or the end of the input. A lone trailing `@#` terminator is
//! stripped from the section text; any other `@#` occurrence inside a
//! section (one not followed by a known tag and a dash) is kept verbatim, so
//! body text containing the delimiter substring is not truncated.
//!
//! Extraction never fails: a missing section yields an empty string and the
//! party resolver downstream decides whether that is fatal.

use std::sync::LazyLock;

use regex::Regex;

static TAG_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@#\s*(Subject|From|To|Body)\s*-").unwrap());

static ANGLE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^<>]+)>").unwrap());

/// The four sections of a raw envelope, trimmed, empty when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedEnvelope {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Splits a raw envelope into its tagged sections. First occurrence of a tag
/// wins if the same tag appears twice.
pub fn parse_envelope(raw: &str) -> ParsedEnvelope {
    let markers: Vec<(usize, usize, &str)> = TAG_MARKER
        .captures_iter(raw)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end(), caps.get(1).unwrap().as_str())
        })
        .collect();

    let mut envelope = ParsedEnvelope::default();
    for (idx, &(_, section_start, tag)) in markers.iter().enumerate() {
        let section_end = markers
            .get(idx + 1)
            .map(|&(next_start, _, _)| next_start)
            .unwrap_or(raw.len());
        let text = section_text(&raw[section_start..section_end]);

        let slot = match tag {
            "Subject" => &mut envelope.subject,
            "From" => &mut envelope.from,
            "To" => &mut envelope.to,
            "Body" => &mut envelope.body,
            _ => unreachable!("marker regex only captures known tags"),
        };
        if slot.is_empty() {
            *slot = text;
        }
    }

    envelope.from = extract_email_address(&envelope.from);
    envelope.to = extract_email_address(&envelope.to);
    envelope
}

/// Trims a section and strips a single trailing `@#` terminator.
fn section_text(region: &str) -> String {
    let trimmed = region.trim();
    trimmed.strip_suffix("@#").unwrap_or(trimmed).trim().to_string()
}

/// Reduces a display-name form like `"Jane Doe <jane@x.com>"` to the
/// bracketed address; text without angle brackets is returned trimmed.
pub fn extract_email_address(field: &str) -> String {
    match ANGLE_ADDRESS.captures(field) {
        Some(caps) => caps[1].trim().to_string(),
        None => field.trim().to_string(),
    }
}
