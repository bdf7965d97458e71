use regex::Captures;

use super::error::UnitError;
use super::grammar::{FamilyConfig, MissingHeading, NextHeading, OutlineGrammar};
use super::normalize::{collapse_whitespace, join_lines};
use super::segment::is_note_start;
use super::types::{DocumentFamily, Line};

/// The slice of normalized text that belongs to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBlock {
    pub family: DocumentFamily,
    pub key: String,
    pub title: String,
    pub body: String,
    /// Whether a notes label introduced the body.
    pub labelled: bool,
    pub start: usize,
    pub end: usize,
}

/// Finds the unit identified by `key` inside normalized lines.
///
/// `Ok(None)` means the document legitimately has no such unit; an error means
/// a required anchor was missing from text that should have carried it.
pub fn locate(
    grammar: &OutlineGrammar,
    lines: &[Line],
    family: DocumentFamily,
    key: Option<&str>,
) -> Result<Option<LocatedBlock>, UnitError> {
    let text = join_lines(lines);
    if text.trim().is_empty() {
        return Ok(None);
    }

    match grammar.family(family) {
        Some(config) => locate_in_text(grammar, config, &text, key),
        None => locate_rules(grammar, &text),
    }
}

pub(super) fn locate_in_text(
    grammar: &OutlineGrammar,
    config: &FamilyConfig,
    text: &str,
    key: Option<&str>,
) -> Result<Option<LocatedBlock>, UnitError> {
    let search_from = config
        .preamble
        .as_ref()
        .and_then(|preamble| preamble.find(text))
        .map(|found| found.end())
        .unwrap_or(0);
    let window_limit = config
        .heading_window
        .map(|chars| byte_offset_for_chars(text, chars));

    let heading = config
        .heading
        .captures_iter(text)
        .filter(|captures| whole_start(captures) >= search_from)
        .take_while(|captures| {
            window_limit
                .map(|limit| whole_start(captures) < limit)
                .unwrap_or(true)
        })
        .find(|captures| match key {
            Some(wanted) => captured_key(captures)
                .map(|found| keys_match(found, wanted))
                .unwrap_or(false),
            None => true,
        });

    let Some(heading) = heading else {
        return match config.missing_heading {
            MissingHeading::NotApplicable => Ok(None),
            MissingHeading::Failure => Err(UnitError::anchor_not_found(
                config.family,
                key,
                config.anchor,
            )),
        };
    };

    let start = whole_start(&heading);
    let heading_end = heading.get(0).map(|found| found.end()).unwrap_or(start);
    let found_key = captured_key(&heading)
        .map(ToOwned::to_owned)
        .or_else(|| key.map(ToOwned::to_owned))
        .unwrap_or_default();

    let unit_end = next_heading_boundary(config, text, heading_end, &found_key);
    let stop_end = stop_boundary(config, text, heading_end).min(unit_end);

    // A required label may sit after intervening blocks of the same unit, so
    // its own stop boundary is measured from the label rather than the heading.
    let label_limit = if config.label_required {
        unit_end
    } else {
        stop_end
    };
    let label = config
        .label
        .as_ref()
        .and_then(|label| label.find_at(text, heading_end))
        .filter(|found| found.start() < label_limit);

    let (body_start, end) = match label {
        Some(found) if config.label_required => (
            found.end(),
            stop_boundary(config, text, found.end()).min(unit_end),
        ),
        Some(found) => (found.end(), stop_end),
        None if config.label_required => return Ok(None),
        None => (heading_end, stop_end),
    };
    let end = end.max(body_start);

    let title = if config.family == DocumentFamily::GeneralNote {
        String::new()
    } else {
        let title_end = label.map(|found| found.start()).unwrap_or(stop_end);
        extract_title(grammar, config, &text[heading_end..title_end])
    };

    Ok(Some(LocatedBlock {
        family: config.family,
        key: found_key,
        title,
        body: text[body_start..end].trim().to_string(),
        labelled: label.is_some(),
        start,
        end,
    }))
}

fn locate_rules(grammar: &OutlineGrammar, text: &str) -> Result<Option<LocatedBlock>, UnitError> {
    let Some(anchor) = grammar.rules.anchor.find(text) else {
        return Err(UnitError::anchor_not_found(
            DocumentFamily::GeneralRules,
            None,
            "RULES OF INTERPRETATION",
        ));
    };

    let start = text[..anchor.start()]
        .rfind('\n')
        .map(|index| index + 1)
        .unwrap_or(0);

    Ok(Some(LocatedBlock {
        family: DocumentFamily::GeneralRules,
        key: String::new(),
        title: collapse_whitespace(&text[start..anchor.end()]),
        body: text[start..].trim().to_string(),
        labelled: false,
        start,
        end: text.len(),
    }))
}

/// Nearest following stop marker at or after `from`, never one before it.
fn stop_boundary(config: &FamilyConfig, text: &str, from: usize) -> usize {
    config
        .stops
        .iter()
        .filter_map(|stop| stop.find_at(text, from))
        .map(|found| found.start())
        .min()
        .unwrap_or(text.len())
}

/// Start of the next heading of the same family that closes this unit.
fn next_heading_boundary(config: &FamilyConfig, text: &str, from: usize, found_key: &str) -> usize {
    let successor = found_key.parse::<u32>().ok().map(|value| value + 1);

    config
        .heading
        .captures_iter(text)
        .filter(|captures| whole_start(captures) >= from)
        .find(|captures| {
            let Some(candidate) = captured_key(captures) else {
                return false;
            };
            match config.next_heading {
                NextHeading::AnyOther => !keys_match(candidate, found_key),
                NextHeading::Successor => {
                    successor.is_some() && candidate.parse::<u32>().ok() == successor
                }
            }
        })
        .map(|captures| whole_start(&captures))
        .unwrap_or(text.len())
}

/// Title lines follow the heading until a label, a note boundary or a stop.
fn extract_title(grammar: &OutlineGrammar, config: &FamilyConfig, region: &str) -> String {
    let mut parts = Vec::<&str>::new();

    for line in region.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if parts.is_empty() {
                continue;
            }
            break;
        }

        let is_label = config
            .label
            .as_ref()
            .map(|label| label.is_match(trimmed))
            .unwrap_or(false)
            || grammar.notes_label.is_match(trimmed);
        let is_stop = config.stops.iter().any(|stop| stop.is_match(trimmed));
        if is_label || is_stop || is_note_start(grammar, trimmed) {
            break;
        }

        parts.push(trimmed);
    }

    collapse_whitespace(&parts.join(" "))
}

fn whole_start(captures: &Captures<'_>) -> usize {
    captures.get(0).map(|found| found.start()).unwrap_or(0)
}

fn captured_key<'t>(captures: &Captures<'t>) -> Option<&'t str> {
    captures.name("key").map(|found| found.as_str())
}

/// Compares unit keys ignoring case and leading zeros ("09" is chapter 9).
pub(super) fn keys_match(found: &str, wanted: &str) -> bool {
    normalize_key(found) == normalize_key(wanted)
}

fn normalize_key(key: &str) -> String {
    let trimmed = key.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            return "0".to_string();
        }
        return stripped.to_string();
    }
    trimmed.to_ascii_uppercase()
}

fn byte_offset_for_chars(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}
