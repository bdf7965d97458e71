use std::collections::{HashMap, HashSet};

use super::grammar::OutlineGrammar;
use super::types::Line;

const MAX_EDGE_LINE_CHARS: usize = 160;

/// Strips running headers, footers, page numbers and publication boilerplate
/// from per-page line lists and flattens the result in page order.
pub fn normalize<S: AsRef<str>>(grammar: &OutlineGrammar, pages: &[Vec<S>]) -> Vec<Line> {
    let mut working = pages
        .iter()
        .enumerate()
        .map(|(page, lines)| {
            lines
                .iter()
                .enumerate()
                .filter_map(|(position, raw)| {
                    let text = collapse_whitespace(raw.as_ref());
                    if text.is_empty() || line_is_noise(grammar, &text) {
                        return None;
                    }
                    Some(Line {
                        text,
                        page,
                        position,
                    })
                })
                .collect::<Vec<Line>>()
        })
        .collect::<Vec<Vec<Line>>>();

    // Removing one header can expose another repeated line underneath it.
    loop {
        let candidates = detect_repeated_edge_lines(&working);
        if candidates.is_empty() {
            break;
        }

        for page in &mut working {
            page.retain(|line| !candidates.contains(&line.text));
        }
    }

    working.into_iter().flatten().collect()
}

/// Joins normalized lines into the newline-separated text the locator scans.
pub fn join_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<&str>>()
        .join("\n")
}

fn line_is_noise(grammar: &OutlineGrammar, line: &str) -> bool {
    grammar.page_number.is_match(line)
        || grammar
            .boilerplate
            .iter()
            .any(|pattern| pattern.is_match(line))
}

fn detect_repeated_edge_lines(pages: &[Vec<Line>]) -> HashSet<String> {
    let mut pages_by_value = HashMap::<&str, HashSet<usize>>::new();

    for (index, page) in pages.iter().enumerate() {
        let edges = [page.first(), page.last()];
        for line in edges.into_iter().flatten() {
            if line.text.chars().count() > MAX_EDGE_LINE_CHARS {
                continue;
            }
            pages_by_value
                .entry(line.text.as_str())
                .or_default()
                .insert(index);
        }
    }

    pages_by_value
        .into_iter()
        .filter_map(|(value, seen_on)| {
            if seen_on.len() > 1 {
                Some(value.to_string())
            } else {
                None
            }
        })
        .collect()
}

pub(super) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}
