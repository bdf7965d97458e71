use tracing::debug;

use super::builder::build_outline;
use super::error::UnitError;
use super::grammar::OutlineGrammar;
use super::locate::{LocatedBlock, locate};
use super::normalize::{collapse_whitespace, normalize};
use super::segment::{NoteSpan, segment};
use super::types::{
    AdditionalNotes, ChapterNote, DocumentFamily, GeneralNote, Note, ParsedUnit, RuleSet,
    SectionNote,
};

/// Normalize, locate, then hand the block to a family-specific finisher.
fn parse_family_block<S, T, F>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    family: DocumentFamily,
    key: Option<&str>,
    finish: F,
) -> Result<Option<T>, UnitError>
where
    S: AsRef<str>,
    F: FnOnce(&OutlineGrammar, LocatedBlock) -> T,
{
    let lines = normalize(grammar, pages);
    let Some(block) = locate(grammar, &lines, family, key)? else {
        debug!(family = %family, key = key.unwrap_or("*"), "unit not present");
        return Ok(None);
    };

    debug!(
        family = %family,
        key = %block.key,
        start = block.start,
        end = block.end,
        first_page = lines.first().map(|line| line.page),
        "located unit"
    );
    Ok(Some(finish(grammar, block)))
}

/// Parses any family from one document's pages. `key` is ignored for the
/// rules document.
pub fn assemble<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    family: DocumentFamily,
    key: Option<&str>,
) -> Result<Option<ParsedUnit>, UnitError> {
    // Keyed families never fall back to the first heading; "*" matches none.
    let required = || key.unwrap_or("*");
    let unit = match family {
        DocumentFamily::GeneralNote => {
            assemble_general_note(grammar, pages, required())?.map(ParsedUnit::GeneralNote)
        }
        DocumentFamily::SectionNotes => {
            assemble_section_notes(grammar, pages, key)?.map(ParsedUnit::SectionNotes)
        }
        DocumentFamily::ChapterNotes => {
            assemble_chapter_notes(grammar, pages, required())?.map(ParsedUnit::ChapterNotes)
        }
        DocumentFamily::AdditionalNotes => assemble_additional_notes(grammar, pages, required())?
            .map(ParsedUnit::AdditionalNotes),
        DocumentFamily::GeneralRules => {
            assemble_rules(grammar, pages)?.map(ParsedUnit::GeneralRules)
        }
    };
    Ok(unit)
}

pub fn assemble_general_note<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    note_number: &str,
) -> Result<Option<GeneralNote>, UnitError> {
    parse_family_block(
        grammar,
        pages,
        DocumentFamily::GeneralNote,
        Some(note_number),
        |grammar, block| {
            let (title, remainder) = match grammar.general_note_title.captures(&block.body) {
                Some(captures) => {
                    let title = captures
                        .name("title")
                        .map(|found| collapse_whitespace(found.as_str()))
                        .unwrap_or_default();
                    let consumed = captures.get(0).map(|found| found.end()).unwrap_or(0);
                    (title, &block.body[consumed..])
                }
                None => (String::new(), block.body.as_str()),
            };

            let lines = remainder.lines().collect::<Vec<&str>>();
            let (text, sub_items) = build_outline(grammar, &lines);
            GeneralNote {
                note_number: block.key,
                title,
                text,
                sub_items,
            }
        },
    )
}

/// `numeral` selects a specific section; `None` takes the first section
/// heading near the top of the document.
pub fn assemble_section_notes<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    numeral: Option<&str>,
) -> Result<Option<SectionNote>, UnitError> {
    parse_family_block(
        grammar,
        pages,
        DocumentFamily::SectionNotes,
        numeral,
        |grammar, block| {
            let notes = notes_from_block(grammar, &block);
            SectionNote {
                section: block.key,
                title: block.title,
                notes,
            }
        },
    )
}

pub fn assemble_chapter_notes<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    chapter: &str,
) -> Result<Option<ChapterNote>, UnitError> {
    parse_family_block(
        grammar,
        pages,
        DocumentFamily::ChapterNotes,
        Some(chapter),
        |grammar, block| {
            let notes = notes_from_block(grammar, &block);
            ChapterNote {
                chapter: block.key,
                title: block.title,
                notes,
            }
        },
    )
}

pub fn assemble_additional_notes<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
    chapter: &str,
) -> Result<Option<AdditionalNotes>, UnitError> {
    parse_family_block(
        grammar,
        pages,
        DocumentFamily::AdditionalNotes,
        Some(chapter),
        |grammar, block| {
            let notes = notes_from_block(grammar, &block);
            AdditionalNotes {
                chapter: block.key,
                notes,
            }
        },
    )
}

pub fn assemble_rules<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    pages: &[Vec<S>],
) -> Result<Option<RuleSet>, UnitError> {
    parse_family_block(
        grammar,
        pages,
        DocumentFamily::GeneralRules,
        None,
        |grammar, block| {
            let rules = &grammar.rules;
            let (primary, supplementary) = match rules.supplementary_split.find(&block.body) {
                Some(split) => (&block.body[..split.start()], Some(&block.body[split.end()..])),
                None => (block.body.as_str(), None),
            };

            // The compiler's annotation trails whichever region comes last.
            let (primary, supplementary, compiler_note) = match supplementary {
                Some(region) => {
                    let (region, note) = split_annotation(grammar, region);
                    (primary, Some(region), note)
                }
                None => {
                    let (region, note) = split_annotation(grammar, primary);
                    (region, None, note)
                }
            };

            RuleSet {
                general_rules: rule_notes(grammar, primary),
                additional_rules: supplementary
                    .map(|region| rule_notes(grammar, region))
                    .unwrap_or_default(),
                compiler_note,
            }
        },
    )
}

/// Builds one note from a segmented span.
pub fn build_note(grammar: &OutlineGrammar, span: &NoteSpan) -> Note {
    let (text, sub_items) = build_outline(grammar, &span.lines);
    Note {
        number: span.number.clone(),
        text,
        sub_items,
    }
}

fn notes_from_block(grammar: &OutlineGrammar, block: &LocatedBlock) -> Vec<Note> {
    let body = strip_phrases(grammar, block);
    let notes = segment(grammar, &body)
        .iter()
        .map(|span| build_note(grammar, span))
        .collect::<Vec<Note>>();

    if !notes.is_empty() || !block.labelled || body.trim().is_empty() {
        return notes;
    }

    // A lone "Note" label introduces a single unnumbered note.
    let span = NoteSpan {
        number: "1".to_string(),
        lines: body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    };
    vec![build_note(grammar, &span)]
}

fn strip_phrases(grammar: &OutlineGrammar, block: &LocatedBlock) -> String {
    let Some(config) = grammar.family(block.family) else {
        return block.body.clone();
    };

    config
        .strip
        .iter()
        .fold(block.body.clone(), |body, phrase| {
            phrase.replace_all(&body, "").into_owned()
        })
}

fn split_annotation<'t>(grammar: &OutlineGrammar, region: &'t str) -> (&'t str, Option<String>) {
    match grammar.rules.annotation_split.find(region) {
        Some(found) => {
            let note = collapse_whitespace(&region[found.start()..]);
            let note = if note.is_empty() { None } else { Some(note) };
            (&region[..found.start()], note)
        }
        None => (region, None),
    }
}

fn rule_notes(grammar: &OutlineGrammar, region: &str) -> Vec<Note> {
    let region = grammar.rules.heading_line.replace_all(region, "");
    segment(grammar, &region)
        .iter()
        .map(|span| build_note(grammar, span))
        .collect()
}
