use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One cleaned line of extracted text with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub page: usize,
    pub position: usize,
}

/// Numbering families ordered shallowest to deepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLevel {
    LowerLetter,
    LowerRoman,
    UpperLetter,
    Arabic,
    UpperRoman,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub label: String,
    pub level: MarkerLevel,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub number: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<OutlineNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralNote {
    pub note_number: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<OutlineNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNote {
    pub section: String,
    pub title: String,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterNote {
    pub chapter: String,
    pub title: String,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalNotes {
    pub chapter: String,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub general_rules: Vec<Note>,
    pub additional_rules: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_note: Option<String>,
}

/// Natural identity used to collapse repeated ingestion of the same unit.
pub trait NaturalKey {
    fn natural_key(&self) -> Option<&str>;
}

impl NaturalKey for GeneralNote {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.note_number)
    }
}

impl NaturalKey for SectionNote {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.section)
    }
}

impl NaturalKey for ChapterNote {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.chapter)
    }
}

impl NaturalKey for AdditionalNotes {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.chapter)
    }
}

impl NaturalKey for RuleSet {
    fn natural_key(&self) -> Option<&str> {
        None
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFamily {
    GeneralNote,
    SectionNotes,
    ChapterNotes,
    AdditionalNotes,
    GeneralRules,
}

impl DocumentFamily {
    pub const ALL: [DocumentFamily; 5] = [
        DocumentFamily::GeneralNote,
        DocumentFamily::SectionNotes,
        DocumentFamily::ChapterNotes,
        DocumentFamily::AdditionalNotes,
        DocumentFamily::GeneralRules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFamily::GeneralNote => "general_note",
            DocumentFamily::SectionNotes => "section_notes",
            DocumentFamily::ChapterNotes => "chapter_notes",
            DocumentFamily::AdditionalNotes => "additional_notes",
            DocumentFamily::GeneralRules => "general_rules",
        }
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed entity of any family, as produced by one assembler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ParsedUnit {
    GeneralNote(GeneralNote),
    SectionNotes(SectionNote),
    ChapterNotes(ChapterNote),
    AdditionalNotes(AdditionalNotes),
    GeneralRules(RuleSet),
}

impl ParsedUnit {
    pub fn family(&self) -> DocumentFamily {
        match self {
            ParsedUnit::GeneralNote(_) => DocumentFamily::GeneralNote,
            ParsedUnit::SectionNotes(_) => DocumentFamily::SectionNotes,
            ParsedUnit::ChapterNotes(_) => DocumentFamily::ChapterNotes,
            ParsedUnit::AdditionalNotes(_) => DocumentFamily::AdditionalNotes,
            ParsedUnit::GeneralRules(_) => DocumentFamily::GeneralRules,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            ParsedUnit::GeneralNote(note) => Some(&note.title),
            ParsedUnit::SectionNotes(section) => Some(&section.title),
            ParsedUnit::ChapterNotes(chapter) => Some(&chapter.title),
            ParsedUnit::AdditionalNotes(_) | ParsedUnit::GeneralRules(_) => None,
        }
    }
}

impl NaturalKey for ParsedUnit {
    fn natural_key(&self) -> Option<&str> {
        match self {
            ParsedUnit::GeneralNote(note) => note.natural_key(),
            ParsedUnit::SectionNotes(section) => section.natural_key(),
            ParsedUnit::ChapterNotes(chapter) => chapter.natural_key(),
            ParsedUnit::AdditionalNotes(notes) => notes.natural_key(),
            ParsedUnit::GeneralRules(rules) => rules.natural_key(),
        }
    }
}
