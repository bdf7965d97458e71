use anyhow::{Context, Result};
use regex::Regex;

use super::types::{DocumentFamily, MarkerLevel};

/// What the locator reports when the family heading is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingHeading {
    NotApplicable,
    Failure,
}

/// Which later headings of the same family close the located block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHeading {
    /// Any heading carrying a different key.
    AnyOther,
    /// Only the heading whose numeric key follows the located one.
    Successor,
}

/// Heading and stop grammar for one document family.
#[derive(Debug)]
pub struct FamilyConfig {
    pub family: DocumentFamily,
    pub(super) anchor: &'static str,
    pub(super) preamble: Option<Regex>,
    pub(super) heading: Regex,
    pub(super) heading_window: Option<usize>,
    pub(super) missing_heading: MissingHeading,
    pub(super) label: Option<Regex>,
    pub(super) label_required: bool,
    pub(super) next_heading: NextHeading,
    pub(super) stops: Vec<Regex>,
    pub(super) strip: Vec<Regex>,
}

#[derive(Debug)]
pub(super) struct RulesGrammar {
    pub(super) anchor: Regex,
    pub(super) supplementary_split: Regex,
    pub(super) annotation_split: Regex,
    pub(super) heading_line: Regex,
}

/// Compiled matchers shared by every stage of the outline pipeline. Built once
/// per process and passed by reference.
#[derive(Debug)]
pub struct OutlineGrammar {
    pub(super) marker: Regex,
    pub(super) inline_arabic: Regex,
    pub(super) families_by_level: Vec<(MarkerLevel, Regex)>,
    pub(super) note_boundary: Regex,
    pub(super) note_shape: Regex,
    pub(super) notes_label: Regex,
    pub(super) page_number: Regex,
    pub(super) boilerplate: Vec<Regex>,
    pub(super) general_note_title: Regex,
    pub(super) rules: RulesGrammar,
    general_note: FamilyConfig,
    section_notes: FamilyConfig,
    chapter_notes: FamilyConfig,
    additional_notes: FamilyConfig,
}

impl OutlineGrammar {
    pub fn new() -> Result<Self> {
        let general_note = FamilyConfig {
            family: DocumentFamily::GeneralNote,
            anchor: "general note ordinal",
            preamble: Some(compile(r"(?m)^[ \t]*GENERAL\s+NOTES\b", "general notes preamble")?),
            heading: compile(
                r"(?im)^[ \t]*(?:General\s+Notes?[ \t]+)?(?P<key>\d{1,2})[.)](?:[ \t]+|$)",
                "general note heading",
            )?,
            heading_window: None,
            missing_heading: MissingHeading::Failure,
            label: None,
            label_required: false,
            next_heading: NextHeading::Successor,
            stops: Vec::new(),
            strip: Vec::new(),
        };

        let section_notes = FamilyConfig {
            family: DocumentFamily::SectionNotes,
            anchor: "SECTION heading",
            preamble: None,
            heading: compile(
                r"(?m)^[ \t]*SECTION\s+(?P<key>[IVXL]+)\b",
                "section heading",
            )?,
            heading_window: Some(200),
            missing_heading: MissingHeading::NotApplicable,
            label: Some(compile(r"(?m)^[ \t]*Notes?[ \t]*$", "notes label")?),
            label_required: false,
            next_heading: NextHeading::AnyOther,
            stops: {
                let mut stops = common_stops()?;
                stops.push(compile(r"(?m)^[ \t]*CHAPTER\s+\d{1,2}\b", "chapter stop")?);
                stops
            },
            strip: Vec::new(),
        };

        let chapter_heading = r"(?m)^[ \t]*CHAPTER\s+(?P<key>\d{1,2})\b";

        let chapter_notes = FamilyConfig {
            family: DocumentFamily::ChapterNotes,
            anchor: "CHAPTER heading",
            preamble: None,
            heading: compile(chapter_heading, "chapter heading")?,
            heading_window: None,
            missing_heading: MissingHeading::Failure,
            label: Some(compile(r"(?m)^[ \t]*Notes?[ \t]*$", "notes label")?),
            label_required: false,
            next_heading: NextHeading::AnyOther,
            stops: {
                let mut stops = common_stops()?;
                stops.push(compile(
                    r"(?m)^[ \t]*Additional\s+U\.\s?S\.\s+Notes?\b",
                    "additional notes stop",
                )?);
                stops.push(compile(r"(?m)^[ \t]*SECTION\s+[IVXL]+\b", "section stop")?);
                stops
            },
            strip: Vec::new(),
        };

        let additional_notes = FamilyConfig {
            family: DocumentFamily::AdditionalNotes,
            anchor: "CHAPTER heading",
            preamble: None,
            heading: compile(chapter_heading, "chapter heading")?,
            heading_window: None,
            missing_heading: MissingHeading::Failure,
            label: Some(compile(
                r"(?m)^[ \t]*Additional U\.S\. Notes?\b",
                "additional notes label",
            )?),
            label_required: true,
            next_heading: NextHeading::AnyOther,
            stops: {
                let mut stops = common_stops()?;
                stops.push(compile(r"(?m)^[ \t]*SECTION\s+[IVXL]+\b", "section stop")?);
                stops
            },
            strip: vec![compile(
                r"(?im)^[ \t]*Additional\s+U\.\s?S\.\s+Notes?\s*\(con\.?\)[ \t]*$",
                "additional notes continuation",
            )?],
        };

        Ok(Self {
            marker: compile(
                r"^\((?P<token>[A-Za-z]{1,6}|\d{1,3})\)(?:\s|$)",
                "outline marker",
            )?,
            inline_arabic: compile(r"\((\d{1,3})\)", "inline arabic marker")?,
            families_by_level: vec![
                (MarkerLevel::LowerLetter, compile(r"^[a-z]$", "lower letter")?),
                (MarkerLevel::LowerRoman, compile(r"^[ivxlcdm]+$", "lower roman")?),
                (MarkerLevel::UpperLetter, compile(r"^[A-Z]$", "upper letter")?),
                (MarkerLevel::Arabic, compile(r"^\d{1,3}$", "arabic")?),
                (MarkerLevel::UpperRoman, compile(r"^[IVXLCDM]+$", "upper roman")?),
            ],
            note_boundary: compile(
                r"(?m)^[ \t]*(?P<number>\d{1,3})\.(?:[^\d\-–]|$)",
                "note boundary",
            )?,
            note_shape: compile(r"(?s)^(?P<number>\d{1,3})\.\s*(?P<body>\S.*)$", "note shape")?,
            notes_label: compile(
                r"^(?:Notes?|Additional\s+U\.\s?S\.\s+Notes?\b.*)$",
                "notes label line",
            )?,
            page_number: compile(r"^\d+$", "page number")?,
            boilerplate: vec![
                compile(
                    r"(?i)^Harmonized\s+Tariff\s+Schedule\s+of\s+the\s+United\s+States\s*\(\d{4}",
                    "publication title",
                )?,
                compile(
                    r"(?i)^Annotated\s+for\s+Statistical\s+Reporting\s+Purposes\s*$",
                    "statistical banner",
                )?,
                compile(r"(?i)^Revision\s+\d+\s*$", "revision stamp")?,
                compile(r"(?i)^GN\s*p\.?\s*\d+\s*$", "general notes pagination")?,
                compile(r"^(?:[IVXL]+\s+)?\d{1,2}-\d{1,3}$", "chapter pagination")?,
            ],
            general_note_title: compile(r"(?s)^(?P<title>[^.(]{1,200}?)\.(?:\s+|$)", "general note title")?,
            rules: RulesGrammar {
                anchor: compile(r"RULES\s+OF\s+INTERPRETATION", "rules anchor")?,
                supplementary_split: compile(
                    r"ADDITIONAL\s+U\.S\.\s+RULES\s+OF\s+INTERPRETATION",
                    "supplementary rules split",
                )?,
                annotation_split: compile(
                    r"\[\s*COMPILER'S\s+NOTE:|Presidential\s+Proclamation|Contact\s+officials",
                    "compiler note split",
                )?,
                heading_line: compile(
                    r"(?m)^[ \t]*[A-Z][A-Z .'\t]*INTERPRETATION[ \t]*$",
                    "rules heading line",
                )?,
            },
            general_note,
            section_notes,
            chapter_notes,
            additional_notes,
        })
    }

    /// Heading grammar for a note family. The rules document has no heading
    /// grammar of its own and yields `None`.
    pub fn family(&self, family: DocumentFamily) -> Option<&FamilyConfig> {
        match family {
            DocumentFamily::GeneralNote => Some(&self.general_note),
            DocumentFamily::SectionNotes => Some(&self.section_notes),
            DocumentFamily::ChapterNotes => Some(&self.chapter_notes),
            DocumentFamily::AdditionalNotes => Some(&self.additional_notes),
            DocumentFamily::GeneralRules => None,
        }
    }
}

fn common_stops() -> Result<Vec<Regex>> {
    Ok(vec![
        compile(r"(?m)^[ \t]*Subheading\s+Notes?\b", "subheading notes stop")?,
        compile(r"(?m)^[ \t]*Statistical\s+Notes?\b", "statistical notes stop")?,
        compile(r"(?m)^[ \t]*Heading/", "table header stop")?,
        compile(r"(?m)^[ \t]*Rates\s+of\s+Duty\b", "rates of duty stop")?,
        compile(r"(?m)^[ \t]*Article\s+Description\b", "article description stop")?,
    ])
}

fn compile(pattern: &str, what: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile {what} regex"))
}
