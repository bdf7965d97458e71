use serde::Serialize;

use super::types::{DocumentFamily, NaturalKey, Note, OutlineNode, ParsedUnit};

const PATH_SEPARATOR: &str = " > ";

/// One searchable piece of note text with its position in the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub family: DocumentFamily,
    pub unit_key: Option<String>,
    pub owner_title: Option<String>,
    pub note_number: String,
    /// Label chain from the note down, e.g. `3 > (a) > (ii)`.
    pub path: String,
    pub text: String,
}

/// Depth-first records for every note and outline node of a unit.
pub fn flatten(unit: &ParsedUnit) -> Vec<IndexRecord> {
    let mut records = Vec::new();
    let family = unit.family();
    let unit_key = unit.natural_key().map(ToOwned::to_owned);
    let owner_title = unit
        .title()
        .filter(|title| !title.is_empty())
        .map(ToOwned::to_owned);

    let scope = RecordScope {
        family,
        unit_key,
        owner_title,
    };

    match unit {
        ParsedUnit::GeneralNote(note) => {
            scope.push_note_parts(
                &mut records,
                &note.note_number,
                &note.text,
                note.sub_items.as_deref(),
                None,
            );
        }
        ParsedUnit::SectionNotes(section) => scope.push_notes(&mut records, &section.notes, None),
        ParsedUnit::ChapterNotes(chapter) => scope.push_notes(&mut records, &chapter.notes, None),
        ParsedUnit::AdditionalNotes(notes) => scope.push_notes(&mut records, &notes.notes, None),
        ParsedUnit::GeneralRules(rules) => {
            scope.push_notes(&mut records, &rules.general_rules, None);
            scope.push_notes(&mut records, &rules.additional_rules, Some("U.S."));
        }
    }

    records
}

struct RecordScope {
    family: DocumentFamily,
    unit_key: Option<String>,
    owner_title: Option<String>,
}

impl RecordScope {
    fn push_notes(&self, records: &mut Vec<IndexRecord>, notes: &[Note], prefix: Option<&str>) {
        for note in notes {
            self.push_note_parts(
                records,
                &note.number,
                &note.text,
                note.sub_items.as_deref(),
                prefix,
            );
        }
    }

    fn push_note_parts(
        &self,
        records: &mut Vec<IndexRecord>,
        number: &str,
        text: &str,
        sub_items: Option<&[OutlineNode]>,
        prefix: Option<&str>,
    ) {
        let root = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{number}"),
            None => number.to_string(),
        };

        if !text.trim().is_empty() {
            records.push(self.record(number, root.clone(), text));
        }
        for node in sub_items.unwrap_or_default() {
            self.push_node(records, number, &root, node);
        }
    }

    fn push_node(
        &self,
        records: &mut Vec<IndexRecord>,
        number: &str,
        parent_path: &str,
        node: &OutlineNode,
    ) {
        let path = format!("{parent_path}{PATH_SEPARATOR}{}", node.label);
        records.push(self.record(number, path.clone(), &node.text));
        for child in &node.children {
            self.push_node(records, number, &path, child);
        }
    }

    fn record(&self, number: &str, path: String, text: &str) -> IndexRecord {
        IndexRecord {
            family: self.family,
            unit_key: self.unit_key.clone(),
            owner_title: self.owner_title.clone(),
            note_number: number.to_string(),
            path,
            text: text.to_string(),
        }
    }
}
