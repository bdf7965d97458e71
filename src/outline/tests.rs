use super::assemble::{
    assemble, assemble_additional_notes, assemble_chapter_notes, assemble_general_note,
    assemble_rules, assemble_section_notes,
};
use super::builder::build_outline;
use super::dedup::{deduplicate, deduplicate_by};
use super::error::UnitError;
use super::flatten::flatten;
use super::grammar::OutlineGrammar;
use super::normalize::normalize;
use super::segment::{is_note_start, segment};
use super::types::*;

fn grammar() -> OutlineGrammar {
    OutlineGrammar::new().expect("outline grammar compiles")
}

fn pages(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|page| page.iter().map(|line| line.to_string()).collect())
        .collect()
}

fn labels(nodes: &[OutlineNode]) -> Vec<&str> {
    nodes.iter().map(|node| node.label.as_str()).collect()
}

fn assert_strictly_nested(nodes: &[OutlineNode]) {
    for node in nodes {
        for child in &node.children {
            assert!(
                child.level > node.level,
                "{} ({:?}) nested under {} ({:?})",
                child.label,
                child.level,
                node.label,
                node.level
            );
        }
        assert_strictly_nested(&node.children);
    }
}

fn chapter_nine_pages() -> Vec<Vec<String>> {
    pages(&[
        &[
            "Harmonized Tariff Schedule of the United States (2024)",
            "Annotated for Statistical Reporting Purposes",
            "CHAPTER 9",
            "COFFEE, TEA, MATE AND SPICES",
            "Notes",
            "1. Mixtures of the products of headings 0904 to 0910 are to be classified as follows:",
            "(a) Mixtures of two or more of the products of the same heading are to be classified in that heading;",
            "(b) Mixtures of two or more of the products of different headings are to be classified in heading 0910.",
            "II 9-1",
        ],
        &[
            "Harmonized Tariff Schedule of the United States (2024)",
            "Annotated for Statistical Reporting Purposes",
            "2. The addition of other substances to the products of headings 0904 to 0910 does not affect their classification.",
            "Additional U.S. Note",
            "1. The term \"pepper\" covers the dried fruit of plants of the genus Piper.",
            "Heading/",
            "Subheading",
            "II 9-2",
        ],
    ])
}

#[test]
fn build_outline_is_total_on_empty_input() {
    let grammar = grammar();
    let empty: [&str; 0] = [];
    assert_eq!(build_outline(&grammar, &empty), (String::new(), None));
    assert_eq!(build_outline(&grammar, &["", "   "]), (String::new(), None));
}

#[test]
fn build_outline_nests_roman_items_under_letters() {
    let grammar = grammar();
    let lines = [
        "The term includes:",
        "(a) Woven fabrics;",
        "(i) of cotton;",
        "(ii) of wool; and",
        "(b) Knitted fabrics.",
    ];

    let (text, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(text, "The term includes:");
    assert_eq!(labels(&sub_items), vec!["(a)", "(b)"]);
    assert_eq!(labels(&sub_items[0].children), vec!["(i)", "(ii)"]);
    assert_eq!(sub_items[0].children[0].level, MarkerLevel::LowerRoman);
    assert_eq!(sub_items[0].text, "(a) Woven fabrics;");
    assert!(sub_items[1].children.is_empty());
}

#[test]
fn build_outline_appends_unmarked_lines_to_open_node() {
    let grammar = grammar();
    let lines = [
        "Intro",
        "(a) first part",
        "continues here",
        "(b) second",
    ];

    let (text, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(text, "Intro");
    assert_eq!(sub_items[0].text, "(a) first part continues here");
    assert_eq!(sub_items[1].text, "(b) second");
}

#[test]
fn build_outline_reads_i_after_h_as_letter() {
    let grammar = grammar();
    let (_, sub_items) = build_outline(&grammar, &["(h) eighth", "(i) ninth"]);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(labels(&sub_items), vec!["(h)", "(i)"]);
    assert_eq!(sub_items[1].level, MarkerLevel::LowerLetter);
}

#[test]
fn build_outline_nests_roman_run_under_letter_read_i() {
    let grammar = grammar();
    let lines = ["(h) goods of:", "(i) cotton;", "(ii) wool;"];

    let (_, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(labels(&sub_items), vec!["(h)", "(i)"]);
    assert!(sub_items[0].children.is_empty());
    assert_eq!(labels(&sub_items[1].children), vec!["(ii)"]);
    assert_eq!(sub_items[1].children[0].level, MarkerLevel::LowerRoman);
}

#[test]
fn build_outline_continues_open_roman_sequence() {
    let grammar = grammar();
    let lines = [
        "(a) first", "(i) one", "(ii) two", "(iii) three", "(iv) four", "(v) five", "(b) second",
    ];

    let (_, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(labels(&sub_items), vec!["(a)", "(b)"]);
    assert_eq!(
        labels(&sub_items[0].children),
        vec!["(i)", "(ii)", "(iii)", "(iv)", "(v)"]
    );
}

#[test]
fn build_outline_derives_depth_from_marker_family() {
    let grammar = grammar();
    let lines = [
        "(a) lower",
        "(A) upper letter",
        "(1) arabic",
        "(I) upper roman",
        "(2) next arabic",
        "(b) next lower",
    ];

    let (_, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");
    assert_strictly_nested(&sub_items);

    assert_eq!(labels(&sub_items), vec!["(a)", "(b)"]);
    let upper = &sub_items[0].children[0];
    assert_eq!(upper.level, MarkerLevel::UpperLetter);
    assert_eq!(labels(&upper.children), vec!["(1)", "(2)"]);
    assert_eq!(upper.children[0].children[0].level, MarkerLevel::UpperRoman);
}

#[test]
fn build_outline_tolerates_families_out_of_order() {
    let grammar = grammar();
    let (_, sub_items) = build_outline(&grammar, &["(1) arabic first", "(a) then a letter"]);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(labels(&sub_items), vec!["(1)", "(a)"]);
    assert!(sub_items.iter().all(|node| node.children.is_empty()));
}

#[test]
fn build_outline_splits_inline_arabic_markers_into_siblings() {
    let grammar = grammar();
    let lines = [
        "(a) the following goods:",
        "(1) Live animals; (2) Meat; (3) Fish",
        "(b) Other",
    ];

    let (_, sub_items) = build_outline(&grammar, &lines);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(labels(&sub_items), vec!["(a)", "(b)"]);
    let inline = &sub_items[0].children;
    assert_eq!(labels(inline), vec!["(1)", "(2)", "(3)"]);
    assert_eq!(inline[1].text, "(2) Meat;");
    assert_eq!(inline[2].text, "(3) Fish");
    assert_strictly_nested(&sub_items);
}

#[test]
fn build_outline_keeps_text_before_inline_markers() {
    let grammar = grammar();
    let (text, sub_items) = build_outline(&grammar, &["Goods of (1) cotton or (2) wool"]);
    let sub_items = sub_items.expect("sub items");

    assert_eq!(text, "Goods of");
    assert_eq!(labels(&sub_items), vec!["(1)", "(2)"]);
}

#[test]
fn build_outline_upholds_nesting_on_mixed_input() {
    let grammar = grammar();
    let lines = [
        "(c) x", "(IV) y", "(ii) z", "(B) w", "(10) v", "(m) u", "(C) t", "(x) s", "(3) r",
        "plain", "(d) q",
    ];

    let (_, sub_items) = build_outline(&grammar, &lines);
    assert_strictly_nested(&sub_items.expect("sub items"));
}

#[test]
fn note_start_rejects_tariff_codes_and_ranges() {
    let grammar = grammar();
    assert!(!is_note_start(&grammar, "1701.91.44 Cotton yarn"));
    assert!(!is_note_start(&grammar, "12.-15. (reserved)"));
    assert!(is_note_start(&grammar, "7. The term \"mixtures\" means"));
    assert!(is_note_start(&grammar, "3."));
}

#[test]
fn segment_drops_malformed_spans() {
    let grammar = grammar();
    let spans = segment(&grammar, "Preamble text\n1. First note\n2.\n3. Third note\ncontinued");

    let numbers = spans
        .iter()
        .map(|span| span.number.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(numbers, vec!["1", "3"]);
    assert_eq!(spans[1].lines, vec!["Third note", "continued"]);
}

#[test]
fn segment_keeps_tariff_codes_inside_the_open_note() {
    let grammar = grammar();
    let spans = segment(&grammar, "1. The following:\n1701.91.44 Cotton yarn\n2. Other");

    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].lines, vec!["The following:", "1701.91.44 Cotton yarn"]);
}

#[test]
fn normalize_strips_page_noise_and_running_headers() {
    let grammar = grammar();
    let raw = pages(&[
        &["Running   Head Text", "body a", "7"],
        &["Running Head Text", "body   b", "8"],
        &["Revision 3", "body c", "GN p. 4"],
    ]);

    let lines = normalize(&grammar, &raw);
    let texts = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<&str>>();

    assert_eq!(texts, vec!["body a", "body b", "body c"]);
    assert_eq!(lines[2].page, 2);
}

#[test]
fn normalize_drops_repeated_footer_lines() {
    let grammar = grammar();
    let raw = pages(&[&["A body", "Footer Z"], &["B body", "Footer  Z"]]);

    let lines = normalize(&grammar, &raw);
    let texts = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<&str>>();

    assert_eq!(texts, vec!["A body", "B body"]);
}

#[test]
fn normalize_is_idempotent() {
    let grammar = grammar();
    let raw = chapter_nine_pages();

    let first = normalize(&grammar, &raw);
    let mut regrouped = vec![Vec::<String>::new(); raw.len()];
    for line in &first {
        regrouped[line.page].push(line.text.clone());
    }
    let second = normalize(&grammar, &regrouped);

    let project = |lines: &[Line]| {
        lines
            .iter()
            .map(|line| (line.page, line.text.clone()))
            .collect::<Vec<(usize, String)>>()
    };
    assert_eq!(project(first.as_slice()), project(second.as_slice()));
}

#[test]
fn normalize_returns_nothing_for_empty_pages() {
    let grammar = grammar();
    let raw: Vec<Vec<String>> = Vec::new();
    assert!(normalize(&grammar, &raw).is_empty());
}

#[test]
fn chapter_notes_are_parsed_with_title_and_outline() {
    let grammar = grammar();
    let chapter = assemble_chapter_notes(&grammar, &chapter_nine_pages(), "9")
        .expect("chapter anchor")
        .expect("chapter notes");

    assert_eq!(chapter.chapter, "9");
    assert_eq!(chapter.title, "COFFEE, TEA, MATE AND SPICES");
    assert_eq!(chapter.notes.len(), 2);

    let first = &chapter.notes[0];
    assert_eq!(first.number, "1");
    assert!(first.text.starts_with("Mixtures of the products"));
    assert_eq!(labels(first.sub_items.as_deref().expect("sub items")), vec!["(a)", "(b)"]);

    let second = &chapter.notes[1];
    assert_eq!(second.number, "2");
    assert!(second.sub_items.is_none());
}

#[test]
fn additional_notes_follow_the_additional_label() {
    let grammar = grammar();
    let notes = assemble_additional_notes(&grammar, &chapter_nine_pages(), "09")
        .expect("chapter anchor")
        .expect("additional notes");

    assert_eq!(notes.chapter, "9");
    assert_eq!(notes.notes.len(), 1);
    assert!(notes.notes[0].text.contains("\"pepper\""));
}

#[test]
fn additional_notes_strip_continuation_boilerplate() {
    let grammar = grammar();
    let raw = pages(&[&[
        "CHAPTER 4",
        "Additional U.S. Notes",
        "1. The term \"dairy products\" means milk and cream.",
        "Additional U.S. Notes (con.)",
        "2. For the purposes of this chapter the term butter means butter.",
    ]]);

    let notes = assemble_additional_notes(&grammar, &raw, "4")
        .expect("chapter anchor")
        .expect("additional notes");

    assert_eq!(notes.notes.len(), 2);
    assert!(!notes.notes[0].text.contains("(con.)"));
}

#[test]
fn chapter_without_additional_label_is_not_applicable() {
    let grammar = grammar();
    let raw = pages(&[&["CHAPTER 1", "LIVE ANIMALS", "Note", "1. This chapter covers all live animals."]]);

    let notes = assemble_additional_notes(&grammar, &raw, "1").expect("chapter anchor");
    assert!(notes.is_none());
}

#[test]
fn missing_chapter_heading_is_a_unit_failure() {
    let grammar = grammar();
    let raw = pages(&[&["Some unrelated text", "1. A note"]]);

    let err = assemble_chapter_notes(&grammar, &raw, "9").expect_err("missing chapter heading");
    assert_eq!(err.family(), DocumentFamily::ChapterNotes);
    assert_eq!(err.key(), "9");
    assert_eq!(
        err.to_string(),
        "chapter_notes 9: required anchor `CHAPTER heading` not found"
    );
}

#[test]
fn empty_extraction_is_not_applicable() {
    let grammar = grammar();
    let raw: Vec<Vec<String>> = vec![Vec::new(), Vec::new()];
    assert!(assemble_chapter_notes(&grammar, &raw, "9").expect("empty").is_none());
    assert!(assemble_rules(&grammar, &raw).expect("empty").is_none());
}

#[test]
fn section_document_starting_with_chapter_is_not_applicable() {
    let grammar = grammar();
    let raw = pages(&[&[
        "CHAPTER 12",
        "OIL SEEDS AND OLEAGINOUS FRUITS",
        "Notes",
        "1. Heading 1207 applies, inter alia, to palm nuts and kernels.",
    ]]);

    let section = assemble_section_notes(&grammar, &raw, None).expect("not an error");
    assert!(section.is_none());
}

#[test]
fn section_notes_stop_at_the_first_chapter() {
    let grammar = grammar();
    let raw = pages(&[&[
        "SECTION II",
        "VEGETABLE PRODUCTS",
        "Note",
        "1. In this section the term \"pellets\" means products which have been agglomerated.",
        "CHAPTER 6",
        "LIVE TREES AND OTHER PLANTS",
        "1. Subject to the second part of heading 0601, this chapter covers only live trees.",
    ]]);

    let section = assemble_section_notes(&grammar, &raw, Some("ii"))
        .expect("section anchor")
        .expect("section notes");

    assert_eq!(section.section, "II");
    assert_eq!(section.title, "VEGETABLE PRODUCTS");
    assert_eq!(section.notes.len(), 1);
    assert!(section.notes[0].text.contains("pellets"));
}

#[test]
fn unnumbered_section_note_becomes_note_one() {
    let grammar = grammar();
    let raw = pages(&[&[
        "SECTION I",
        "LIVE ANIMALS; ANIMAL PRODUCTS",
        "Note",
        "Any reference in this section to a particular genus or species of an animal includes a reference to the young of that genus or species.",
        "CHAPTER 1",
    ]]);

    let section = assemble_section_notes(&grammar, &raw, None)
        .expect("section anchor")
        .expect("section notes");

    assert_eq!(section.notes.len(), 1);
    assert_eq!(section.notes[0].number, "1");
    assert!(section.notes[0].text.starts_with("Any reference"));
    assert!(section.notes[0].sub_items.is_none());
}

#[test]
fn general_note_splits_title_from_body() {
    let grammar = grammar();
    let raw = pages(&[&[
        "GENERAL NOTES",
        "1. Tariff Treatment of Imported Goods. All goods provided for in this schedule are subject to duty as prescribed in general notes 3 through 29, inclusive.",
        "2. Customs Territory of the United States. The term \"customs territory of the United States\" includes only the States.",
        "(a) the District of Columbia; and",
        "(b) Puerto Rico.",
    ]]);

    let note = assemble_general_note(&grammar, &raw, "2")
        .expect("ordinal anchor")
        .expect("general note");

    assert_eq!(note.note_number, "2");
    assert_eq!(note.title, "Customs Territory of the United States");
    assert!(note.text.starts_with("The term"));
    assert_eq!(labels(note.sub_items.as_deref().expect("sub items")), vec!["(a)", "(b)"]);

    let first = assemble_general_note(&grammar, &raw, "1")
        .expect("ordinal anchor")
        .expect("general note");
    assert_eq!(first.title, "Tariff Treatment of Imported Goods");
    assert!(!first.text.contains("Customs Territory"));
}

#[test]
fn missing_general_note_ordinal_is_a_unit_failure() {
    let grammar = grammar();
    let raw = pages(&[&["GENERAL NOTES", "1. Tariff Treatment. All goods are dutiable."]]);

    let err = assemble_general_note(&grammar, &raw, "5").expect_err("missing ordinal");
    assert_eq!(err.family(), DocumentFamily::GeneralNote);
    assert_eq!(err.key(), "5");
}

#[test]
fn keyed_family_without_key_reports_wildcard_key() {
    let grammar = grammar();

    let err = assemble(&grammar, &chapter_nine_pages(), DocumentFamily::ChapterNotes, None)
        .expect_err("no chapter key");

    assert!(matches!(
        &err,
        UnitError::AnchorNotFound { family: DocumentFamily::ChapterNotes, key, .. } if key == "*"
    ));
}

#[test]
fn rules_split_into_primary_supplementary_and_annotation() {
    let grammar = grammar();
    let raw = pages(&[&[
        "GENERAL RULES OF INTERPRETATION",
        "Classification of goods in the tariff schedule shall be governed by the following principles:",
        "1. The table of contents and titles of sections are provided for ease of reference only.",
        "2. (a) Any reference in a heading to an article shall include that article incomplete or unfinished.",
        "(b) Any reference in a heading to a material shall include mixtures of that material.",
        "ADDITIONAL U.S. RULES OF INTERPRETATION",
        "1. In the absence of special language or context which otherwise requires--",
        "(a) a tariff classification controlled by use is to be determined by use in the United States;",
        "[COMPILER'S NOTE: The rules were renumbered by Presidential Proclamation 7515.]",
    ]]);

    let rules = assemble_rules(&grammar, &raw)
        .expect("rules anchor")
        .expect("rules");

    assert_eq!(rules.general_rules.len(), 2);
    assert!(rules.general_rules[1].text.is_empty());
    assert_eq!(
        labels(rules.general_rules[1].sub_items.as_deref().expect("sub items")),
        vec!["(a)", "(b)"]
    );

    assert_eq!(rules.additional_rules.len(), 1);
    assert!(rules.additional_rules[0].text.starts_with("In the absence"));
    assert_eq!(
        rules.compiler_note.as_deref(),
        Some("[COMPILER'S NOTE: The rules were renumbered by Presidential Proclamation 7515.]")
    );
}

#[test]
fn rules_without_anchor_are_a_unit_failure() {
    let grammar = grammar();
    let raw = pages(&[&["1. Some numbered text without the rules heading"]]);

    let err = assemble_rules(&grammar, &raw).expect_err("missing anchor");
    assert_eq!(err.family(), DocumentFamily::GeneralRules);
}

#[test]
fn deduplicate_keeps_first_chapter_per_key() {
    let first = ChapterNote {
        chapter: "9".to_string(),
        title: "first".to_string(),
        notes: Vec::new(),
    };
    let second = ChapterNote {
        chapter: "9".to_string(),
        title: "second".to_string(),
        notes: Vec::new(),
    };
    let other = ChapterNote {
        chapter: "10".to_string(),
        title: "cereals".to_string(),
        notes: Vec::new(),
    };

    let unique = deduplicate(vec![first, other, second]);
    let titles = unique
        .iter()
        .map(|chapter| chapter.title.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(titles, vec!["first", "cereals"]);
}

#[test]
fn deduplicate_by_always_keeps_unkeyed_items() {
    let items = vec![(None, 1), (Some("a"), 2), (None, 3), (Some("a"), 4), (Some("b"), 5)];

    let unique = deduplicate_by(items, |(key, _)| *key);
    let values = unique.iter().map(|(_, value)| *value).collect::<Vec<i32>>();
    assert_eq!(values, vec![1, 2, 3, 5]);
}

#[test]
fn flatten_walks_notes_depth_first_with_paths() {
    let grammar = grammar();
    let lines = ["Goods include:", "(a) woven;", "(i) of cotton;", "(b) knitted."];
    let (text, sub_items) = build_outline(&grammar, &lines);
    let unit = ParsedUnit::ChapterNotes(ChapterNote {
        chapter: "52".to_string(),
        title: "COTTON".to_string(),
        notes: vec![Note {
            number: "3".to_string(),
            text,
            sub_items,
        }],
    });

    let records = flatten(&unit);
    let paths = records
        .iter()
        .map(|record| record.path.as_str())
        .collect::<Vec<&str>>();

    assert_eq!(paths, vec!["3", "3 > (a)", "3 > (a) > (i)", "3 > (b)"]);
    assert!(records.iter().all(|record| record.unit_key.as_deref() == Some("52")));
    assert!(records.iter().all(|record| record.owner_title.as_deref() == Some("COTTON")));
    assert_eq!(records[2].text, "(i) of cotton;");
}

#[test]
fn flatten_prefixes_supplementary_rules() {
    let unit = ParsedUnit::GeneralRules(RuleSet {
        general_rules: vec![Note {
            number: "1".to_string(),
            text: "Titles are for reference only.".to_string(),
            sub_items: None,
        }],
        additional_rules: vec![Note {
            number: "1".to_string(),
            text: "Use is determined in the United States.".to_string(),
            sub_items: None,
        }],
        compiler_note: None,
    });

    let records = flatten(&unit);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].path, "1");
    assert_eq!(records[1].path, "U.S. > 1");
    assert!(records.iter().all(|record| record.unit_key.is_none()));
}

#[test]
fn parsed_unit_serializes_with_family_tag() {
    let unit = ParsedUnit::AdditionalNotes(AdditionalNotes {
        chapter: "9".to_string(),
        notes: vec![Note {
            number: "1".to_string(),
            text: "The term pepper.".to_string(),
            sub_items: None,
        }],
    });

    let value = serde_json::to_value(&unit).expect("serialize unit");
    assert_eq!(value["family"], "additional_notes");
    assert_eq!(value["chapter"], "9");
    assert!(value["notes"][0].get("sub_items").is_none());
}
