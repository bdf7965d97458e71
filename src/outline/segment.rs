use super::grammar::OutlineGrammar;

/// One top-level numbered note cut out of a located block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSpan {
    pub number: String,
    /// Body lines with the leading `N.` removed from the first one.
    pub lines: Vec<String>,
}

/// Whether `line` opens a new top-level note. Decimal codes such as
/// `1701.91.44` and ranges such as `12.-15.` never do.
pub fn is_note_start(grammar: &OutlineGrammar, line: &str) -> bool {
    grammar.note_boundary.is_match(line)
}

/// Splits a located block at numbered note boundaries. Segments that do not
/// have the `<number>. <body>` shape are residual boilerplate and are dropped.
pub fn segment(grammar: &OutlineGrammar, block: &str) -> Vec<NoteSpan> {
    let starts = grammar
        .note_boundary
        .find_iter(block)
        .map(|found| found.start())
        .collect::<Vec<usize>>();

    starts
        .iter()
        .enumerate()
        .filter_map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(block.len());
            let segment = block[start..end].trim();
            let captures = grammar.note_shape.captures(segment)?;

            let number = captures.name("number")?.as_str().to_string();
            let lines = captures
                .name("body")?
                .as_str()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<String>>();

            Some(NoteSpan { number, lines })
        })
        .collect()
}
