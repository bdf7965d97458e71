use super::grammar::OutlineGrammar;
use super::types::{MarkerLevel, OutlineNode};

#[derive(Debug)]
struct ArenaNode {
    token: String,
    level: MarkerLevel,
    text: String,
    children: Vec<usize>,
}

/// Nodes live in a flat arena; `stack` holds the indices of open nodes,
/// deepest last.
#[derive(Debug, Default)]
struct OutlineArena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
    stack: Vec<usize>,
    main_text: String,
}

/// Rebuilds the nested sub-items of one note body.
///
/// Depth comes from which numbering family a marker belongs to, never from
/// indentation. A new marker closes every open node at its level or deeper and
/// attaches to the nearest remaining ancestor. Unmarked lines are continuation
/// text. Never fails; empty input yields `("", None)`.
pub fn build_outline<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    lines: &[S],
) -> (String, Option<Vec<OutlineNode>>) {
    let mut arena = OutlineArena::default();

    for raw_line in lines {
        let line = raw_line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        if grammar.inline_arabic.find_iter(line).nth(1).is_some() {
            arena.push_inline_markers(grammar, line);
            continue;
        }

        arena.push_line(grammar, line);
    }

    arena.finish()
}

impl OutlineArena {
    fn push_line(&mut self, grammar: &OutlineGrammar, line: &str) {
        let Some((token, level)) = self.classify(grammar, line) else {
            self.append_continuation(line);
            return;
        };

        self.close_at_or_below(level);
        let id = self.alloc(token, level, line.to_string());
        self.attach(id);
        self.stack.push(id);
    }

    /// Several `(n)` clauses reflowed onto one physical line become sibling
    /// nodes under the nearest open ancestor. They are not left open.
    fn push_inline_markers(&mut self, grammar: &OutlineGrammar, line: &str) {
        let starts = grammar
            .inline_arabic
            .captures_iter(line)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let number = captures.get(1)?;
                Some((whole.start(), number.as_str().to_string()))
            })
            .collect::<Vec<(usize, String)>>();

        let Some(&(first_start, _)) = starts.first() else {
            self.push_line(grammar, line);
            return;
        };

        let prefix = line[..first_start].trim();
        if !prefix.is_empty() {
            self.push_line(grammar, prefix);
        }

        self.close_at_or_below(MarkerLevel::Arabic);
        for (index, (start, number)) in starts.iter().enumerate() {
            let end = starts
                .get(index + 1)
                .map(|(next_start, _)| *next_start)
                .unwrap_or(line.len());
            let piece = line[*start..end].trim();
            let id = self.alloc(number.clone(), MarkerLevel::Arabic, piece.to_string());
            self.attach(id);
        }
    }

    fn classify(&self, grammar: &OutlineGrammar, line: &str) -> Option<(String, MarkerLevel)> {
        let captures = grammar.marker.captures(line)?;
        let token = captures.name("token")?.as_str();

        let candidates = grammar
            .families_by_level
            .iter()
            .filter(|(_, pattern)| pattern.is_match(token))
            .map(|(level, _)| *level)
            .collect::<Vec<MarkerLevel>>();

        let level = match candidates.as_slice() {
            [] => return None,
            [only] => *only,
            [letter, roman, ..] => self.resolve_ambiguous(token, *letter, *roman),
        };

        Some((token.to_string(), level))
    }

    /// A token such as `i` or `C` reads as both a letter and a roman numeral.
    /// Roman wins unless an open letter node is its immediate predecessor and
    /// no open roman node is.
    fn resolve_ambiguous(
        &self,
        token: &str,
        letter: MarkerLevel,
        roman: MarkerLevel,
    ) -> MarkerLevel {
        let value = roman_value(token);
        let continues_roman = self.open_nodes(roman).any(|node| {
            matches!((roman_value(&node.token), value), (Some(open), Some(next)) if open + 1 == next)
        });
        if continues_roman {
            return roman;
        }

        let continues_letter = self
            .open_nodes(letter)
            .any(|node| next_letter(&node.token).is_some_and(|next| token.starts_with(next)));
        if continues_letter { letter } else { roman }
    }

    fn open_nodes(&self, level: MarkerLevel) -> impl Iterator<Item = &ArenaNode> + '_ {
        self.stack
            .iter()
            .map(|&id| &self.nodes[id])
            .filter(move |node| node.level == level)
    }

    fn close_at_or_below(&mut self, level: MarkerLevel) {
        while let Some(&top) = self.stack.last() {
            if self.nodes[top].level >= level {
                self.stack.pop();
            } else {
                break;
            }
        }
    }

    fn alloc(&mut self, token: String, level: MarkerLevel, text: String) -> usize {
        self.nodes.push(ArenaNode {
            token,
            level,
            text,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn attach(&mut self, id: usize) {
        match self.stack.last() {
            Some(&parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }
    }

    fn append_continuation(&mut self, line: &str) {
        let target = match self.stack.last() {
            Some(&top) => &mut self.nodes[top].text,
            None => &mut self.main_text,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(line);
    }

    fn finish(mut self) -> (String, Option<Vec<OutlineNode>>) {
        let roots = std::mem::take(&mut self.roots);
        let sub_items = roots
            .into_iter()
            .map(|id| self.materialize(id))
            .collect::<Vec<OutlineNode>>();

        let sub_items = if sub_items.is_empty() {
            None
        } else {
            Some(sub_items)
        };
        (self.main_text, sub_items)
    }

    // Children are strictly deeper than their parent, so recursion is bounded
    // by the number of marker families.
    fn materialize(&mut self, id: usize) -> OutlineNode {
        let children = std::mem::take(&mut self.nodes[id].children);
        let children = children
            .into_iter()
            .map(|child| self.materialize(child))
            .collect::<Vec<OutlineNode>>();

        let node = &mut self.nodes[id];
        OutlineNode {
            label: format!("({})", node.token),
            level: node.level,
            text: std::mem::take(&mut node.text),
            children,
        }
    }
}

fn next_letter(token: &str) -> Option<char> {
    let mut chars = token.chars();
    let current = chars.next()?;
    if chars.next().is_some() || !current.is_ascii_alphabetic() {
        return None;
    }
    char::from_u32(current as u32 + 1).filter(|next| next.is_ascii_alphabetic())
}

pub(super) fn roman_value(token: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut previous = 0u32;

    for ch in token.chars().rev() {
        let value = match ch.to_ascii_lowercase() {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if value < previous {
            total = total.checked_sub(value)?;
        } else {
            total += value;
            previous = value;
        }
    }

    if total == 0 { None } else { Some(total) }
}
