//! Flags symbol runs in note text that the calculator's token set cannot express.

use crate::types::{NodeBody, StructureNode};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Valid token spellings, primary and alternate. An empty dictionary means
/// the token list has not been loaded yet, and everything is accepted.
#[derive(Debug, Clone, Default)]
pub struct TokenDictionary {
    tokens: HashSet<String>,
    longest_first: Vec<String>,
}

impl TokenDictionary {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .collect();
        let mut longest_first: Vec<String> = tokens.iter().cloned().collect();
        longest_first.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            tokens,
            longest_first,
        }
    }

    /// Reads a JSON array of token strings.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let tokens: Vec<String> = serde_json::from_str(text)?;
        Ok(Self::new(tokens))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    fn accepts(&self, candidate: &str) -> bool {
        if self.tokens.contains(candidate) {
            return true;
        }
        let mut rest = candidate;
        while !rest.is_empty() {
            match self
                .longest_first
                .iter()
                .find(|token| rest.starts_with(token.as_str()))
            {
                Some(token) => rest = &rest[token.len()..],
                None => return false,
            }
        }
        true
    }
}

/// Symbol runs in `text` that the dictionary cannot spell, plus any quote or
/// backslash when `forbid_quotes_and_backslashes` is set.
///
/// Candidates are maximal runs of characters that are neither whitespace nor
/// ASCII word characters, which covers digraphs such as `->`.
pub fn find_invalid(
    text: &str,
    dictionary: &TokenDictionary,
    forbid_quotes_and_backslashes: bool,
) -> BTreeSet<String> {
    let mut invalid = BTreeSet::new();
    if dictionary.is_empty() {
        return invalid;
    }

    for candidate in symbol_runs(text) {
        if !dictionary.accepts(candidate) {
            invalid.insert(candidate.to_string());
        }
    }
    if forbid_quotes_and_backslashes {
        invalid.extend(forbidden_chars(text));
    }
    invalid
}

/// Quote and backslash characters in a title; titles are emitted inside
/// string literals, where neither can be written.
pub fn find_invalid_title(title: &str) -> BTreeSet<String> {
    forbidden_chars(title).collect()
}

/// Invalid tokens for every note in the tree, keyed by node id. Notes
/// without problems are left out.
pub fn find_invalid_in_tree(
    root: &StructureNode,
    dictionary: &TokenDictionary,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut out = BTreeMap::new();
    if !dictionary.is_empty() {
        collect_invalid(root, dictionary, &mut out);
    }
    out
}

fn collect_invalid(
    node: &StructureNode,
    dictionary: &TokenDictionary,
    out: &mut BTreeMap<String, BTreeSet<String>>,
) {
    match &node.body {
        NodeBody::Note { content } => {
            let invalid = find_invalid(content, dictionary, true);
            if !invalid.is_empty() {
                out.insert(node.id.clone(), invalid);
            }
        }
        NodeBody::Menu { children } => {
            for child in children {
                collect_invalid(child, dictionary, out);
            }
        }
        NodeBody::Code { .. } => {}
    }
}

fn is_symbol(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace())
}

fn symbol_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        match (is_symbol(ch), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                runs.push(&text[s..idx]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(&text[s..]);
    }
    runs
}

fn forbidden_chars(text: &str) -> impl Iterator<Item = String> + '_ {
    text.chars()
        .filter(|c| matches!(c, '"' | '\\'))
        .map(String::from)
}
