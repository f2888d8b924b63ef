use crate::error::ParseError;
use crate::label::Label;
use crate::paginate::normalize_newlines;
use crate::types::{AppStructure, Settings, StructureNode, ROOT_ID};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use winnow::ascii::{space0, space1};
use winnow::combinator::{delimited, opt, preceded, repeat, separated_pair};
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_till};

/// A classified page block. `parent` is whatever navigation target the
/// block itself names; only the root menu has none.
#[derive(Debug, Clone, PartialEq)]
enum Block {
    Menu {
        title: String,
        entries: Vec<(String, Label)>,
        parent: Option<Label>,
    },
    Note {
        content: String,
        parent: Option<Label>,
    },
    Code {
        content: String,
        parent: Option<Label>,
    },
    Quit,
}

impl Block {
    fn parent(&self) -> Option<Label> {
        match self {
            Block::Menu { parent, .. } | Block::Note { parent, .. } | Block::Code { parent, .. } => {
                *parent
            }
            Block::Quit => None,
        }
    }
}

type Matcher = fn(&[&str]) -> Option<Block>;

/// Tried in order against the lines after `Lbl XY`. The last one accepts
/// anything, so every labelled block gets a shape.
const MATCHERS: [Matcher; 4] = [menu_block, note_block, quit_block, code_block];

pub fn parse(text: &str) -> Result<AppStructure, ParseError> {
    let text = normalize_newlines(text);
    let mut order: Vec<Label> = Vec::new();
    let mut blocks: HashMap<Label, Block> = HashMap::new();

    for lines in split_blocks(&text) {
        match classify(&lines) {
            Some((label, block)) => {
                if blocks.insert(label, block).is_some() {
                    warn!(%label, "label defined twice, keeping the last block");
                } else {
                    order.push(label);
                }
            }
            None => debug!(first_line = lines.first().copied().unwrap_or(""), "skipping unlabelled block"),
        }
    }

    let root = order
        .iter()
        .copied()
        .find(|label| matches!(blocks.get(label), Some(Block::Menu { parent: None, .. })))
        .ok_or(ParseError::RootMenuNotFound)
        .inspect_err(|err| warn!(error = %err, "failed to parse program text"))?;

    let mut builder = TreeBuilder {
        blocks: &blocks,
        next_id: 1,
        visiting: HashSet::new(),
        built: HashSet::new(),
    };
    let tree = builder
        .build_menu(root, ROOT_ID.to_string())
        .inspect_err(|err| warn!(error = %err, "failed to parse program text"))?;

    Ok(AppStructure {
        settings: Settings::default(),
        root: Arc::new(tree),
        next_id: builder.next_id,
    })
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn classify(lines: &[&str]) -> Option<(Label, Block)> {
    if lines.len() < 2 {
        return None;
    }
    let label = label_definition(lines[0])?;
    let body = &lines[1..];
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(body))
        .map(|block| (label, block))
}

fn menu_block(body: &[&str]) -> Option<Block> {
    if instruction(body[0]) != "ClrHome" {
        return None;
    }
    let (title, options) = menu_call.parse(instruction(body.get(1)?)).ok()?;

    let mut entries = Vec::new();
    let mut parent = None;
    for (name, target) in options {
        match name.as_str() {
            "Back" => parent = Some(target),
            "Quit" => {}
            _ => entries.push((name, target)),
        }
    }
    Some(Block::Menu {
        title,
        entries,
        parent,
    })
}

fn note_block(body: &[&str]) -> Option<Block> {
    if instruction(body[0]) != "ClrHome" || !body.iter().any(|line| disp_text(line).is_some()) {
        return None;
    }

    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut parent = None;
    let mut i = 1;
    while i < body.len() {
        let line = body[i];
        if let Some(text) = disp_text(line) {
            current.push(text);
        } else if instruction(line) == "Pause \"\"" {
            let clears = body
                .get(i + 1)
                .is_some_and(|next| instruction(next) == "ClrHome");
            if !current.is_empty() {
                let mut section = current.join("\n");
                if clears {
                    // hard break: the third line break
                    section.push('\n');
                }
                sections.push(section);
                current.clear();
            }
            if clears {
                i += 1;
            }
        } else if let Some(target) = goto_target(line) {
            parent = Some(target);
            break;
        }
        i += 1;
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }

    Some(Block::Note {
        content: sections.join("\n\n"),
        parent,
    })
}

fn quit_block(body: &[&str]) -> Option<Block> {
    (instruction(body[0]) == "Stop").then_some(Block::Quit)
}

fn code_block(body: &[&str]) -> Option<Block> {
    let parent = body.iter().find_map(|line| goto_target(line));
    let mut raw = body;
    if let Some((last, init)) = raw.split_last() {
        if goto_target(last).is_some() {
            raw = init;
        }
    }
    let content = raw
        .iter()
        .map(|&line| line.strip_prefix(':').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    Some(Block::Code { content, parent })
}

struct TreeBuilder<'a> {
    blocks: &'a HashMap<Label, Block>,
    next_id: u64,
    visiting: HashSet<Label>,
    built: HashSet<Label>,
}

impl TreeBuilder<'_> {
    fn fresh_id(&mut self) -> String {
        let id = format!("item-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn build_menu(&mut self, label: Label, id: String) -> Result<StructureNode, ParseError> {
        let blocks = self.blocks;
        let Some(Block::Menu { title, entries, .. }) = blocks.get(&label) else {
            return Err(ParseError::UnresolvedLabel(label));
        };
        if self.visiting.contains(&label) {
            return Err(ParseError::CyclicMenu(label));
        }
        // a tree has one path to every menu
        if !self.built.insert(label) {
            return Err(ParseError::SharedMenu(label));
        }
        self.visiting.insert(label);

        let mut children = Vec::with_capacity(entries.len());
        for (name, target) in entries {
            let block = blocks.get(target);
            if let Some(back) = block.and_then(Block::parent) {
                if back != label {
                    debug!(%target, %back, menu = %label, "page returns to a different menu");
                }
            }
            let child = match block {
                None => return Err(ParseError::UnresolvedLabel(*target)),
                Some(Block::Quit) => continue,
                Some(Block::Menu { .. }) => {
                    let id = self.fresh_id();
                    self.build_menu(*target, id)?
                }
                Some(Block::Note { content, .. }) => {
                    StructureNode::note(self.fresh_id(), name.as_str(), content.as_str())
                }
                Some(Block::Code { content, .. }) => {
                    StructureNode::code(self.fresh_id(), name.as_str(), content.as_str())
                }
            };
            children.push(Arc::new(child));
        }

        self.visiting.remove(&label);
        Ok(StructureNode::menu(id, title.as_str(), children))
    }
}

/// Instruction body of a line: surrounding whitespace and one leading `:` removed.
pub(crate) fn instruction(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix(':').unwrap_or(line).trim_start()
}

pub(crate) fn disp_text(line: &str) -> Option<&str> {
    let text = disp_call.parse(instruction(line)).ok()?;
    Some(text.strip_suffix('"').unwrap_or(text))
}

pub(crate) fn goto_target(line: &str) -> Option<Label> {
    goto_call.parse(instruction(line)).ok()
}

pub(crate) fn label_definition(line: &str) -> Option<Label> {
    lbl_call.parse(instruction(line)).ok()
}

pub(crate) fn menu_options(line: &str) -> Option<(String, Vec<(String, Label)>)> {
    menu_call.parse(instruction(line)).ok()
}

fn label(input: &mut &str) -> winnow::Result<Label> {
    (one_of('A'..='Z'), one_of('A'..='Z'))
        .verify_map(|(first, second): (char, char)| Label::from_letters(first, second))
        .parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn lbl_call(input: &mut &str) -> winnow::Result<Label> {
    preceded(("Lbl", space1), label).parse_next(input)
}

fn goto_call(input: &mut &str) -> winnow::Result<Label> {
    preceded(("Goto", space1), label).parse_next(input)
}

fn disp_call<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    preceded(("Disp", space1, '"'), rest).parse_next(input)
}

fn menu_option(input: &mut &str) -> winnow::Result<(String, Label)> {
    preceded(
        (space0, ',', space0),
        separated_pair(
            quoted.map(|name: &str| name.to_string()),
            (space0, ',', space0),
            label,
        ),
    )
    .parse_next(input)
}

fn menu_call(input: &mut &str) -> winnow::Result<(String, Vec<(String, Label)>)> {
    delimited(
        ("Menu(", space0),
        (
            quoted.map(|title: &str| title.to_string()),
            repeat(0.., menu_option),
        ),
        (space0, opt(')')),
    )
    .parse_next(input)
}
