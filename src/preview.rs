//! Reads single pages back out of generated text for the calculator screen preview.

use crate::label::Label;
use crate::parser::{disp_text, goto_target, instruction, label_definition, menu_options};
use crate::tree::find_parent;
use crate::types::StructureNode;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuPreview {
    pub title: String,
    pub options: Vec<MenuOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    pub name: String,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScreenItem {
    Text { content: String },
    Pause,
    PauseAndClear,
    Clear,
}

/// The block of `program` defining `label`, trimmed.
pub fn find_code_section(program: &str, label: Label) -> Option<&str> {
    sections(program).into_iter().find(|section| {
        section
            .lines()
            .next()
            .and_then(label_definition)
            .is_some_and(|found| found == label)
    })
}

/// Label of the page generated for node `id`. The root is the first block;
/// any other node is looked up through its parent's menu entries. A child
/// the generator dropped from a full menu has no page.
pub fn label_for_node(program: &str, root: &Arc<StructureNode>, id: &str) -> Option<Label> {
    if root.id == id {
        let first = sections(program).into_iter().next()?;
        return first.lines().next().and_then(label_definition);
    }
    let (parent, index) = find_parent(root, id)?;
    let parent_label = label_for_node(program, root, &parent.id)?;
    let menu = parse_menu_code(find_code_section(program, parent_label)?)?;
    // the last option is Back or Quit
    let (_, entries) = menu.options.split_last()?;
    entries.get(index).map(|option| option.label)
}

/// Title and options of the first `Menu(` in `code`, navigation entries included.
pub fn parse_menu_code(code: &str) -> Option<MenuPreview> {
    let (title, options) = code.lines().find_map(menu_options)?;
    Some(MenuPreview {
        title,
        options: options
            .into_iter()
            .map(|(name, label)| MenuOption { name, label })
            .collect(),
    })
}

/// What a note page shows, up to its closing `Goto`.
pub fn parse_note_code(code: &str) -> Vec<ScreenItem> {
    let lines: Vec<&str> = code.lines().collect();
    let mut items = Vec::new();
    let mut i = 0;

    if lines.first().and_then(|l| label_definition(l)).is_some() {
        i += 1;
    }
    if lines.get(i).is_some_and(|l| instruction(l) == "ClrHome") {
        i += 1;
    }

    while i < lines.len() {
        let line = lines[i];
        if let Some(text) = disp_text(line) {
            items.push(ScreenItem::Text {
                content: text.to_string(),
            });
        } else if instruction(line) == "Pause \"\"" {
            if lines.get(i + 1).is_some_and(|next| instruction(next) == "ClrHome") {
                items.push(ScreenItem::PauseAndClear);
                i += 1;
            } else {
                items.push(ScreenItem::Pause);
            }
        } else if instruction(line) == "ClrHome" {
            items.push(ScreenItem::Clear);
        } else if goto_target(line).is_some() {
            break;
        }
        i += 1;
    }
    items
}

fn sections(program: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut end = 0;
    let mut offset = 0;

    for line in program.split_inclusive('\n') {
        let body = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if body.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(program[s..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(offset);
            }
            end = offset + body.len();
        }
        offset += line.len();
    }
    if let Some(s) = start {
        out.push(program[s..end].trim());
    }
    out
}
