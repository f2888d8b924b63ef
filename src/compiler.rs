use crate::ast::{CodePage, MenuEntry, MenuPage, NotePage, Page};
use crate::error::GenerateError;
use crate::label::{Label, LabelAllocator};
use crate::paginate::{normalize_newlines, paginate, NoteUnit};
use crate::types::{AppStructure, NodeBody, Settings, StructureNode};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options a calculator `Menu(` can show, navigation entry included.
pub const MAX_MENU_OPTIONS: usize = 9;
const NAV_SLOTS: usize = 1;

/// One generation pass. Owns the label counter and the pages built so far;
/// consumed by [`CompilerState::compile`].
pub struct CompilerState {
    settings: Settings,
    labels: LabelAllocator,
    pages: BTreeMap<Label, Page>,
    root_label: Option<Label>,
    quit_label: Option<Label>,
}

impl Default for CompilerState {
    fn default() -> Self {
        Self::with_options(Settings::default())
    }
}

impl CompilerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(settings: Settings) -> Self {
        Self {
            settings,
            labels: LabelAllocator::new(),
            pages: BTreeMap::new(),
            root_label: None,
            quit_label: None,
        }
    }

    pub fn compile(mut self, root: &StructureNode) -> Result<Program, GenerateError> {
        let NodeBody::Menu { children } = &root.body else {
            return Err(GenerateError::InvalidRoot);
        };
        let label = self.add_menu(&root.title, None)?;
        self.build_children(children, label)?;

        let (Some(root_label), Some(quit_label)) = (self.root_label, self.quit_label) else {
            return Err(GenerateError::InvalidRoot);
        };
        debug!(
            pages = self.pages.len(),
            labels = self.labels.allocated(),
            "compiled app structure"
        );

        Ok(Program {
            pages: self.pages,
            root_label,
            quit_label,
            lines_per_screen: self.settings.lines_per_screen,
        })
    }

    fn build_children(
        &mut self,
        children: &[Arc<StructureNode>],
        parent: Label,
    ) -> Result<(), GenerateError> {
        for child in children {
            if let Err(err) = self.build_child(child, parent) {
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(id = %child.id, title = %child.title, error = %err, "skipping menu entry");
            }
        }
        Ok(())
    }

    fn build_child(&mut self, node: &StructureNode, parent: Label) -> Result<(), GenerateError> {
        match &node.body {
            NodeBody::Menu { children } => {
                let label = self.add_submenu(parent, &node.title, &node.title)?;
                self.build_children(children, label)
            }
            NodeBody::Note { content } => self.add_note(parent, &node.title, content).map(|_| ()),
            NodeBody::Code { content } => self.add_code(parent, &node.title, content).map(|_| ()),
        }
    }

    fn add_menu(&mut self, title: &str, parent: Option<Label>) -> Result<Label, GenerateError> {
        let label = self.labels.next_label()?;
        self.pages.insert(
            label,
            Page::Menu(MenuPage {
                title: title.to_string(),
                entries: Vec::new(),
                parent,
            }),
        );

        if parent.is_none() && self.root_label.is_none() {
            self.root_label = Some(label);
            let quit = self.labels.next_label()?;
            self.pages.insert(quit, Page::Quit);
            self.quit_label = Some(quit);
        }
        Ok(label)
    }

    fn add_submenu(&mut self, parent: Label, name: &str, title: &str) -> Result<Label, GenerateError> {
        self.check_room(parent)?;
        let label = self.add_menu(title, Some(parent))?;
        self.push_entry(parent, name, label);
        Ok(label)
    }

    fn add_note(&mut self, parent: Label, name: &str, content: &str) -> Result<Label, GenerateError> {
        self.check_room(parent)?;
        let label = self.labels.next_label()?;
        let units = paginate(content, self.settings.chars_per_line);
        self.pages
            .insert(label, Page::Note(NotePage { units, parent }));
        self.push_entry(parent, name, label);
        Ok(label)
    }

    fn add_code(&mut self, parent: Label, name: &str, content: &str) -> Result<Label, GenerateError> {
        self.check_room(parent)?;
        let label = self.labels.next_label()?;
        let lines = normalize_newlines(content)
            .split('\n')
            .map(str::to_string)
            .collect();
        self.pages
            .insert(label, Page::Code(CodePage { lines, parent }));
        self.push_entry(parent, name, label);
        Ok(label)
    }

    fn check_room(&self, parent: Label) -> Result<(), GenerateError> {
        match self.pages.get(&parent) {
            Some(Page::Menu(menu)) if menu.entries.len() + 1 + NAV_SLOTS > MAX_MENU_OPTIONS => {
                Err(GenerateError::MenuOverflow {
                    label: parent,
                    max: MAX_MENU_OPTIONS,
                })
            }
            Some(Page::Menu(_)) => Ok(()),
            _ => Err(GenerateError::InvalidParent(parent)),
        }
    }

    fn push_entry(&mut self, parent: Label, name: &str, target: Label) {
        if let Some(Page::Menu(menu)) = self.pages.get_mut(&parent) {
            menu.entries.push(MenuEntry {
                name: name.to_string(),
                target,
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pages: BTreeMap<Label, Page>,
    root_label: Label,
    quit_label: Label,
    lines_per_screen: usize,
}

impl Program {
    pub fn root_label(&self) -> Label {
        self.root_label
    }

    pub fn quit_label(&self) -> Label {
        self.quit_label
    }

    pub fn page(&self, label: Label) -> Option<&Page> {
        self.pages.get(&label)
    }

    pub fn pages(&self) -> impl Iterator<Item = (Label, &Page)> {
        self.pages.iter().map(|(label, page)| (*label, page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn render(&self) -> String {
        let blocks: Vec<String> = self
            .pages
            .iter()
            .map(|(label, page)| {
                let mut lines = vec![format!("Lbl {}", label)];
                match page {
                    Page::Menu(menu) => self.render_menu(menu, &mut lines),
                    Page::Note(note) => self.render_note(note, &mut lines),
                    Page::Code(code) => render_code(code, &mut lines),
                    Page::Quit => lines.push(":Stop".to_string()),
                }
                lines.join("\n")
            })
            .collect();
        blocks.join("\n\n")
    }

    fn render_menu(&self, menu: &MenuPage, out: &mut Vec<String>) {
        out.push(":ClrHome".to_string());
        let mut parts = vec![quoted(&menu.title)];
        for entry in &menu.entries {
            parts.push(quoted(&entry.name));
            parts.push(entry.target.to_string());
        }
        match menu.parent {
            Some(parent) => {
                parts.push(quoted("Back"));
                parts.push(parent.to_string());
            }
            None => {
                parts.push(quoted("Quit"));
                parts.push(self.quit_label.to_string());
            }
        }
        out.push(format!(":Menu({})", parts.join(",")));
    }

    fn render_note(&self, note: &NotePage, out: &mut Vec<String>) {
        out.push(":ClrHome".to_string());
        let mut visible = 0;
        for unit in &note.units {
            match unit {
                NoteUnit::Pause => {
                    out.push(PAUSE.to_string());
                    visible = 0;
                }
                NoteUnit::HardBreak => {
                    out.push(PAUSE.to_string());
                    out.push(":ClrHome".to_string());
                    visible = 0;
                }
                NoteUnit::Lines(lines) => {
                    for line in lines {
                        if visible >= self.lines_per_screen {
                            out.push(PAUSE.to_string());
                            visible = 0;
                        }
                        out.push(format!(":Disp {}", quoted(line)));
                        visible += 1;
                    }
                }
            }
        }
        out.push(PAUSE.to_string());
        out.push(format!(":Goto {}", note.parent));
    }
}

const PAUSE: &str = ":Pause \"\"";

fn render_code(code: &CodePage, out: &mut Vec<String>) {
    for line in &code.lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(':') {
            out.push(line.clone());
        } else {
            out.push(format!(":{}", line));
        }
    }
    out.push(format!(":Goto {}", code.parent));
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text)
}

pub fn generate(structure: &AppStructure) -> Result<String, GenerateError> {
    let program = CompilerState::with_options(structure.settings).compile(&structure.root)?;
    Ok(program.render())
}

/// Like [`generate`], but a fatal error becomes the displayed text.
pub fn generate_or_message(structure: &AppStructure) -> String {
    generate(structure).unwrap_or_else(|err| {
        warn!(error = %err, "code generation failed");
        format!("Error generating code: {}", err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ROOT_ID;

    fn app(children: Vec<StructureNode>) -> AppStructure {
        AppStructure::new(
            Settings::default(),
            StructureNode::menu(
                ROOT_ID,
                "Main Menu",
                children.into_iter().map(Arc::new).collect(),
            ),
        )
    }

    #[test]
    fn hello_note_with_hard_break() {
        let structure = app(vec![StructureNode::note("item-1", "Hello", "Hi\n\n\nBye")]);
        let expected = "\
Lbl AA
:ClrHome
:Menu(\"Main Menu\",\"Hello\",AC,\"Quit\",AB)

Lbl AB
:Stop

Lbl AC
:ClrHome
:Disp \"Hi\"
:Pause \"\"
:ClrHome
:Disp \"Bye\"
:Pause \"\"
:Goto AA";
        assert_eq!(generate(&structure).unwrap(), expected);
    }

    #[test]
    fn labels_follow_document_order() {
        let structure = app(vec![
            StructureNode::menu(
                "item-1",
                "Sub",
                vec![Arc::new(StructureNode::note("item-2", "Inner", "x"))],
            ),
            StructureNode::note("item-3", "After", "y"),
        ]);
        let program = CompilerState::new().compile(&structure.root).unwrap();
        let Some(Page::Menu(root)) = program.page(program.root_label()) else {
            panic!("root page is not a menu");
        };
        let targets: Vec<(String, String)> = root
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.target.to_string()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("Sub".to_string(), "AC".to_string()),
                ("After".to_string(), "AE".to_string())
            ]
        );

        let text = program.render();
        assert!(text.contains("Lbl AC\n:ClrHome\n:Menu(\"Sub\",\"Inner\",AD,\"Back\",AA)"));
        assert!(text.contains("Lbl AD\n:ClrHome\n:Disp \"x\"\n:Pause \"\"\n:Goto AC"));
    }

    #[test]
    fn screen_overflow_inserts_pause_without_clear() {
        let mut structure = app(vec![StructureNode::note("item-1", "Long", "a\nb\nc")]);
        structure.settings.lines_per_screen = 2;
        let text = generate(&structure).unwrap();
        assert!(text.ends_with(
            "Lbl AC\n:ClrHome\n:Disp \"a\"\n:Disp \"b\"\n:Pause \"\"\n:Disp \"c\"\n:Pause \"\"\n:Goto AA"
        ));
    }

    #[test]
    fn code_lines_get_instruction_marker() {
        let structure = app(vec![StructureNode::code(
            "item-1",
            "Run",
            "Disp 1\n\n:ClrHome\r\nOutput(1,1,\"X\")",
        )]);
        let text = generate(&structure).unwrap();
        assert!(text.ends_with(
            "Lbl AC\n:Disp 1\n:ClrHome\n:Output(1,1,\"X\")\n:Goto AA"
        ));
    }

    #[test]
    fn overflowing_children_are_dropped_and_siblings_continue() {
        let children: Vec<Arc<StructureNode>> = (0..9)
            .map(|i| Arc::new(StructureNode::note(format!("item-{}", i), format!("N{}", i), "x")))
            .collect();
        let structure = app(vec![
            StructureNode::menu("full", "Full", children),
            StructureNode::note("item-after", "After", "y"),
        ]);
        let program = CompilerState::new().compile(&structure.root).unwrap();

        let Some(Page::Menu(full)) = program.page("AC".parse().unwrap()) else {
            panic!("AC is not a menu");
        };
        assert_eq!(full.entries.len(), 8);
        assert_eq!(full.entries.last().unwrap().name, "N7");

        let Some(Page::Menu(root)) = program.page(program.root_label()) else {
            panic!("root page is not a menu");
        };
        assert_eq!(root.entries.len(), 2);
        assert_eq!(root.entries[1].name, "After");
    }

    #[test]
    fn label_space_exhaustion_is_fatal() {
        let mut node = StructureNode::note("leaf", "Leaf", "x");
        for depth in 0..700 {
            node = StructureNode::menu(format!("m{}", depth), "M", vec![Arc::new(node)]);
        }
        let structure = app(vec![node]);
        assert_eq!(
            generate(&structure),
            Err(GenerateError::CapacityExceeded { max: 676 })
        );
        assert!(generate_or_message(&structure).starts_with("Error generating code: Too many pages"));
    }

    #[test]
    fn non_menu_root_is_rejected() {
        let structure = AppStructure::new(
            Settings::default(),
            StructureNode::note(ROOT_ID, "Oops", "x"),
        );
        assert_eq!(generate(&structure), Err(GenerateError::InvalidRoot));
    }
}
