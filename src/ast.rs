use crate::label::Label;
use crate::paginate::NoteUnit;

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Menu(MenuPage),
    Note(NotePage),
    Code(CodePage),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuPage {
    pub title: String,
    pub entries: Vec<MenuEntry>,
    pub parent: Option<Label>, // None only for the root menu
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    pub name: String,
    pub target: Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotePage {
    pub units: Vec<NoteUnit>,
    pub parent: Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodePage {
    pub lines: Vec<String>, // raw, as typed in the editor
    pub parent: Label,
}
