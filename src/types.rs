use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Menu,
    Note,
    Code,
}

/// One entry of the app structure. Nodes are never edited in place: every
/// edit in [`crate::tree`] rebuilds the path to the changed node and shares
/// the rest through `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub body: NodeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeBody {
    Menu {
        #[serde(default)]
        children: Vec<Arc<StructureNode>>,
    },
    Note {
        #[serde(default, deserialize_with = "null_as_empty")]
        content: String,
    },
    Code {
        #[serde(default, deserialize_with = "null_as_empty")]
        content: String,
    },
}

// Hosts store `content: null` on freshly added code blocks.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl StructureNode {
    pub fn menu(
        id: impl Into<String>,
        title: impl Into<String>,
        children: Vec<Arc<StructureNode>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: NodeBody::Menu { children },
        }
    }

    pub fn note(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: NodeBody::Note {
                content: content.into(),
            },
        }
    }

    pub fn code(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: NodeBody::Code {
                content: content.into(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Menu { .. } => NodeKind::Menu,
            NodeBody::Note { .. } => NodeKind::Note,
            NodeBody::Code { .. } => NodeKind::Code,
        }
    }

    pub fn is_menu(&self) -> bool {
        matches!(self.body, NodeBody::Menu { .. })
    }

    /// Children in display order; empty for notes and code blocks.
    pub fn children(&self) -> &[Arc<StructureNode>] {
        match &self.body {
            NodeBody::Menu { children } => children,
            _ => &[],
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Note { content } | NodeBody::Code { content } => Some(content),
            NodeBody::Menu { .. } => None,
        }
    }

    /// Copy of this node with `children` swapped in. Non-menus are returned as is.
    pub fn with_children(&self, children: Vec<Arc<StructureNode>>) -> Self {
        match &self.body {
            NodeBody::Menu { .. } => Self {
                id: self.id.clone(),
                title: self.title.clone(),
                body: NodeBody::Menu { children },
            },
            _ => self.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chars_per_line: usize,
    pub lines_per_screen: usize,
    pub max_items_per_menu: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chars_per_line: 26,
            lines_per_screen: 9,
            max_items_per_menu: 8,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// The persisted document: settings, the structure tree and the id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStructure {
    #[serde(flatten)]
    pub settings: Settings,
    pub root: Arc<StructureNode>,
    #[serde(rename = "nextId", default = "default_next_id")]
    pub next_id: u64,
}

fn default_next_id() -> u64 {
    1
}

impl Default for AppStructure {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            root: Arc::new(StructureNode::menu(ROOT_ID, "Main Menu", vec![])),
            next_id: 1,
        }
    }
}

impl AppStructure {
    pub fn new(settings: Settings, root: StructureNode) -> Self {
        Self {
            settings,
            root: Arc::new(root),
            next_id: 1,
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
