use crate::error::{TreeError, TreeResult};
use crate::types::{AppStructure, NodeBody, NodeKind, Settings, StructureNode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropPosition::Before => "before",
            DropPosition::After => "after",
            DropPosition::Inside => "inside",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub parent: Arc<StructureNode>,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub fn find_node<'a>(node: &'a Arc<StructureNode>, id: &str) -> Option<&'a Arc<StructureNode>> {
    if node.id == id {
        return Some(node);
    }
    node.children().iter().find_map(|child| find_node(child, id))
}

pub fn find_parent<'a>(
    node: &'a Arc<StructureNode>,
    id: &str,
) -> Option<(&'a Arc<StructureNode>, usize)> {
    for (index, child) in node.children().iter().enumerate() {
        if child.id == id {
            return Some((node, index));
        }
        if let Some(found) = find_parent(child, id) {
            return Some(found);
        }
    }
    None
}

/// Removes `id` from the tree. The root itself cannot be extracted; an
/// unknown id returns the same tree and `None`.
pub fn extract(
    root: &Arc<StructureNode>,
    id: &str,
) -> (Arc<StructureNode>, Option<Arc<StructureNode>>) {
    match strip(root, id) {
        Some((tree, removed)) => (Arc::new(tree), Some(removed)),
        None => (Arc::clone(root), None),
    }
}

fn strip(node: &StructureNode, id: &str) -> Option<(StructureNode, Arc<StructureNode>)> {
    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        if child.id == id {
            let mut next = children.to_vec();
            let removed = next.remove(i);
            return Some((node.with_children(next), removed));
        }
        if let Some((new_child, removed)) = strip(child, id) {
            let mut next = children.to_vec();
            next[i] = Arc::new(new_child);
            return Some((node.with_children(next), removed));
        }
    }
    None
}

pub fn insert(
    root: &Arc<StructureNode>,
    parent_id: &str,
    index: usize,
    item: Arc<StructureNode>,
) -> TreeResult<Arc<StructureNode>> {
    let mut item = Some(item);
    edit_at(root, parent_id, &mut |parent: &StructureNode| {
        let NodeBody::Menu { children } = &parent.body else {
            return Err(TreeError::NotAMenu(parent.id.clone()));
        };
        let mut next = children.clone();
        if let Some(item) = item.take() {
            next.insert(index.min(next.len()), item);
        }
        Ok(parent.with_children(next))
    })?
    .ok_or_else(|| TreeError::NodeNotFound(parent_id.to_string()))
}

pub fn update_item(
    root: &Arc<StructureNode>,
    id: &str,
    update: &NodeUpdate,
) -> TreeResult<Arc<StructureNode>> {
    edit_at(root, id, &mut |node: &StructureNode| {
        let mut next = node.clone();
        if let Some(title) = &update.title {
            next.title = title.clone();
        }
        if let Some(new_content) = &update.content {
            match &mut next.body {
                NodeBody::Note { content } | NodeBody::Code { content } => {
                    *content = new_content.clone();
                }
                NodeBody::Menu { .. } => return Err(TreeError::NoContent(node.id.clone())),
            }
        }
        Ok(next)
    })?
    .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
}

/// Replaces node `id` with `edit(node)`, copying its ancestors. `Ok(None)`
/// when `id` is not in this subtree.
fn edit_at<F>(
    node: &Arc<StructureNode>,
    id: &str,
    edit: &mut F,
) -> TreeResult<Option<Arc<StructureNode>>>
where
    F: FnMut(&StructureNode) -> TreeResult<StructureNode>,
{
    if node.id == id {
        return edit(node.as_ref()).map(|n| Some(Arc::new(n)));
    }
    for (i, child) in node.children().iter().enumerate() {
        if let Some(new_child) = edit_at(child, id, edit)? {
            let mut children = node.children().to_vec();
            children[i] = new_child;
            return Ok(Some(Arc::new(node.with_children(children))));
        }
    }
    Ok(None)
}

/// Decides whether `dragged_id` may be dropped relative to `target_id`.
///
/// `Inside` needs a menu target with room; `Before`/`After` go into the
/// target's parent, which needs room unless the dragged node is already one
/// of its children. Dropping a node onto itself or into its own subtree is
/// rejected.
pub fn resolve_placement(
    root: &Arc<StructureNode>,
    dragged_id: &str,
    target_id: &str,
    position: DropPosition,
    max_items_per_menu: usize,
) -> Option<Placement> {
    if dragged_id == target_id {
        return None;
    }
    if let Some(dragged) = find_node(root, dragged_id) {
        if find_node(dragged, target_id).is_some() {
            return None;
        }
    }
    locate(root, dragged_id, target_id, position, max_items_per_menu)
}

fn locate(
    node: &Arc<StructureNode>,
    dragged_id: &str,
    target_id: &str,
    position: DropPosition,
    max_items: usize,
) -> Option<Placement> {
    if node.id == target_id && position == DropPosition::Inside {
        return place_inside(node, dragged_id, max_items);
    }

    for (i, child) in node.children().iter().enumerate() {
        if child.id == target_id {
            if position == DropPosition::Inside {
                return place_inside(child, dragged_id, max_items);
            }
            if !has_room(node, dragged_id, max_items) {
                return None;
            }
            let index = if position == DropPosition::Before { i } else { i + 1 };
            return Some(Placement {
                parent: Arc::clone(node),
                index,
            });
        }
        if let Some(found) = locate(child, dragged_id, target_id, position, max_items) {
            return Some(found);
        }
    }
    None
}

fn place_inside(menu: &Arc<StructureNode>, dragged_id: &str, max_items: usize) -> Option<Placement> {
    if !menu.is_menu() || !has_room(menu, dragged_id, max_items) {
        return None;
    }
    Some(Placement {
        parent: Arc::clone(menu),
        index: menu.children().len(),
    })
}

fn has_room(menu: &StructureNode, dragged_id: &str, max_items: usize) -> bool {
    let children = menu.children();
    children.len() < max_items || children.iter().any(|c| c.id == dragged_id)
}

impl AppStructure {
    pub fn add_item(&self, parent_id: &str, kind: NodeKind) -> TreeResult<(AppStructure, String)> {
        let parent = find_node(&self.root, parent_id)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.to_string()))?;
        if !parent.is_menu() {
            return Err(TreeError::NotAMenu(parent_id.to_string()));
        }
        let max = self.settings.max_items_per_menu;
        if parent.children().len() >= max {
            return Err(TreeError::MenuFull {
                id: parent_id.to_string(),
                max,
            });
        }

        let id = format!("item-{}", self.next_id);
        let item = match kind {
            NodeKind::Menu => StructureNode::menu(id.as_str(), "New Submenu", vec![]),
            NodeKind::Note => {
                StructureNode::note(id.as_str(), "New Note", "Enter note content here...")
            }
            NodeKind::Code => StructureNode::code(id.as_str(), "New Code Block", ""),
        };
        let root = insert(&self.root, parent_id, usize::MAX, Arc::new(item))?;

        Ok((
            AppStructure {
                settings: self.settings,
                root,
                next_id: self.next_id + 1,
            },
            id,
        ))
    }

    pub fn delete_item(&self, id: &str) -> TreeResult<AppStructure> {
        if self.root.id == id {
            return Err(TreeError::RootImmovable);
        }
        match extract(&self.root, id) {
            (root, Some(_)) => Ok(self.with_root(root)),
            (_, None) => Err(TreeError::NodeNotFound(id.to_string())),
        }
    }

    pub fn update_item(&self, id: &str, update: &NodeUpdate) -> TreeResult<AppStructure> {
        update_item(&self.root, id, update).map(|root| self.with_root(root))
    }

    /// Drag-and-drop move. Either the whole move applies or an error is
    /// returned and `self` stays the current structure.
    pub fn move_item(
        &self,
        dragged_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> TreeResult<AppStructure> {
        if self.root.id == dragged_id {
            return Err(TreeError::RootImmovable);
        }
        for id in [dragged_id, target_id] {
            if find_node(&self.root, id).is_none() {
                return Err(TreeError::NodeNotFound(id.to_string()));
            }
        }
        let illegal = || TreeError::IllegalPlacement {
            dragged: dragged_id.to_string(),
            target: target_id.to_string(),
            position: position.to_string(),
        };
        let max = self.settings.max_items_per_menu;

        resolve_placement(&self.root, dragged_id, target_id, position, max).ok_or_else(illegal)?;
        let (without, moved) = extract(&self.root, dragged_id);
        let moved = moved.ok_or_else(|| TreeError::NodeNotFound(dragged_id.to_string()))?;
        // indices shift once the dragged node is gone
        let placement =
            resolve_placement(&without, dragged_id, target_id, position, max).ok_or_else(illegal)?;
        let root = insert(&without, &placement.parent.id, placement.index, moved)?;
        Ok(self.with_root(root))
    }

    pub fn with_settings(&self, settings: Settings) -> AppStructure {
        AppStructure {
            settings,
            root: Arc::clone(&self.root),
            next_id: self.next_id,
        }
    }

    fn with_root(&self, root: Arc<StructureNode>) -> AppStructure {
        AppStructure {
            settings: self.settings,
            root,
            next_id: self.next_id,
        }
    }
}
