//! Error types for generation, parsing and tree edits

use crate::label::Label;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Too many pages: exceeded {max} unique labels.")]
    CapacityExceeded { max: usize },

    #[error("Menu {label} cannot have more than {max} options (incl. navigation)")]
    MenuOverflow { label: Label, max: usize },

    #[error("Parent {0} is not a valid menu")]
    InvalidParent(Label),

    #[error("The root of the app structure must be a menu")]
    InvalidRoot,
}

impl GenerateError {
    /// Fatal errors abort the whole pass; the rest only drop one menu entry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenerateError::CapacityExceeded { .. } | GenerateError::InvalidRoot
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Root menu not found")]
    RootMenuNotFound,

    #[error("Label {0} is referenced but never defined")]
    UnresolvedLabel(Label),

    #[error("Menu {0} is reachable from itself")]
    CyclicMenu(Label),

    #[error("Menu {0} is listed under more than one entry")]
    SharedMenu(Label),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {0} is not a menu")]
    NotAMenu(String),

    #[error("Menu {0} has no content to edit")]
    NoContent(String),

    #[error("Maximum items ({max}) reached for menu {id}")]
    MenuFull { id: String, max: usize },

    #[error("The root menu cannot be moved or deleted")]
    RootImmovable,

    #[error("Cannot place {dragged} {position} {target}")]
    IllegalPlacement {
        dragged: String,
        target: String,
        position: String,
    },
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;
