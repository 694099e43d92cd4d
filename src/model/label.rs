use serde::{Deserialize, Serialize};

use super::project::ProjectId;

pub type LabelId = i64;
pub type RelationTypeId = i64;

/// A coloured label scoped to one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub project_id: ProjectId,
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
}

/// How a parent relates to a child (e.g. "blocks" / "blocked by")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationType {
    pub id: RelationTypeId,
    /// Label read from the parent's side
    pub parent_to_child: String,
    /// Label read from the child's side
    pub child_to_parent: String,
    pub color: String,
    /// Blocking relations mark the child as blocked on the board
    pub is_blocking: bool,
}

/// The relation type assigned when none was chosen explicitly
pub const DEFAULT_RELATION_TYPE: RelationTypeId = 1;
