//! Per-row pipeline state
//!
//! `Pending → Validated → Resolved → {Committed | Rejected}`

use shared::models::Level;

use crate::db::AttrMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Pending,
    /// Passed field validation
    Validated,
    /// Every entity of the row located or created
    Resolved,
    Committed,
    Rejected,
}

/// Where the first entity of a row hangs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Owned by the restaurant
    Owner,
    /// Child of the `parent_level` entity resolved for another row
    /// (variant rows under their item row)
    ParentRow { row: usize, parent_level: Level },
    /// Existing entity named by ID (mapping rows under their menu item)
    Existing {
        level: Level,
        id: i64,
        column: &'static str,
    },
    /// Explicit ID given without parent columns: stay where it is
    Keep,
    /// Variant row whose item row has not been located yet
    Unlinked,
}

/// Parent-token discriminator (`i<token>` / `v<token>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentToken {
    Item(String),
    Variant(String),
}

/// What one row asks of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDraft {
    pub level: Level,
    pub id: Option<i64>,
    pub id_column: &'static str,
    pub name: Option<String>,
    pub name_column: &'static str,
    /// Only the attributes the row specified
    pub attrs: AttrMap,
    /// Only ever set on the row's leaf entity
    pub is_deleted: Option<bool>,
}

impl EntityDraft {
    pub fn new(level: Level, id_column: &'static str, name_column: &'static str) -> Self {
        Self {
            level,
            id: None,
            id_column,
            name: None,
            name_column,
            attrs: AttrMap::new(),
            is_deleted: None,
        }
    }

    pub fn with_id(mut self, id: Option<i64>) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn set_attr(&mut self, key: &str, value: Option<impl Into<serde_json::Value>>) {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), v.into());
        }
    }

    /// Column to blame for identity problems
    pub fn key_column(&self) -> &'static str {
        if self.id.is_some() {
            self.id_column
        } else {
            self.name_column
        }
    }
}

/// Entity referenced but not modified by a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub level: Level,
    pub id: i64,
    pub column: &'static str,
}

/// Typed form of one raw row
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub owner_id: i64,
    pub token: Option<ParentToken>,
    pub anchor: Anchor,
    /// Parent-to-child
    pub drafts: Vec<EntityDraft>,
    pub references: Vec<Reference>,
}

impl NormalizedRow {
    pub fn new(owner_id: i64, anchor: Anchor) -> Self {
        Self {
            owner_id,
            token: None,
            anchor,
            drafts: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn draft(&self, level: Level) -> Option<&EntityDraft> {
        self.drafts.iter().find(|d| d.level == level)
    }

    /// Position of the draft for `level` within the chain
    pub fn position(&self, level: Level) -> Option<usize> {
        self.drafts.iter().position(|d| d.level == level)
    }
}

/// One row moving through the pipeline
#[derive(Debug, Clone)]
pub struct RowRecord {
    pub index: usize,
    pub state: RowState,
    pub row: Option<NormalizedRow>,
    /// Arena index resolved per level
    pub resolved: Vec<(Level, usize)>,
}

impl RowRecord {
    pub fn pending(index: usize) -> Self {
        Self {
            index,
            state: RowState::Pending,
            row: None,
            resolved: Vec::new(),
        }
    }

    pub fn validated(&mut self, row: NormalizedRow) {
        debug_assert_eq!(self.state, RowState::Pending);
        self.row = Some(row);
        self.state = RowState::Validated;
    }

    pub fn reject(&mut self) {
        self.state = RowState::Rejected;
    }

    pub fn mark_resolved(&mut self) {
        if self.state == RowState::Validated {
            self.state = RowState::Resolved;
        }
    }

    pub fn mark_committed(&mut self) {
        if self.state == RowState::Resolved {
            self.state = RowState::Committed;
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.state == RowState::Rejected
    }

    /// Validated or resolved, not rejected
    pub fn is_active(&self) -> bool {
        matches!(self.state, RowState::Validated | RowState::Resolved)
    }

    pub fn resolved_at(&self, level: Level) -> Option<usize> {
        self.resolved
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, idx)| *idx)
    }
}
