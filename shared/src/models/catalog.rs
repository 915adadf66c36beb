//! Catalog import wire types
//!
//! Request, summary and error-report shapes for the bulk catalog importer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// One uploaded data row: column name → raw cell text
pub type RawRow = HashMap<String, String>;

/// Which tabular schema an upload follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Main category → sub category → menu item → variant group → variant
    Menu,
    /// Addon group → addon
    Addon,
    /// Menu item ↔ addon group mapping
    ItemAddonGroup,
}

impl ImportKind {
    pub const ALL: [ImportKind; 3] = [Self::Menu, Self::Addon, Self::ItemAddonGroup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Addon => "addon",
            Self::ItemAddonGroup => "item_addon_group",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "menu" => Ok(Self::Menu),
            "addon" | "addons" => Ok(Self::Addon),
            "item_addon_group" | "mapping" => Ok(Self::ItemAddonGroup),
            other => Err(format!(
                "Unsupported import kind: '{other}'. Supported: menu, addon, item_addon_group"
            )),
        }
    }
}

/// Catalog hierarchy level
///
/// Variant order is parent-to-child within each import kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "Main_Category")]
    MainCategory,
    #[serde(rename = "Sub_Category")]
    SubCategory,
    #[serde(rename = "Menu_Item")]
    MenuItem,
    #[serde(rename = "Variant_Group")]
    VariantGroup,
    #[serde(rename = "Variant")]
    Variant,
    #[serde(rename = "Addon_Group")]
    AddonGroup,
    #[serde(rename = "Addon")]
    Addon,
    #[serde(rename = "Item_Addon_Group")]
    ItemAddonGroup,
}

impl Level {
    /// Label used in summaries and logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MainCategory => "Main_Category",
            Self::SubCategory => "Sub_Category",
            Self::MenuItem => "Menu_Item",
            Self::VariantGroup => "Variant_Group",
            Self::Variant => "Variant",
            Self::AddonGroup => "Addon_Group",
            Self::Addon => "Addon",
            Self::ItemAddonGroup => "Item_Addon_Group",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Import options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMode {
    /// Append/update without renumbering untouched siblings
    #[serde(default)]
    pub is_partial: bool,
}

/// Import request: rows in upload order plus options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub mode: ImportMode,
}

/// Per-level counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    #[serde(rename = "Created")]
    pub created: usize,
    #[serde(rename = "Modified")]
    pub modified: usize,
}

/// Successful import response
///
/// Levels without any change are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportSummary {
    pub levels: BTreeMap<Level, LevelSummary>,
}

impl ImportSummary {
    pub fn record_created(&mut self, level: Level) {
        self.levels.entry(level).or_default().created += 1;
    }

    pub fn record_modified(&mut self, level: Level) {
        self.levels.entry(level).or_default().modified += 1;
    }

    pub fn get(&self, level: Level) -> LevelSummary {
        self.levels.get(&level).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Kind of problem found in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "Required")]
    Required,
    #[serde(rename = "Invalid Number")]
    InvalidNumber,
    #[serde(rename = "Invalid Value")]
    InvalidEnum,
    #[serde(rename = "Invalid Boolean")]
    InvalidBoolean,
    #[serde(rename = "Invalid Time")]
    InvalidTime,
    #[serde(rename = "Out Of Range")]
    OutOfRange,
    #[serde(rename = "Too Long")]
    TooLong,
    #[serde(rename = "Slot Incomplete")]
    SlotIncomplete,
    #[serde(rename = "Invalid Slot Range")]
    SlotRange,
    #[serde(rename = "Slots Time Conflict")]
    SlotsTimeConflict,
    #[serde(rename = "Invalid Parent")]
    InvalidParent,
    #[serde(rename = "Duplicate Parent")]
    DuplicateParent,
    #[serde(rename = "Parent Not Found")]
    ParentNotFound,
    #[serde(rename = "Invalid Reference")]
    InvalidReference,
    #[serde(rename = "Multiple Updates")]
    MultipleUpdates,
    #[serde(rename = "Duplicate Name")]
    DuplicateName,
    #[serde(rename = "No Default")]
    NoDefault,
    #[serde(rename = "Multiple Defaults")]
    MultipleDefaults,
    #[serde(rename = "Mapping Conflict")]
    MappingConflict,
}

impl ErrorKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::InvalidNumber => "Invalid Number",
            Self::InvalidEnum => "Invalid Value",
            Self::InvalidBoolean => "Invalid Boolean",
            Self::InvalidTime => "Invalid Time",
            Self::OutOfRange => "Out Of Range",
            Self::TooLong => "Too Long",
            Self::SlotIncomplete => "Slot Incomplete",
            Self::SlotRange => "Invalid Slot Range",
            Self::SlotsTimeConflict => "Slots Time Conflict",
            Self::InvalidParent => "Invalid Parent",
            Self::DuplicateParent => "Duplicate Parent",
            Self::ParentNotFound => "Parent Not Found",
            Self::InvalidReference => "Invalid Reference",
            Self::MultipleUpdates => "Multiple Updates",
            Self::DuplicateName => "Duplicate Name",
            Self::NoDefault => "No Default",
            Self::MultipleDefaults => "Multiple Defaults",
            Self::MappingConflict => "Mapping Conflict",
        }
    }

    /// Batch-level findings raised after resolution (as opposed to per-field
    /// validation failures)
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::MultipleUpdates
                | Self::DuplicateName
                | Self::NoDefault
                | Self::MultipleDefaults
                | Self::MappingConflict
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One problem attached to a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub column_name: String,
    pub error_kind: ErrorKind,
    pub details: String,
}

impl RowIssue {
    pub fn new(column: impl Into<String>, kind: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            column_name: column.into(),
            error_kind: kind,
            details: details.into(),
        }
    }
}

/// Failed import response: row number (header-offset, 1-based) → issues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportErrorReport {
    pub errors: BTreeMap<usize, Vec<RowIssue>>,
}

impl ImportErrorReport {
    /// Attach an issue to the in-memory row index (reported as `index + 2`)
    pub fn push(&mut self, row_index: usize, issue: RowIssue) {
        self.errors.entry(row_index + 2).or_default().push(issue);
    }

    pub fn extend(&mut self, other: ImportErrorReport) {
        for (row, issues) in other.errors {
            self.errors.entry(row).or_default().extend(issues);
        }
    }

    /// Issues for an in-memory row index
    pub fn issues_for(&self, row_index: usize) -> &[RowIssue] {
        self.errors
            .get(&(row_index + 2))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_row(&self, row_index: usize) -> bool {
        self.errors.contains_key(&(row_index + 2))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of rows with at least one issue
    pub fn row_count(&self) -> usize {
        self.errors.len()
    }

    pub fn issue_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// True if any row carries an issue of this kind
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.errors
            .values()
            .flatten()
            .any(|issue| issue.error_kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_level_labels() {
        let mut summary = ImportSummary::default();
        summary.record_created(Level::MainCategory);
        summary.record_created(Level::MenuItem);
        summary.record_modified(Level::MenuItem);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Main_Category": {"Created": 1, "Modified": 0},
                "Menu_Item": {"Created": 1, "Modified": 1}
            })
        );
    }

    #[test]
    fn test_report_uses_header_offset_rows() {
        let mut report = ImportErrorReport::default();
        report.push(0, RowIssue::new("price", ErrorKind::InvalidNumber, "abc"));
        report.push(0, RowIssue::new("veg_egg_non", ErrorKind::InvalidEnum, "meat"));
        report.push(9, RowIssue::new("parent", ErrorKind::ParentNotFound, "v7"));

        assert_eq!(report.row_count(), 2);
        assert_eq!(report.issue_count(), 3);
        assert_eq!(report.issues_for(0).len(), 2);
        assert!(report.errors.contains_key(&2));
        assert!(report.errors.contains_key(&11));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errors"]["2"][0]["error_kind"], "Invalid Number");
        assert_eq!(json["errors"]["11"][0]["column_name"], "parent");
    }

    #[test]
    fn test_import_kind_parse() {
        assert_eq!("menu".parse::<ImportKind>(), Ok(ImportKind::Menu));
        assert_eq!("Addon".parse::<ImportKind>(), Ok(ImportKind::Addon));
        assert_eq!(
            "item_addon_group".parse::<ImportKind>(),
            Ok(ImportKind::ItemAddonGroup)
        );
        assert!("orders".parse::<ImportKind>().is_err());
    }
}
