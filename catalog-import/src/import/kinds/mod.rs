//! Row shapers, one per import kind
//!
//! A shaper turns the coerced cells of one row into a [`NormalizedRow`]:
//! the chain of entity drafts the row describes, parent-to-child.

pub mod addon;
pub mod mapping;
pub mod menu;

use shared::models::ImportKind;

use super::cells::Cells;
use super::row::NormalizedRow;

/// Shape one row; `None` when any cell was rejected (issues stay on `cells`)
pub fn shape(kind: ImportKind, cells: &mut Cells<'_>) -> Option<NormalizedRow> {
    let row = match kind {
        ImportKind::Menu => menu::shape(cells),
        ImportKind::Addon => addon::shape(cells),
        ImportKind::ItemAddonGroup => mapping::shape(cells),
    };
    if cells.has_issues() { None } else { row }
}

/// Check `min_selection <= max_selection` when both are given
pub(crate) fn check_selection_bounds(cells: &mut Cells<'_>, min: Option<i64>, max: Option<i64>) {
    if let (Some(min), Some(max)) = (min, max)
        && max < min
    {
        let details = format!("max_selection ({max}) must be >= min_selection ({min})");
        cells.reject("max_selection", shared::models::ErrorKind::OutOfRange, details);
    }
}
