//! Menu Item ↔ Addon Group mapping rows
//!
//! The natural key is `(menu_item_id, addon_group_id)`; both must name
//! live entities of the row's restaurant.

use shared::models::Level;

use super::check_selection_bounds;
use crate::import::cells::Cells;
use crate::import::row::{Anchor, EntityDraft, NormalizedRow, Reference};
use crate::utils::validation::MAX_SELECTION;

pub fn shape(cells: &mut Cells<'_>) -> Option<NormalizedRow> {
    let owner_id = cells.required_id("restaurant_id");
    let item_id = cells.required_id("menu_item_id");
    let group_id = cells.required_id("addon_group_id");
    let min = cells.int("min_selection", 0, MAX_SELECTION);
    let max = cells.int("max_selection", 0, MAX_SELECTION);
    check_selection_bounds(cells, min, max);
    let is_deleted = cells.boolean("is_deleted");

    if cells.has_issues() {
        return None;
    }
    let (owner_id, item_id, group_id) = (owner_id?, item_id?, group_id?);

    let mut mapping = EntityDraft::new(Level::ItemAddonGroup, "addon_group_id", "addon_group_id")
        .with_name(Some(group_id.to_string()));
    mapping.set_attr("min_selection", min);
    mapping.set_attr("max_selection", max);
    mapping.is_deleted = is_deleted;

    let anchor = Anchor::Existing {
        level: Level::MenuItem,
        id: item_id,
        column: "menu_item_id",
    };
    let mut row = NormalizedRow::new(owner_id, anchor);
    row.references.push(Reference {
        level: Level::AddonGroup,
        id: group_id,
        column: "addon_group_id",
    });
    row.drafts.push(mapping);
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ErrorKind, RawRow};

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_mapping_row() {
        let raw = row(&[
            ("restaurant_id", "1"),
            ("menu_item_id", "77"),
            ("addon_group_id", "9"),
            ("max_selection", "2"),
        ]);
        let mut cells = Cells::new(&raw);
        let shaped = shape(&mut cells).unwrap();
        assert_eq!(
            shaped.anchor,
            Anchor::Existing {
                level: Level::MenuItem,
                id: 77,
                column: "menu_item_id"
            }
        );
        assert_eq!(shaped.drafts[0].name.as_deref(), Some("9"));
        assert_eq!(shaped.references[0].id, 9);
    }

    #[test]
    fn test_mapping_requires_both_ids() {
        let raw = row(&[("restaurant_id", "1"), ("menu_item_id", "abc")]);
        let mut cells = Cells::new(&raw);
        assert!(shape(&mut cells).is_none());
        let kinds: Vec<ErrorKind> = cells.into_issues().iter().map(|i| i.error_kind).collect();
        assert_eq!(kinds, vec![ErrorKind::InvalidNumber, ErrorKind::Required]);
    }
}
