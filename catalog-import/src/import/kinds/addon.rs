//! Addon hierarchy rows: Addon Group → Addon
//!
//! A row without addon columns only touches its group.

use shared::models::Level;

use super::check_selection_bounds;
use crate::import::cells::Cells;
use crate::import::row::{Anchor, EntityDraft, NormalizedRow};
use crate::import::schema::VEG_EGG_NON;
use crate::utils::validation::{MAX_NAME_LEN, MAX_PRICE, MAX_SELECTION, MAX_SHORT_TEXT_LEN};

/// Addon columns that only make sense with an addon
const ADDON_ONLY_COLUMNS: &[&str] = &["price", "veg_egg_non", "in_stock", "external_id"];

pub fn shape(cells: &mut Cells<'_>) -> Option<NormalizedRow> {
    let owner_id = cells.required_id("restaurant_id");
    let is_deleted = cells.boolean("is_deleted");

    let group_id_given = !cells.is_blank("addon_group_id");
    let group_id = cells.id("addon_group_id");
    let group_name = if group_id_given {
        cells.text("addon_group_name", MAX_NAME_LEN)
    } else {
        cells.required_text("addon_group_name", MAX_NAME_LEN)
    };
    let min = cells.int("min_selection", 0, MAX_SELECTION);
    let max = cells.int("max_selection", 0, MAX_SELECTION);
    check_selection_bounds(cells, min, max);

    let mut group = EntityDraft::new(Level::AddonGroup, "addon_group_id", "addon_group_name")
        .with_id(group_id)
        .with_name(group_name);
    group.set_attr("min_selection", min);
    group.set_attr("max_selection", max);

    let addon_given = !cells.is_blank("addon_id") || !cells.is_blank("addon_name");
    let addon = if addon_given {
        let addon_id_given = !cells.is_blank("addon_id");
        let addon_id = cells.id("addon_id");
        let addon_name = cells.text("addon_name", MAX_NAME_LEN);
        let price = if addon_id_given {
            cells.money("price", MAX_PRICE)
        } else {
            cells.required_money("price", MAX_PRICE)
        };

        let mut addon = EntityDraft::new(Level::Addon, "addon_id", "addon_name")
            .with_id(addon_id)
            .with_name(addon_name);
        addon.set_attr("price", price);
        addon.set_attr("veg_egg_non", cells.choice("veg_egg_non", VEG_EGG_NON));
        addon.set_attr("in_stock", cells.boolean("in_stock"));
        addon.set_attr("external_id", cells.text("external_id", MAX_SHORT_TEXT_LEN));
        addon.is_deleted = is_deleted;
        Some(addon)
    } else {
        if ADDON_ONLY_COLUMNS.iter().any(|c| !cells.is_blank(c)) {
            cells.require("addon_name");
        }
        group.is_deleted = is_deleted;
        None
    };

    if cells.has_issues() {
        return None;
    }

    let mut row = NormalizedRow::new(owner_id?, Anchor::Owner);
    row.drafts.push(group);
    row.drafts.extend(addon);
    Some(row)
}
