//! Menu hierarchy rows
//!
//! Item rows (`parent = i<token>`) carry Main Category → Sub Category →
//! Menu Item. Variant rows (`parent = v<token>`) carry Variant Group →
//! Variant and hang under the item row with the same token.

use shared::models::{ErrorKind, Level};

use crate::import::cells::Cells;
use crate::import::row::{Anchor, EntityDraft, NormalizedRow, ParentToken};
use crate::import::schema::VEG_EGG_NON;
use crate::import::slots::{self, WEEKLY_SLOTS};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_PRICE, MAX_SHORT_TEXT_LEN, MAX_TAX_RATE,
};

/// Upper bound for `serves`
const MAX_SERVES: i64 = 100;

/// Name of the implicit default sub-category
pub const DEFAULT_SUB_CATEGORY: &str = "";

pub fn parse_token(raw: &str) -> Option<ParentToken> {
    let mut chars = raw.chars();
    let prefix = chars.next()?.to_ascii_lowercase();
    let token = chars.as_str();
    if token.is_empty()
        || token.len() > MAX_SHORT_TEXT_LEN
        || !token.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    match prefix {
        'i' => Some(ParentToken::Item(token.to_string())),
        'v' => Some(ParentToken::Variant(token.to_string())),
        _ => None,
    }
}

pub fn shape(cells: &mut Cells<'_>) -> Option<NormalizedRow> {
    let owner_id = cells.required_id("restaurant_id");
    let is_deleted = cells.boolean("is_deleted");

    let raw_token = cells.get("parent");
    let token = if raw_token.is_empty() {
        cells.require("parent");
        None
    } else {
        let token = parse_token(raw_token);
        if token.is_none() {
            let details = format!("'{raw_token}' must look like i<token> or v<token>");
            cells.reject("parent", ErrorKind::InvalidParent, details);
        }
        token
    };

    let mut row = match token.as_ref()? {
        ParentToken::Item(_) => shape_item(cells, owner_id?, is_deleted)?,
        ParentToken::Variant(_) => shape_variant(cells, owner_id?, is_deleted)?,
    };
    row.token = token;
    Some(row)
}

fn shape_item(
    cells: &mut Cells<'_>,
    owner_id: i64,
    is_deleted: Option<bool>,
) -> Option<NormalizedRow> {
    let main_given = !cells.is_blank("main_category_id") || !cells.is_blank("main_category_name");
    let sub_given = !cells.is_blank("sub_category_id") || !cells.is_blank("sub_category_name");
    let item_id_given = !cells.is_blank("menu_item_id");

    let main_id = cells.id("main_category_id");
    let main_name = cells.text("main_category_name", MAX_NAME_LEN);
    let sub_id = cells.id("sub_category_id");
    let sub_name = cells.text("sub_category_name", MAX_NAME_LEN);
    let item_id = cells.id("menu_item_id");

    // New items need a full placement; existing ones may be addressed by ID alone
    if !main_given && (!item_id_given || sub_given) {
        cells.require("main_category_name");
    }
    let item_name = if item_id_given {
        cells.text("menu_item_name", MAX_NAME_LEN)
    } else {
        cells.required_text("menu_item_name", MAX_NAME_LEN)
    };
    let price = if item_id_given {
        cells.money("price", MAX_PRICE)
    } else {
        cells.required_money("price", MAX_PRICE)
    };
    let veg = if item_id_given {
        cells.choice("veg_egg_non", VEG_EGG_NON)
    } else {
        cells.required_choice("veg_egg_non", VEG_EGG_NON)
    };

    let mut item = EntityDraft::new(Level::MenuItem, "menu_item_id", "menu_item_name")
        .with_id(item_id)
        .with_name(item_name);
    item.set_attr("description", cells.text("description", MAX_NOTE_LEN));
    item.set_attr("price", price);
    item.set_attr("veg_egg_non", veg);
    item.set_attr("packing_charges", cells.money("packing_charges", MAX_PRICE));
    item.set_attr("in_stock", cells.boolean("in_stock"));
    item.set_attr("is_spicy", cells.boolean("is_spicy"));
    item.set_attr("serves", cells.int("serves", 1, MAX_SERVES));
    item.set_attr("gst_rate", cells.money("gst_rate", MAX_TAX_RATE));
    item.set_attr("external_id", cells.text("external_id", MAX_SHORT_TEXT_LEN));
    item.set_attr(WEEKLY_SLOTS, slots::read_slots(cells).map(|s| slots::slots_to_value(&s)));
    item.is_deleted = is_deleted;

    if cells.has_issues() {
        return None;
    }

    let anchor = if main_given { Anchor::Owner } else { Anchor::Keep };
    let mut row = NormalizedRow::new(owner_id, anchor);
    if main_given {
        row.drafts.push(
            EntityDraft::new(Level::MainCategory, "main_category_id", "main_category_name")
                .with_id(main_id)
                .with_name(main_name),
        );
        let sub = EntityDraft::new(Level::SubCategory, "sub_category_id", "sub_category_name");
        row.drafts.push(if sub_given {
            sub.with_id(sub_id).with_name(sub_name)
        } else {
            sub.with_name(Some(DEFAULT_SUB_CATEGORY.to_string()))
        });
    }
    row.drafts.push(item);
    Some(row)
}

fn shape_variant(
    cells: &mut Cells<'_>,
    owner_id: i64,
    is_deleted: Option<bool>,
) -> Option<NormalizedRow> {
    let group_id_given = !cells.is_blank("variant_group_id");
    let variant_id_given = !cells.is_blank("variant_id");

    let group_id = cells.id("variant_group_id");
    let group_name = if group_id_given {
        cells.text("variant_group_name", MAX_NAME_LEN)
    } else {
        cells.required_text("variant_group_name", MAX_NAME_LEN)
    };
    let variant_id = cells.id("variant_id");
    let variant_name = if variant_id_given {
        cells.text("variant_name", MAX_NAME_LEN)
    } else {
        cells.required_text("variant_name", MAX_NAME_LEN)
    };
    let price = if variant_id_given {
        cells.money("variant_price", MAX_PRICE)
    } else {
        cells.required_money("variant_price", MAX_PRICE)
    };

    let mut variant = EntityDraft::new(Level::Variant, "variant_id", "variant_name")
        .with_id(variant_id)
        .with_name(variant_name);
    variant.set_attr("price", price);
    variant.set_attr("is_default", cells.boolean("variant_is_default"));
    variant.set_attr("in_stock", cells.boolean("variant_in_stock"));
    variant.is_deleted = is_deleted;

    if cells.has_issues() {
        return None;
    }

    let mut row = NormalizedRow::new(owner_id, Anchor::Unlinked);
    row.drafts.push(
        EntityDraft::new(Level::VariantGroup, "variant_group_id", "variant_group_name")
            .with_id(group_id)
            .with_name(group_name),
    );
    row.drafts.push(variant);
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::RawRow;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("i1"), Some(ParentToken::Item("1".into())));
        assert_eq!(parse_token("V12"), Some(ParentToken::Variant("12".into())));
        assert_eq!(parse_token("i"), None);
        assert_eq!(parse_token("x1"), None);
        assert_eq!(parse_token("i 1"), None);
    }

    #[test]
    fn test_item_row_builds_category_chain() {
        let raw = row(&[
            ("restaurant_id", "1"),
            ("parent", "i1"),
            ("main_category_name", "Drinks"),
            ("menu_item_name", "Cola"),
            ("price", "50"),
            ("veg_egg_non", "veg"),
        ]);
        let mut cells = Cells::new(&raw);
        let shaped = shape(&mut cells).unwrap();

        assert_eq!(shaped.anchor, Anchor::Owner);
        let levels: Vec<Level> = shaped.drafts.iter().map(|d| d.level).collect();
        assert_eq!(levels, vec![Level::MainCategory, Level::SubCategory, Level::MenuItem]);
        assert_eq!(shaped.drafts[1].name.as_deref(), Some(DEFAULT_SUB_CATEGORY));

        let item = &shaped.drafts[2];
        assert_eq!(item.attrs["price"], json!("50"));
        assert_eq!(item.attrs["veg_egg_non"], json!("veg"));
        assert!(!item.attrs.contains_key("in_stock"));
        assert!(!item.attrs.contains_key(WEEKLY_SLOTS));
    }

    #[test]
    fn test_item_by_id_keeps_placement() {
        let raw = row(&[
            ("restaurant_id", "1"),
            ("parent", "i2"),
            ("menu_item_id", "77"),
            ("menu_item_name", "Cola Zero"),
        ]);
        let mut cells = Cells::new(&raw);
        let shaped = shape(&mut cells).unwrap();
        assert_eq!(shaped.anchor, Anchor::Keep);
        assert_eq!(shaped.drafts.len(), 1);
        assert_eq!(shaped.drafts[0].id, Some(77));
    }

    #[test]
    fn test_new_item_requires_fields() {
        let raw = row(&[("restaurant_id", "1"), ("parent", "i1")]);
        let mut cells = Cells::new(&raw);
        assert!(shape(&mut cells).is_none());
        let columns: Vec<String> = cells.into_issues().into_iter().map(|i| i.column_name).collect();
        assert_eq!(
            columns,
            vec!["main_category_name", "menu_item_name", "price", "veg_egg_non"]
        );
    }

    #[test]
    fn test_variant_row() {
        let raw = row(&[
            ("restaurant_id", "1"),
            ("parent", "v1"),
            ("variant_group_name", "Size"),
            ("variant_name", "Large"),
            ("variant_price", "70"),
            ("variant_is_default", "1"),
        ]);
        let mut cells = Cells::new(&raw);
        let shaped = shape(&mut cells).unwrap();
        assert_eq!(shaped.token, Some(ParentToken::Variant("1".into())));
        assert_eq!(shaped.anchor, Anchor::Unlinked);
        assert_eq!(shaped.drafts[1].attrs["is_default"], json!(true));
    }

    #[test]
    fn test_bad_parent_token() {
        let raw = row(&[("restaurant_id", "1"), ("parent", "item1")]);
        let mut cells = Cells::new(&raw);
        assert!(shape(&mut cells).is_none());
        assert_eq!(cells.into_issues()[0].error_kind, ErrorKind::InvalidParent);
    }
}
