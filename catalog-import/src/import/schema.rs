//! Schema descriptors
//!
//! One [`LevelSchema`] per catalog level describes where its rows live,
//! what owns them, and which attributes take part in change detection.
//! One [`ImportSchema`] per upload kind lists the levels it resolves and
//! the exact header it expects.

use serde_json::Value;
use shared::models::{ImportKind, Level};

use super::slots;

/// Stored attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Text,
    /// Money / rate, held as a canonical decimal string
    Decimal,
    Int,
    Bool,
    /// Weekly availability slots, stored in their own table
    Slots,
}

/// Value given to an attribute when a new entity does not specify it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Null,
    Bool(bool),
    Zero,
    /// `"0"` amount
    ZeroAmount,
    EmptyText,
    EmptyList,
}

impl AttrDefault {
    pub fn value(self) -> Value {
        match self {
            AttrDefault::Null => Value::Null,
            AttrDefault::Bool(b) => Value::Bool(b),
            AttrDefault::Zero => Value::from(0),
            AttrDefault::ZeroAmount => Value::from("0"),
            AttrDefault::EmptyText => Value::String(String::new()),
            AttrDefault::EmptyList => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttrSpec {
    /// Stored column name
    pub name: &'static str,
    pub kind: AttrKind,
    pub default: AttrDefault,
}

const fn attr(name: &'static str, kind: AttrKind, default: AttrDefault) -> AttrSpec {
    AttrSpec {
        name,
        kind,
        default,
    }
}

/// Per-level descriptor
#[derive(Debug)]
pub struct LevelSchema {
    pub level: Level,
    /// Owning level, `None` when owned by the restaurant directly
    pub parent: Option<Level>,
    pub table: &'static str,
    /// Column holding the parent ID (`None` for top levels)
    pub parent_column: Option<&'static str>,
    /// Column holding the natural key
    pub name_column: &'static str,
    /// Natural key is a foreign ID rather than free text (mapping rows)
    pub name_is_id: bool,
    pub sequenced: bool,
    pub attributes: &'static [AttrSpec],
}

impl LevelSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttrSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes written to the level's own table
    pub fn column_attributes(&self) -> impl Iterator<Item = &AttrSpec> {
        self.attributes.iter().filter(|a| a.kind != AttrKind::Slots)
    }
}

// ==================== Levels ====================

static MAIN_CATEGORY: LevelSchema = LevelSchema {
    level: Level::MainCategory,
    parent: None,
    table: "main_category",
    parent_column: None,
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[],
};

static SUB_CATEGORY: LevelSchema = LevelSchema {
    level: Level::SubCategory,
    parent: Some(Level::MainCategory),
    table: "sub_category",
    parent_column: Some("main_category_id"),
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[],
};

static MENU_ITEM: LevelSchema = LevelSchema {
    level: Level::MenuItem,
    parent: Some(Level::SubCategory),
    table: "menu_item",
    parent_column: Some("sub_category_id"),
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[
        attr("description", AttrKind::Text, AttrDefault::EmptyText),
        attr("price", AttrKind::Decimal, AttrDefault::ZeroAmount),
        attr("veg_egg_non", AttrKind::Text, AttrDefault::Null),
        attr("packing_charges", AttrKind::Decimal, AttrDefault::ZeroAmount),
        attr("in_stock", AttrKind::Bool, AttrDefault::Bool(true)),
        attr("is_spicy", AttrKind::Bool, AttrDefault::Bool(false)),
        attr("serves", AttrKind::Int, AttrDefault::Null),
        attr("gst_rate", AttrKind::Decimal, AttrDefault::ZeroAmount),
        attr("external_id", AttrKind::Text, AttrDefault::Null),
        attr(slots::WEEKLY_SLOTS, AttrKind::Slots, AttrDefault::EmptyList),
    ],
};

static VARIANT_GROUP: LevelSchema = LevelSchema {
    level: Level::VariantGroup,
    parent: Some(Level::MenuItem),
    table: "variant_group",
    parent_column: Some("menu_item_id"),
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[],
};

static VARIANT: LevelSchema = LevelSchema {
    level: Level::Variant,
    parent: Some(Level::VariantGroup),
    table: "variant",
    parent_column: Some("variant_group_id"),
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[
        attr("price", AttrKind::Decimal, AttrDefault::ZeroAmount),
        attr("is_default", AttrKind::Bool, AttrDefault::Bool(false)),
        attr("in_stock", AttrKind::Bool, AttrDefault::Bool(true)),
    ],
};

static ADDON_GROUP: LevelSchema = LevelSchema {
    level: Level::AddonGroup,
    parent: None,
    table: "addon_group",
    parent_column: None,
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[
        attr("min_selection", AttrKind::Int, AttrDefault::Zero),
        attr("max_selection", AttrKind::Int, AttrDefault::Null),
    ],
};

static ADDON: LevelSchema = LevelSchema {
    level: Level::Addon,
    parent: Some(Level::AddonGroup),
    table: "addon",
    parent_column: Some("addon_group_id"),
    name_column: "name",
    name_is_id: false,
    sequenced: true,
    attributes: &[
        attr("price", AttrKind::Decimal, AttrDefault::ZeroAmount),
        attr("veg_egg_non", AttrKind::Text, AttrDefault::Null),
        attr("in_stock", AttrKind::Bool, AttrDefault::Bool(true)),
        attr("external_id", AttrKind::Text, AttrDefault::Null),
    ],
};

static ITEM_ADDON_GROUP: LevelSchema = LevelSchema {
    level: Level::ItemAddonGroup,
    parent: Some(Level::MenuItem),
    table: "item_addon_group",
    parent_column: Some("menu_item_id"),
    name_column: "addon_group_id",
    name_is_id: true,
    sequenced: false,
    attributes: &[
        attr("min_selection", AttrKind::Int, AttrDefault::Zero),
        attr("max_selection", AttrKind::Int, AttrDefault::Null),
    ],
};

pub fn level_schema(level: Level) -> &'static LevelSchema {
    match level {
        Level::MainCategory => &MAIN_CATEGORY,
        Level::SubCategory => &SUB_CATEGORY,
        Level::MenuItem => &MENU_ITEM,
        Level::VariantGroup => &VARIANT_GROUP,
        Level::Variant => &VARIANT,
        Level::AddonGroup => &ADDON_GROUP,
        Level::Addon => &ADDON,
        Level::ItemAddonGroup => &ITEM_ADDON_GROUP,
    }
}

// ==================== Import kinds ====================

pub const MENU_COLUMNS: &[&str] = &[
    "restaurant_id",
    "parent",
    "main_category_id",
    "main_category_name",
    "sub_category_id",
    "sub_category_name",
    "menu_item_id",
    "menu_item_name",
    "description",
    "price",
    "veg_egg_non",
    "packing_charges",
    "in_stock",
    "is_spicy",
    "serves",
    "gst_rate",
    "external_id",
    "variant_group_id",
    "variant_group_name",
    "variant_id",
    "variant_name",
    "variant_price",
    "variant_is_default",
    "variant_in_stock",
    "is_deleted",
];

pub const ADDON_COLUMNS: &[&str] = &[
    "restaurant_id",
    "addon_group_id",
    "addon_group_name",
    "min_selection",
    "max_selection",
    "addon_id",
    "addon_name",
    "price",
    "veg_egg_non",
    "in_stock",
    "external_id",
    "is_deleted",
];

pub const MAPPING_COLUMNS: &[&str] = &[
    "restaurant_id",
    "menu_item_id",
    "addon_group_id",
    "min_selection",
    "max_selection",
    "is_deleted",
];

/// Allowed `veg_egg_non` values
pub const VEG_EGG_NON: &[&str] = &["veg", "egg", "non-veg"];

/// Per-kind descriptor
#[derive(Debug)]
pub struct ImportSchema {
    pub kind: ImportKind,
    /// Levels resolved by this import, parent-to-child
    pub levels: &'static [Level],
    /// Levels loaded read-only for reference checks
    pub reference_levels: &'static [Level],
    /// Level whose IDs are reported to the search index
    pub notify_level: Level,
}

static MENU_IMPORT: ImportSchema = ImportSchema {
    kind: ImportKind::Menu,
    levels: &[
        Level::MainCategory,
        Level::SubCategory,
        Level::MenuItem,
        Level::VariantGroup,
        Level::Variant,
    ],
    reference_levels: &[],
    notify_level: Level::MenuItem,
};

static ADDON_IMPORT: ImportSchema = ImportSchema {
    kind: ImportKind::Addon,
    levels: &[Level::AddonGroup, Level::Addon],
    reference_levels: &[],
    notify_level: Level::Addon,
};

static MAPPING_IMPORT: ImportSchema = ImportSchema {
    kind: ImportKind::ItemAddonGroup,
    levels: &[Level::ItemAddonGroup],
    reference_levels: &[Level::MenuItem, Level::AddonGroup],
    notify_level: Level::MenuItem,
};

pub fn import_schema(kind: ImportKind) -> &'static ImportSchema {
    match kind {
        ImportKind::Menu => &MENU_IMPORT,
        ImportKind::Addon => &ADDON_IMPORT,
        ImportKind::ItemAddonGroup => &MAPPING_IMPORT,
    }
}

impl ImportSchema {
    /// Exact header expected for this kind, in template order
    pub fn columns(&self) -> Vec<String> {
        match self.kind {
            ImportKind::Menu => MENU_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(slots::slot_columns())
                .collect(),
            ImportKind::Addon => ADDON_COLUMNS.iter().map(|c| c.to_string()).collect(),
            ImportKind::ItemAddonGroup => MAPPING_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Every level read from the store before resolution
    pub fn snapshot_levels(&self) -> Vec<Level> {
        let mut levels = self.reference_levels.to_vec();
        levels.extend(self.levels.iter().copied());
        levels
    }

    pub fn resolves(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }
}

/// Header row for an import kind
pub fn template(kind: ImportKind) -> Vec<String> {
    import_schema(kind).columns()
}
