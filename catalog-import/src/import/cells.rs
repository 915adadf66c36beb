//! Cell coercion for one raw row
//!
//! Every accessor trims the cell, treats blank as "not specified" and
//! records a [`RowIssue`] on failure instead of returning early, so one
//! pass reports every bad column of the row.

use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{ErrorKind, RawRow, RowIssue};

use crate::utils::validation::{self, Rejection};

pub struct Cells<'a> {
    raw: &'a RawRow,
    issues: Vec<RowIssue>,
}

impl<'a> Cells<'a> {
    pub fn new(raw: &'a RawRow) -> Self {
        Self {
            raw,
            issues: Vec::new(),
        }
    }

    /// Trimmed cell text ("" when absent)
    pub fn get(&self, column: &str) -> &'a str {
        self.raw.get(column).map(|v| v.trim()).unwrap_or("")
    }

    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).is_empty()
    }

    pub fn reject(&mut self, column: &str, kind: ErrorKind, details: impl Into<String>) {
        self.issues.push(RowIssue::new(column, kind, details));
    }

    pub fn require(&mut self, column: &str) {
        self.reject(column, ErrorKind::Required, format!("{column} is required"));
    }

    fn check<T>(&mut self, column: &str, result: Result<T, Rejection>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err((kind, details)) => {
                self.reject(column, kind, details);
                None
            }
        }
    }

    pub fn text(&mut self, column: &str, max_len: usize) -> Option<String> {
        let raw = self.get(column);
        if raw.is_empty() {
            return None;
        }
        self.check(column, validation::validate_text_len(raw, max_len))?;
        Some(raw.to_string())
    }

    pub fn required_text(&mut self, column: &str, max_len: usize) -> Option<String> {
        if self.is_blank(column) {
            self.require(column);
            return None;
        }
        self.text(column, max_len)
    }

    /// Positive row ID
    pub fn id(&mut self, column: &str) -> Option<i64> {
        self.int(column, 1, i64::MAX)
    }

    pub fn required_id(&mut self, column: &str) -> Option<i64> {
        if self.is_blank(column) {
            self.require(column);
            return None;
        }
        self.id(column)
    }

    pub fn int(&mut self, column: &str, min: i64, max: i64) -> Option<i64> {
        let raw = self.get(column);
        if raw.is_empty() {
            return None;
        }
        self.check(column, validation::parse_bounded_int(raw, min, max))
    }

    /// Amount as its attribute value (canonical decimal string)
    pub fn money(&mut self, column: &str, max: Decimal) -> Option<Value> {
        let raw = self.get(column);
        if raw.is_empty() {
            return None;
        }
        self.check(column, validation::parse_money(raw, max))
            .map(validation::money_value)
    }

    pub fn required_money(&mut self, column: &str, max: Decimal) -> Option<Value> {
        if self.is_blank(column) {
            self.require(column);
            return None;
        }
        self.money(column, max)
    }

    /// `"0"` / `"1"`
    pub fn boolean(&mut self, column: &str) -> Option<bool> {
        match self.get(column) {
            "" => None,
            "1" => Some(true),
            "0" => Some(false),
            other => {
                let details = format!("expected 0 or 1, got '{other}'");
                self.reject(column, ErrorKind::InvalidBoolean, details);
                None
            }
        }
    }

    /// Case-insensitive enum, returned in canonical (lowercase) form
    pub fn choice(&mut self, column: &str, allowed: &[&str]) -> Option<String> {
        let raw = self.get(column);
        if raw.is_empty() {
            return None;
        }
        let lowered = raw.to_lowercase();
        match allowed.iter().find(|a| **a == lowered) {
            Some(value) => Some(value.to_string()),
            None => {
                let details = format!("'{raw}' is not one of {}", allowed.join(", "));
                self.reject(column, ErrorKind::InvalidEnum, details);
                None
            }
        }
    }

    pub fn required_choice(&mut self, column: &str, allowed: &[&str]) -> Option<String> {
        if self.is_blank(column) {
            self.require(column);
            return None;
        }
        self.choice(column, allowed)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn into_issues(self) -> Vec<RowIssue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_blank_is_not_specified() {
        let raw = row(&[("price", "  "), ("in_stock", "")]);
        let mut cells = Cells::new(&raw);
        assert_eq!(cells.money("price", Decimal::ONE_HUNDRED), None);
        assert_eq!(cells.boolean("in_stock"), None);
        assert!(!cells.has_issues());
    }

    #[test]
    fn test_money_is_canonical_text() {
        let raw = row(&[("price", "12.50"), ("packing_charges", "007")]);
        let mut cells = Cells::new(&raw);
        assert_eq!(cells.money("price", Decimal::ONE_HUNDRED), Some(Value::from("12.5")));
        assert_eq!(cells.money("packing_charges", Decimal::ONE_HUNDRED), Some(Value::from("7")));
    }

    #[test]
    fn test_issues_accumulate() {
        let raw = row(&[("price", "abc"), ("in_stock", "yes"), ("veg_egg_non", "Meat")]);
        let mut cells = Cells::new(&raw);
        cells.money("price", Decimal::ONE_HUNDRED);
        cells.boolean("in_stock");
        cells.choice("veg_egg_non", &["veg", "egg", "non-veg"]);
        cells.required_text("menu_item_name", 10);

        let kinds: Vec<ErrorKind> = cells.into_issues().iter().map(|i| i.error_kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::InvalidNumber,
                ErrorKind::InvalidBoolean,
                ErrorKind::InvalidEnum,
                ErrorKind::Required
            ]
        );
    }

    #[test]
    fn test_choice_is_case_insensitive() {
        let raw = row(&[("veg_egg_non", " Non-Veg ")]);
        let mut cells = Cells::new(&raw);
        assert_eq!(
            cells.choice("veg_egg_non", &["veg", "egg", "non-veg"]),
            Some("non-veg".to_string())
        );
    }

    #[test]
    fn test_id_must_be_positive() {
        let raw = row(&[("menu_item_id", "0")]);
        let mut cells = Cells::new(&raw);
        assert_eq!(cells.id("menu_item_id"), None);
        assert_eq!(cells.into_issues()[0].error_kind, ErrorKind::OutOfRange);
    }
}
