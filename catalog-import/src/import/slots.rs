//! Weekly availability slots
//!
//! Up to three `(open, close)` pairs per weekday, 24h `HHMM` integers.
//! Within one weekday no two closed intervals may overlap.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::ErrorKind;

use super::cells::Cells;

/// Attribute key on Menu Items
pub const WEEKLY_SLOTS: &str = "weekly_slots";

pub const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

pub const SLOTS_PER_DAY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeeklySlot {
    /// 0 = Monday
    pub weekday: u8,
    /// 1..=3
    pub slot_num: u8,
    pub open_time: u16,
    pub close_time: u16,
}

impl WeeklySlot {
    fn overlaps(&self, other: &WeeklySlot) -> bool {
        self.weekday == other.weekday
            && self.open_time <= other.close_time
            && other.open_time <= self.close_time
    }
}

pub fn open_column(day: &str, slot_num: u8) -> String {
    format!("{day}_open_{slot_num}")
}

pub fn close_column(day: &str, slot_num: u8) -> String {
    format!("{day}_close_{slot_num}")
}

/// All slot columns in template order
pub fn slot_columns() -> Vec<String> {
    let mut columns = Vec::with_capacity(WEEKDAYS.len() * SLOTS_PER_DAY as usize * 2);
    for day in WEEKDAYS {
        for n in 1..=SLOTS_PER_DAY {
            columns.push(open_column(day, n));
            columns.push(close_column(day, n));
        }
    }
    columns
}

/// Parse `HHMM` (leading zeros optional: "900" == "0900")
pub fn parse_time(raw: &str) -> Option<u16> {
    if raw.is_empty() || raw.len() > 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u16 = raw.parse().ok()?;
    let (hours, minutes) = (value / 100, value % 100);
    (hours < 24 && minutes < 60).then_some(value)
}

pub fn format_time(value: u16) -> String {
    format!("{value:04}")
}

/// Read the 21 slot pairs of a row.
///
/// `None` when every slot column is blank (slots not specified). Otherwise
/// the complete, sorted slot set; problems are recorded on `cells`.
pub fn read_slots(cells: &mut Cells<'_>) -> Option<Vec<WeeklySlot>> {
    let specified = slot_columns().iter().any(|c| !cells.is_blank(c));
    if !specified {
        return None;
    }

    let mut slots = Vec::new();
    for (weekday, day) in WEEKDAYS.iter().enumerate() {
        let mut day_slots: Vec<WeeklySlot> = Vec::new();
        for slot_num in 1..=SLOTS_PER_DAY {
            let open_col = open_column(day, slot_num);
            let close_col = close_column(day, slot_num);
            let open_raw = cells.get(&open_col);
            let close_raw = cells.get(&close_col);

            match (open_raw.is_empty(), close_raw.is_empty()) {
                (true, true) => continue,
                (false, true) => {
                    cells.reject(&close_col, ErrorKind::SlotIncomplete, "close time missing");
                    continue;
                }
                (true, false) => {
                    cells.reject(&open_col, ErrorKind::SlotIncomplete, "open time missing");
                    continue;
                }
                (false, false) => {}
            }

            let open = parse_time(open_raw);
            let close = parse_time(close_raw);
            if open.is_none() {
                let details = format!("'{open_raw}' is not a valid HHMM time");
                cells.reject(&open_col, ErrorKind::InvalidTime, details);
            }
            if close.is_none() {
                let details = format!("'{close_raw}' is not a valid HHMM time");
                cells.reject(&close_col, ErrorKind::InvalidTime, details);
            }
            let (Some(open_time), Some(close_time)) = (open, close) else {
                continue;
            };
            if open_time >= close_time {
                let details = format!(
                    "open {} must be before close {}",
                    format_time(open_time),
                    format_time(close_time)
                );
                cells.reject(&open_col, ErrorKind::SlotRange, details);
                continue;
            }

            let slot = WeeklySlot {
                weekday: weekday as u8,
                slot_num,
                open_time,
                close_time,
            };
            if let Some(existing) = day_slots.iter().find(|s| s.overlaps(&slot)) {
                let details = format!(
                    "{} slot {} ({}-{}) overlaps slot {} ({}-{})",
                    day,
                    slot_num,
                    format_time(open_time),
                    format_time(close_time),
                    existing.slot_num,
                    format_time(existing.open_time),
                    format_time(existing.close_time)
                );
                cells.reject(&open_col, ErrorKind::SlotsTimeConflict, details);
                continue;
            }
            day_slots.push(slot);
        }
        slots.extend(day_slots);
    }

    slots.sort();
    Some(slots)
}

pub fn slots_to_value(slots: &[WeeklySlot]) -> Value {
    serde_json::to_value(slots).unwrap_or_else(|_| Value::Array(Vec::new()))
}

/// Lenient decode of a stored attribute (unknown shapes read as no slots)
pub fn slots_from_value(value: &Value) -> Vec<WeeklySlot> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
