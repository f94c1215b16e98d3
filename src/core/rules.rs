//! Field-level rules for reservation and table submissions.
//!
//! Every check here is a pure function over the submitted `data` object. The
//! structural checks (data present, allow-list, required fields) fail fast; the
//! value checks ([`validate_reservation_rules`], [`validate_table_rules`]) collect
//! every violation and report them together.

use crate::domain::model::{Fields, DATE_FORMAT};
use crate::utils::error::{AppError, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

pub const RESERVATION_PROPERTIES: &[&str] = &[
    "first_name",
    "last_name",
    "mobile_number",
    "reservation_date",
    "reservation_time",
    "people",
    "status",
    "reservation_id",
    "created_at",
    "updated_at",
];

pub const REQUIRED_RESERVATION_PROPERTIES: &[&str] = &[
    "first_name",
    "last_name",
    "mobile_number",
    "reservation_date",
    "reservation_time",
    "people",
];

pub const TABLE_PROPERTIES: &[&str] = &["table_name", "capacity"];

pub const REQUIRED_TABLE_PROPERTIES: &[&str] = &["table_name", "capacity"];

/// 營業時間（分鐘數），兩端皆包含
pub const OPENING_MINUTES: u32 = 10 * 60 + 30;
pub const CLOSING_MINUTES: u32 = 21 * 60 + 30;

pub const CLOSED_WEEKDAY: Weekday = Weekday::Tue;

pub const MIN_TABLE_NAME_LEN: usize = 2;

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0?\d|1\d|2[0-3]):([0-5]\d)$").expect("time pattern"));

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    InvalidTime,
    OutsideBusinessHours,
    InvalidDate,
    ClosedDate,
    InvalidPeople,
    InvalidTableName,
    InvalidCapacity,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Violation::InvalidTime => "Invalid reservation_time.",
            Violation::OutsideBusinessHours => {
                "Reservation time must be between 10:30 and 21:30 in military format."
            }
            Violation::InvalidDate => {
                "Invalid reservation_date. Date format should be 'YYYY-MM-DD'."
            }
            Violation::ClosedDate => {
                "Reservation date must be in the future and not on a Tuesday, we are closed."
            }
            Violation::InvalidPeople => {
                "Invalid number of people. Must be a number greater than 0."
            }
            Violation::InvalidTableName => "Invalid table_name. Must be at least 2 characters.",
            Violation::InvalidCapacity => "Invalid capacity. Must be a number greater than 0.",
        };
        f.write_str(message)
    }
}

/// 取出請求中的 `data` 物件
pub fn require_data(data: Option<&Value>) -> Result<&Fields> {
    data.and_then(Value::as_object)
        .ok_or_else(|| AppError::bad_request("Missing Data"))
}

pub fn check_only_valid_properties(fields: &Fields, allowed: &[&str]) -> Result<()> {
    let invalid: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|field| !allowed.contains(field))
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Invalid field(s): {}",
            invalid.join(", ")
        )))
    }
}

pub fn check_required_properties(fields: &Fields, required: &[&str]) -> Result<()> {
    match required.iter().find(|name| is_missing(fields.get(**name))) {
        Some(name) => Err(AppError::bad_request(format!(
            "A '{}' property is required.",
            name
        ))),
        None => Ok(()),
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

pub fn check_reservation_time(value: Option<&Value>) -> std::result::Result<NaiveTime, Violation> {
    let raw = value.and_then(Value::as_str).ok_or(Violation::InvalidTime)?;
    let caps = TIME_PATTERN.captures(raw).ok_or(Violation::InvalidTime)?;
    let hour: u32 = caps[1].parse().map_err(|_| Violation::InvalidTime)?;
    let minute: u32 = caps[2].parse().map_err(|_| Violation::InvalidTime)?;

    let minutes = hour * 60 + minute;
    if !(OPENING_MINUTES..=CLOSING_MINUTES).contains(&minutes) {
        return Err(Violation::OutsideBusinessHours);
    }

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(Violation::InvalidTime)
}

/// Past dates and the closed weekday share one violation.
pub fn check_reservation_date(
    value: Option<&Value>,
    today: NaiveDate,
) -> std::result::Result<NaiveDate, Violation> {
    let raw = value.and_then(Value::as_str).ok_or(Violation::InvalidDate)?;
    if !DATE_PATTERN.is_match(raw) {
        return Err(Violation::InvalidDate);
    }
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| Violation::InvalidDate)?;

    if date < today || date.weekday() == CLOSED_WEEKDAY {
        return Err(Violation::ClosedDate);
    }
    Ok(date)
}

pub fn check_people(value: Option<&Value>) -> std::result::Result<u32, Violation> {
    positive_integer(value).ok_or(Violation::InvalidPeople)
}

pub fn check_table_name(value: Option<&Value>) -> std::result::Result<&str, Violation> {
    value
        .and_then(Value::as_str)
        .filter(|name| name.trim().chars().count() >= MIN_TABLE_NAME_LEN)
        .ok_or(Violation::InvalidTableName)
}

pub fn check_capacity(value: Option<&Value>) -> std::result::Result<u32, Violation> {
    positive_integer(value).ok_or(Violation::InvalidCapacity)
}

fn positive_integer(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .filter(|n| *n >= 1)
        .and_then(|n| u32::try_from(n).ok())
}

/// 時間、日期與人數檢查，所有錯誤合併成一則訊息
pub fn validate_reservation_rules(fields: &Fields, today: NaiveDate) -> Result<()> {
    let violations = [
        check_reservation_time(fields.get("reservation_time")).err(),
        check_reservation_date(fields.get("reservation_date"), today).err(),
        check_people(fields.get("people")).err(),
    ];
    into_result(violations.into_iter().flatten().collect())
}

pub fn validate_table_rules(fields: &Fields) -> Result<()> {
    let violations = [
        check_table_name(fields.get("table_name")).err(),
        check_capacity(fields.get("capacity")).err(),
    ];
    into_result(violations.into_iter().flatten().collect())
}

fn into_result(violations: Vec<Violation>) -> Result<()> {
    if violations.is_empty() {
        return Ok(());
    }
    let message = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    Err(AppError::bad_request(message))
}
