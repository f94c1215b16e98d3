use crate::utils::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 請求中 `data` 物件的欄位集合
pub type Fields = serde_json::Map<String, serde_json::Value>;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Booked,
    Seated,
    Finished,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        ReservationStatus::Booked,
        ReservationStatus::Seated,
        ReservationStatus::Finished,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Booked => "booked",
            ReservationStatus::Seated => "seated",
            ReservationStatus::Finished => "finished",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    /// `finished` and `cancelled` end the visit; neither can take a table.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Finished | ReservationStatus::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub reservation_date: NaiveDate,
    #[serde(with = "time_hhmm")]
    pub reservation_time: NaiveTime,
    pub people: u32,
    #[serde(default)]
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 建立或整筆更新訂位時的內容（不含伺服器指派的欄位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReservation {
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub reservation_date: NaiveDate,
    #[serde(with = "time_hhmm")]
    pub reservation_time: NaiveTime,
    pub people: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
}

impl NewReservation {
    /// Builds the typed payload from a field map that already passed the rule checks.
    pub fn from_fields(fields: &Fields) -> Result<Self> {
        let reservation_date = NaiveDate::parse_from_str(
            string_field(fields, "reservation_date")?,
            DATE_FORMAT,
        )
        .map_err(|e| AppError::bad_request(format!("Invalid reservation_date: {}", e)))?;
        let reservation_time =
            NaiveTime::parse_from_str(string_field(fields, "reservation_time")?, TIME_FORMAT)
                .map_err(|e| AppError::bad_request(format!("Invalid reservation_time: {}", e)))?;
        let people = fields
            .get("people")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| AppError::bad_request("Invalid number of people."))?;
        let status = match fields.get("status") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_str()
                    .and_then(ReservationStatus::parse)
                    .ok_or_else(|| AppError::bad_request(format!("invalid status {}", value)))?,
            ),
        };

        Ok(Self {
            first_name: string_field(fields, "first_name")?.to_string(),
            last_name: string_field(fields, "last_name")?.to_string(),
            mobile_number: string_field(fields, "mobile_number")?.to_string(),
            reservation_date,
            reservation_time,
            people,
            status,
        })
    }
}

fn string_field<'a>(fields: &'a Fields, name: &str) -> Result<&'a str> {
    fields
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::bad_request(format!("A '{}' property is required.", name)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub table_id: u64,
    pub table_name: String,
    pub capacity: u32,
    #[serde(default)]
    pub reservation_id: Option<u64>,
}

impl Table {
    pub fn is_occupied(&self) -> bool {
        self.reservation_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTable {
    pub table_name: String,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<u64>,
}

/// `HH:MM` on the wire; `HH:MM:SS` is accepted when reading stored data.
pub mod time_hhmm {
    use super::TIME_FORMAT;
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
