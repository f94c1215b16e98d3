//! Status guards for the reservation lifecycle.
//!
//! `booked -> seated -> finished`, with `cancelled` reachable from any state that is
//! not finished. Only finished reservations are locked; ordering between the other
//! states is not enforced, so `seated -> booked` is accepted.

use crate::domain::model::{Reservation, ReservationStatus, Table};
use crate::utils::error::{AppError, Result};
use serde_json::Value;

/// 新訂位只能沒有狀態或為 booked
pub fn check_creation_status(value: Option<&Value>) -> Result<()> {
    match value {
        None | Some(Value::Null) => Ok(()),
        Some(value) => match requested_status(Some(value))? {
            ReservationStatus::Booked => Ok(()),
            status @ (ReservationStatus::Seated | ReservationStatus::Finished) => Err(
                AppError::bad_request(format!("reservation has a status of {}.", status)),
            ),
            ReservationStatus::Cancelled => Err(invalid_status(value)),
        },
    }
}

/// Parses a requested status, rejecting anything outside the four known values.
pub fn requested_status(value: Option<&Value>) -> Result<ReservationStatus> {
    value
        .and_then(Value::as_str)
        .and_then(ReservationStatus::parse)
        .ok_or_else(|| match value {
            Some(value) => invalid_status(value),
            None => AppError::bad_request("invalid status (none)"),
        })
}

fn invalid_status(value: &Value) -> AppError {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    AppError::bad_request(format!("invalid status {}", rendered))
}

/// 已結束的訂位不可再修改
pub fn ensure_not_finished(reservation: &Reservation) -> Result<()> {
    if reservation.status == ReservationStatus::Finished {
        return Err(AppError::bad_request(format!(
            "reservation {} is finished and cannot be modified",
            reservation.reservation_id
        )));
    }
    Ok(())
}

pub fn ensure_can_be_seated(reservation: &Reservation) -> Result<()> {
    ensure_not_finished(reservation)?;
    if reservation.status == ReservationStatus::Seated {
        return Err(AppError::bad_request(format!(
            "reservation {} is already seated",
            reservation.reservation_id
        )));
    }
    if reservation.status.is_terminal() {
        return Err(AppError::bad_request(format!(
            "reservation {} is cancelled",
            reservation.reservation_id
        )));
    }
    Ok(())
}

/// Trivial matching only: the table must hold the whole party.
pub fn ensure_capacity(table: &Table, reservation: &Reservation) -> Result<()> {
    if table.capacity < reservation.people {
        return Err(AppError::bad_request(format!(
            "Table {} does not have sufficient capacity.",
            table.table_name
        )));
    }
    Ok(())
}

pub fn ensure_table_free(table: &Table) -> Result<()> {
    if table.is_occupied() {
        return Err(AppError::bad_request(format!(
            "Table {} is occupied.",
            table.table_name
        )));
    }
    Ok(())
}

/// 回傳目前坐在這張桌子的訂位編號
pub fn seated_reservation(table: &Table) -> Result<u64> {
    table.reservation_id.ok_or_else(|| {
        AppError::bad_request(format!("Table {} is not occupied.", table.table_name))
    })
}
