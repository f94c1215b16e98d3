//! Concrete request stages and the chains built from them.

use crate::core::pipeline::{RequestContext, Stage, StageChain};
use crate::core::{rules, status};
use crate::domain::ports::{ReservationRepository, TableRepository};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub fn has_reservation_id(context: RequestContext) -> Result<RequestContext> {
    match context.reservation_id.as_deref() {
        Some(id) if !id.trim().is_empty() => Ok(context),
        _ => Err(AppError::bad_request("reservation_id is required")),
    }
}

/// Takes `reservation_id` from the body, as the seat request carries it there.
pub fn reservation_id_from_body(mut context: RequestContext) -> Result<RequestContext> {
    let id = match context.field("reservation_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(AppError::bad_request("reservation_id is required")),
    };
    context.reservation_id = Some(id);
    Ok(context)
}

pub fn has_data(context: RequestContext) -> Result<RequestContext> {
    context.fields()?;
    Ok(context)
}

pub fn has_required_reservation_properties(context: RequestContext) -> Result<RequestContext> {
    rules::check_required_properties(context.fields()?, rules::REQUIRED_RESERVATION_PROPERTIES)?;
    Ok(context)
}

pub fn has_only_valid_reservation_properties(context: RequestContext) -> Result<RequestContext> {
    rules::check_only_valid_properties(context.fields()?, rules::RESERVATION_PROPERTIES)?;
    Ok(context)
}

pub fn reservation_rules(context: RequestContext) -> Result<RequestContext> {
    rules::validate_reservation_rules(context.fields()?, context.today)?;
    Ok(context)
}

pub fn creation_status(context: RequestContext) -> Result<RequestContext> {
    status::check_creation_status(context.field("status"))?;
    Ok(context)
}

pub fn not_finished(context: RequestContext) -> Result<RequestContext> {
    status::ensure_not_finished(context.loaded_reservation("not_finished")?)?;
    Ok(context)
}

pub fn valid_status(mut context: RequestContext) -> Result<RequestContext> {
    context.status = Some(status::requested_status(context.field("status"))?);
    Ok(context)
}

/// 整筆更新時狀態為選填，有提供才檢查
pub fn optional_status(mut context: RequestContext) -> Result<RequestContext> {
    let provided = !matches!(context.field("status"), None | Some(Value::Null));
    if provided {
        context.status = Some(status::requested_status(context.field("status"))?);
    }
    Ok(context)
}

pub fn has_required_table_properties(context: RequestContext) -> Result<RequestContext> {
    rules::check_required_properties(context.fields()?, rules::REQUIRED_TABLE_PROPERTIES)?;
    Ok(context)
}

pub fn has_only_valid_table_properties(context: RequestContext) -> Result<RequestContext> {
    rules::check_only_valid_properties(context.fields()?, rules::TABLE_PROPERTIES)?;
    Ok(context)
}

pub fn table_rules(context: RequestContext) -> Result<RequestContext> {
    rules::validate_table_rules(context.fields()?)?;
    Ok(context)
}

pub fn can_be_seated(context: RequestContext) -> Result<RequestContext> {
    status::ensure_can_be_seated(context.loaded_reservation("can_be_seated")?)?;
    Ok(context)
}

pub fn has_capacity(context: RequestContext) -> Result<RequestContext> {
    status::ensure_capacity(
        context.loaded_table("has_capacity")?,
        context.loaded_reservation("has_capacity")?,
    )?;
    Ok(context)
}

pub fn table_is_free(context: RequestContext) -> Result<RequestContext> {
    status::ensure_table_free(context.loaded_table("table_is_free")?)?;
    Ok(context)
}

pub fn table_is_occupied(context: RequestContext) -> Result<RequestContext> {
    status::seated_reservation(context.loaded_table("table_is_occupied")?)?;
    Ok(context)
}

/// 查詢訂位是否存在，找到後放入上下文
pub struct ReservationExists {
    repository: Arc<dyn ReservationRepository>,
}

impl ReservationExists {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Stage for ReservationExists {
    fn get_name(&self) -> &str {
        "reservation_exists"
    }

    async fn apply(&self, mut context: RequestContext) -> Result<RequestContext> {
        let raw = context.reservation_id.clone().unwrap_or_default();
        let not_found = || AppError::not_found(format!("Reservation {} cannot be found.", raw));

        let id: u64 = raw.trim().parse().map_err(|_| not_found())?;
        let reservation = self.repository.read(id).await?.ok_or_else(not_found)?;

        context.reservation = Some(reservation);
        Ok(context)
    }
}

pub struct TableExists {
    repository: Arc<dyn TableRepository>,
}

impl TableExists {
    pub fn new(repository: Arc<dyn TableRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Stage for TableExists {
    fn get_name(&self) -> &str {
        "table_exists"
    }

    async fn apply(&self, mut context: RequestContext) -> Result<RequestContext> {
        let raw = context.table_id.clone().unwrap_or_default();
        let not_found = || AppError::not_found(format!("Table {} cannot be found.", raw));

        let id: u64 = raw.trim().parse().map_err(|_| not_found())?;
        let table = self.repository.read(id).await?.ok_or_else(not_found)?;

        context.table = Some(table);
        Ok(context)
    }
}

/// 各操作對應的處理鏈
pub struct ReservationChains {
    pub create: StageChain,
    pub read: StageChain,
    pub update_status: StageChain,
    pub update_reservation: StageChain,
}

impl ReservationChains {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        Self {
            create: StageChain::new("create_reservation")
                .with_fn("has_data", has_data)
                .with_fn("has_required_properties", has_required_reservation_properties)
                .with_fn("has_only_valid_properties", has_only_valid_reservation_properties)
                .with_fn("reservation_rules", reservation_rules)
                .with_fn("creation_status", creation_status),
            read: StageChain::new("read_reservation")
                .with_fn("has_reservation_id", has_reservation_id)
                .with_stage(ReservationExists::new(repository.clone())),
            update_status: StageChain::new("update_status")
                .with_fn("has_reservation_id", has_reservation_id)
                .with_stage(ReservationExists::new(repository.clone()))
                .with_fn("not_finished", not_finished)
                .with_fn("has_data", has_data)
                .with_fn("valid_status", valid_status),
            update_reservation: StageChain::new("update_reservation")
                .with_fn("has_reservation_id", has_reservation_id)
                .with_stage(ReservationExists::new(repository))
                .with_fn("not_finished", not_finished)
                .with_fn("has_data", has_data)
                .with_fn("has_required_properties", has_required_reservation_properties)
                .with_fn("has_only_valid_properties", has_only_valid_reservation_properties)
                .with_fn("reservation_rules", reservation_rules)
                .with_fn("optional_status", optional_status),
        }
    }
}

pub struct TableChains {
    pub create: StageChain,
    pub seat: StageChain,
    pub finish: StageChain,
}

impl TableChains {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        reservations: Arc<dyn ReservationRepository>,
    ) -> Self {
        Self {
            create: StageChain::new("create_table")
                .with_fn("has_data", has_data)
                .with_fn("has_required_properties", has_required_table_properties)
                .with_fn("has_only_valid_properties", has_only_valid_table_properties)
                .with_fn("table_rules", table_rules),
            seat: StageChain::new("seat_table")
                .with_fn("has_data", has_data)
                .with_fn("reservation_id_from_body", reservation_id_from_body)
                .with_stage(TableExists::new(tables.clone()))
                .with_stage(ReservationExists::new(reservations))
                .with_fn("can_be_seated", can_be_seated)
                .with_fn("has_capacity", has_capacity)
                .with_fn("table_is_free", table_is_free),
            finish: StageChain::new("finish_table")
                .with_stage(TableExists::new(tables))
                .with_fn("table_is_occupied", table_is_occupied),
        }
    }
}
