use crate::core::pipeline::RequestContext;
use crate::core::stages::{ReservationChains, TableChains};
use crate::domain::model::{NewReservation, NewTable, Reservation, Table, DATE_FORMAT};
use crate::domain::ports::{Clock, ReservationRepository, TableRepository};
use crate::utils::error::{AppError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// `GET /reservations` 的查詢條件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationQuery {
    pub date: Option<String>,
    pub mobile_number: Option<String>,
    pub reservation_id: Option<String>,
}

pub struct ReservationService {
    repository: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
    chains: ReservationChains,
}

impl ReservationService {
    pub fn new(repository: Arc<dyn ReservationRepository>, clock: Arc<dyn Clock>) -> Self {
        let chains = ReservationChains::new(repository.clone());
        Self {
            repository,
            clock,
            chains,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(self.clock.today())
    }

    pub async fn create(&self, data: Option<Value>) -> Result<Reservation> {
        let context = self.chains.create.execute(self.context().with_data(data)).await?;
        let new = NewReservation::from_fields(context.fields()?)?;

        let created = self.repository.create(new).await?;
        tracing::info!(
            "✅ Reservation {} created for {} on {} at {}",
            created.reservation_id,
            created.people,
            created.reservation_date,
            created.reservation_time.format("%H:%M")
        );
        Ok(created)
    }

    /// Precedence: `reservation_id`, then `date`, then `mobile_number`, else the default list.
    pub async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        if let Some(id) = query.reservation_id.filter(|id| !id.trim().is_empty()) {
            let found = match id.trim().parse::<u64>() {
                Ok(id) => self.repository.read(id).await?,
                Err(_) => None,
            };
            return Ok(found.into_iter().collect());
        }

        if let Some(date) = query.date.filter(|d| !d.trim().is_empty()) {
            let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
                .map_err(|_| AppError::bad_request(format!("Invalid date {}", date)))?;
            return self.repository.search_by_date(date).await;
        }

        if let Some(fragment) = query.mobile_number.filter(|m| !m.trim().is_empty()) {
            return self.repository.search_by_phone_number(&fragment).await;
        }

        self.repository.list().await
    }

    pub async fn read(&self, reservation_id: &str) -> Result<Reservation> {
        let context = self
            .chains
            .read
            .execute(self.context().with_reservation_id(reservation_id))
            .await?;
        context
            .reservation
            .ok_or_else(|| AppError::not_found(format!("Reservation {} cannot be found.", reservation_id)))
    }

    pub async fn update_status(&self, reservation_id: &str, data: Option<Value>) -> Result<Reservation> {
        let context = self
            .chains
            .update_status
            .execute(
                self.context()
                    .with_reservation_id(reservation_id)
                    .with_data(data),
            )
            .await?;
        let reservation = context.loaded_reservation("update_status")?;
        let status = context.status.ok_or_else(|| AppError::StageError {
            stage: "update_status".to_string(),
            details: "no status was resolved".to_string(),
        })?;

        let updated = self
            .repository
            .update_status(reservation.reservation_id, status)
            .await?;
        tracing::info!(
            "🔄 Reservation {} status {} -> {}",
            updated.reservation_id,
            reservation.status,
            updated.status
        );
        Ok(updated)
    }

    pub async fn update_reservation(
        &self,
        reservation_id: &str,
        data: Option<Value>,
    ) -> Result<Reservation> {
        let context = self
            .chains
            .update_reservation
            .execute(
                self.context()
                    .with_reservation_id(reservation_id)
                    .with_data(data),
            )
            .await?;
        let reservation = context.loaded_reservation("update_reservation")?;
        let update = NewReservation::from_fields(context.fields()?)?;

        let updated = self
            .repository
            .update_reservation(reservation.reservation_id, update)
            .await?;
        tracing::info!("✏️ Reservation {} updated", updated.reservation_id);
        Ok(updated)
    }
}

pub struct TableService {
    repository: Arc<dyn TableRepository>,
    clock: Arc<dyn Clock>,
    chains: TableChains,
}

impl TableService {
    pub fn new(
        repository: Arc<dyn TableRepository>,
        reservations: Arc<dyn ReservationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let chains = TableChains::new(repository.clone(), reservations);
        Self {
            repository,
            clock,
            chains,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(self.clock.today())
    }

    pub async fn list(&self) -> Result<Vec<Table>> {
        self.repository.list().await
    }

    pub async fn create(&self, data: Option<Value>) -> Result<Table> {
        let context = self.chains.create.execute(self.context().with_data(data)).await?;
        let table: NewTable = serde_json::from_value(Value::Object(context.fields()?.clone()))?;

        let created = self.repository.create(table).await?;
        tracing::info!(
            "✅ Table {} '{}' created (capacity {})",
            created.table_id,
            created.table_name,
            created.capacity
        );
        Ok(created)
    }

    pub async fn seat(&self, table_id: &str, data: Option<Value>) -> Result<Table> {
        let context = self
            .chains
            .seat
            .execute(self.context().with_table_id(table_id).with_data(data))
            .await?;
        let table = context.loaded_table("seat")?;
        let reservation = context.loaded_reservation("seat")?;

        let seated = self
            .repository
            .seat(table.table_id, reservation.reservation_id)
            .await?;
        tracing::info!(
            "🍽️ Reservation {} seated at table '{}'",
            reservation.reservation_id,
            seated.table_name
        );
        Ok(seated)
    }

    pub async fn finish(&self, table_id: &str) -> Result<Table> {
        let context = self
            .chains
            .finish
            .execute(self.context().with_table_id(table_id))
            .await?;
        let table = context.loaded_table("finish")?;

        let freed = self.repository.finish(table.table_id).await?;
        tracing::info!(
            "🧹 Table '{}' freed, reservation {:?} finished",
            freed.table_name,
            table.reservation_id
        );
        Ok(freed)
    }
}
