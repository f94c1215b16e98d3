use crate::domain::model::{NewReservation, NewTable, Reservation, ReservationStatus, Table};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// 訂位資料存取介面
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Assigns the identifier, the `booked` default status and timestamps.
    async fn create(&self, reservation: NewReservation) -> Result<Reservation>;

    async fn read(&self, reservation_id: u64) -> Result<Option<Reservation>>;

    /// Reservations dated today or later that are not finished, ordered by date then time.
    async fn list(&self) -> Result<Vec<Reservation>>;

    async fn search_by_date(&self, date: NaiveDate) -> Result<Vec<Reservation>>;

    /// Digits-only partial match on the mobile number.
    async fn search_by_phone_number(&self, fragment: &str) -> Result<Vec<Reservation>>;

    async fn update_status(
        &self,
        reservation_id: u64,
        status: ReservationStatus,
    ) -> Result<Reservation>;

    async fn update_reservation(
        &self,
        reservation_id: u64,
        reservation: NewReservation,
    ) -> Result<Reservation>;
}

/// 桌位資料存取介面
#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Table>>;

    async fn create(&self, table: NewTable) -> Result<Table>;

    async fn read(&self, table_id: u64) -> Result<Option<Table>>;

    /// Links the reservation to the table and marks it seated in one step.
    async fn seat(&self, table_id: u64, reservation_id: u64) -> Result<Table>;

    /// Frees the table and marks its reservation finished in one step.
    async fn finish(&self, table_id: u64) -> Result<Table>;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// 固定日期，測試用
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
