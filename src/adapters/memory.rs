use crate::core::status;
use crate::domain::model::{NewReservation, NewTable, Reservation, ReservationStatus, Table};
use crate::domain::ports::{Clock, ReservationRepository, TableRepository};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 啟動時預先載入的資料
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub reservations: Vec<NewReservation>,
    #[serde(default)]
    pub tables: Vec<NewTable>,
}

impl SeedData {
    pub async fn from_file(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    reservations: BTreeMap<u64, Reservation>,
    tables: BTreeMap<u64, Table>,
    next_reservation_id: u64,
    next_table_id: u64,
}

impl StoreState {
    fn insert_reservation(&mut self, new: NewReservation) -> Reservation {
        self.next_reservation_id += 1;
        let now = Utc::now();
        let reservation = Reservation {
            reservation_id: self.next_reservation_id,
            first_name: new.first_name,
            last_name: new.last_name,
            mobile_number: new.mobile_number,
            reservation_date: new.reservation_date,
            reservation_time: new.reservation_time,
            people: new.people,
            status: new.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.reservations
            .insert(reservation.reservation_id, reservation.clone());
        reservation
    }

    fn insert_table(&mut self, new: NewTable) -> Table {
        self.next_table_id += 1;
        let table = Table {
            table_id: self.next_table_id,
            table_name: new.table_name,
            capacity: new.capacity,
            reservation_id: new.reservation_id,
        };
        self.tables.insert(table.table_id, table.clone());
        table
    }

    fn reservation_mut(&mut self, reservation_id: u64) -> Result<&mut Reservation> {
        self.reservations.get_mut(&reservation_id).ok_or_else(|| {
            AppError::not_found(format!("Reservation {} cannot be found.", reservation_id))
        })
    }

    fn table_mut(&mut self, table_id: u64) -> Result<&mut Table> {
        self.tables
            .get_mut(&table_id)
            .ok_or_else(|| AppError::not_found(format!("Table {} cannot be found.", table_id)))
    }
}

/// In-memory implementation of the data-access ports.
///
/// Every port call takes the lock once, so multi-record updates such as seating a
/// table are atomic with respect to other requests. `seat` and `finish` repeat the
/// seating guards under that lock and write nothing when one fails.
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            clock,
        }
    }

    /// 載入種子資料，不經過驗證
    ///
    /// Tables may only point at reservations that already exist or arrive in the same
    /// seed; nothing is written when one does not.
    pub async fn seed(&self, seed: SeedData) -> Result<(usize, usize)> {
        let mut state = self.state.write().await;
        let incoming = (state.next_reservation_id + 1)
            ..=(state.next_reservation_id + seed.reservations.len() as u64);
        for table in &seed.tables {
            if let Some(reservation_id) = table.reservation_id {
                if !state.reservations.contains_key(&reservation_id)
                    && !incoming.contains(&reservation_id)
                {
                    return Err(AppError::repository(format!(
                        "seed table '{}' references unknown reservation {}",
                        table.table_name, reservation_id
                    )));
                }
            }
        }

        let reservations = seed.reservations.len();
        let tables = seed.tables.len();
        for reservation in seed.reservations {
            state.insert_reservation(reservation);
        }
        for table in seed.tables {
            state.insert_table(table);
        }
        Ok((reservations, tables))
    }
}

fn sort_by_schedule(reservations: &mut [Reservation]) {
    reservations.sort_by(|a, b| {
        (a.reservation_date, a.reservation_time, a.reservation_id).cmp(&(
            b.reservation_date,
            b.reservation_time,
            b.reservation_id,
        ))
    });
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn create(&self, reservation: NewReservation) -> Result<Reservation> {
        let mut state = self.state.write().await;
        Ok(state.insert_reservation(reservation))
    }

    async fn read(&self, reservation_id: u64) -> Result<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state.reservations.get(&reservation_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Reservation>> {
        let today = self.clock.today();
        let state = self.state.read().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.reservation_date >= today && r.status != ReservationStatus::Finished)
            .cloned()
            .collect();
        sort_by_schedule(&mut found);
        Ok(found)
    }

    async fn search_by_date(&self, date: NaiveDate) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.reservation_date == date && r.status != ReservationStatus::Finished)
            .cloned()
            .collect();
        sort_by_schedule(&mut found);
        Ok(found)
    }

    async fn search_by_phone_number(&self, fragment: &str) -> Result<Vec<Reservation>> {
        let needle = digits(fragment);
        let state = self.state.read().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| digits(&r.mobile_number).contains(&needle))
            .cloned()
            .collect();
        sort_by_schedule(&mut found);
        Ok(found)
    }

    async fn update_status(
        &self,
        reservation_id: u64,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let mut state = self.state.write().await;
        let reservation = state.reservation_mut(reservation_id)?;
        reservation.status = status;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn update_reservation(
        &self,
        reservation_id: u64,
        update: NewReservation,
    ) -> Result<Reservation> {
        let mut state = self.state.write().await;
        let reservation = state.reservation_mut(reservation_id)?;
        reservation.first_name = update.first_name;
        reservation.last_name = update.last_name;
        reservation.mobile_number = update.mobile_number;
        reservation.reservation_date = update.reservation_date;
        reservation.reservation_time = update.reservation_time;
        reservation.people = update.people;
        if let Some(status) = update.status {
            reservation.status = status;
        }
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }
}

#[async_trait]
impl TableRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Table>> {
        let state = self.state.read().await;
        let mut tables: Vec<Table> = state.tables.values().cloned().collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(tables)
    }

    async fn create(&self, table: NewTable) -> Result<Table> {
        let mut state = self.state.write().await;
        Ok(state.insert_table(table))
    }

    async fn read(&self, table_id: u64) -> Result<Option<Table>> {
        let state = self.state.read().await;
        Ok(state.tables.get(&table_id).cloned())
    }

    async fn seat(&self, table_id: u64, reservation_id: u64) -> Result<Table> {
        let mut state = self.state.write().await;
        // 鎖內重新檢查，前面的讀取可能已經過時
        let table = state.table_mut(table_id)?.clone();
        let reservation = state.reservation_mut(reservation_id)?;
        status::ensure_can_be_seated(reservation)?;
        status::ensure_capacity(&table, reservation)?;
        status::ensure_table_free(&table)?;

        reservation.status = ReservationStatus::Seated;
        reservation.updated_at = Utc::now();
        let table = state.table_mut(table_id)?;
        table.reservation_id = Some(reservation_id);
        Ok(table.clone())
    }

    async fn finish(&self, table_id: u64) -> Result<Table> {
        let mut state = self.state.write().await;
        let reservation_id = status::seated_reservation(state.table_mut(table_id)?)?;

        let reservation = state.reservations.get_mut(&reservation_id).ok_or_else(|| {
            AppError::repository(format!(
                "table {} references missing reservation {}",
                table_id, reservation_id
            ))
        })?;
        reservation.status = ReservationStatus::Finished;
        reservation.updated_at = Utc::now();

        let table = state.table_mut(table_id)?;
        table.reservation_id = None;
        Ok(table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixedClock;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(FixedClock(today())))
    }

    fn new_reservation(date: NaiveDate, time: (u32, u32), phone: &str) -> NewReservation {
        NewReservation {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            mobile_number: phone.into(),
            reservation_date: date,
            reservation_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            people: 2,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_default_status() {
        let store = store();
        let first = ReservationRepository::create(
            &store,
            new_reservation(today(), (12, 0), "555-0100"),
        )
        .await
        .unwrap();
        let second = ReservationRepository::create(
            &store,
            new_reservation(today(), (13, 0), "555-0101"),
        )
        .await
        .unwrap();

        assert_eq!(first.reservation_id, 1);
        assert_eq!(second.reservation_id, 2);
        assert_eq!(first.status, ReservationStatus::Booked);
    }

    #[tokio::test]
    async fn test_list_skips_past_and_finished_and_orders_by_schedule() {
        let store = store();
        let tomorrow = today().succ_opt().unwrap();
        let yesterday = today().pred_opt().unwrap();

        let late = ReservationRepository::create(&store, new_reservation(today(), (20, 0), "1"))
            .await
            .unwrap();
        let next_day = ReservationRepository::create(&store, new_reservation(tomorrow, (11, 0), "2"))
            .await
            .unwrap();
        let early = ReservationRepository::create(&store, new_reservation(today(), (11, 0), "3"))
            .await
            .unwrap();
        ReservationRepository::create(&store, new_reservation(yesterday, (12, 0), "4"))
            .await
            .unwrap();
        let done = ReservationRepository::create(&store, new_reservation(today(), (12, 0), "5"))
            .await
            .unwrap();
        store
            .update_status(done.reservation_id, ReservationStatus::Finished)
            .await
            .unwrap();

        let ids: Vec<u64> = ReservationRepository::list(&store)
            .await
            .unwrap()
            .iter()
            .map(|r| r.reservation_id)
            .collect();
        assert_eq!(ids, vec![early.reservation_id, late.reservation_id, next_day.reservation_id]);
    }

    #[tokio::test]
    async fn test_search_by_phone_number_normalizes_digits() {
        let store = store();
        ReservationRepository::create(&store, new_reservation(today(), (12, 0), "(555) 123-4567"))
            .await
            .unwrap();
        ReservationRepository::create(&store, new_reservation(today(), (12, 0), "800-555-0000"))
            .await
            .unwrap();

        let found = store.search_by_phone_number("5551234").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mobile_number, "(555) 123-4567");

        let found = store.search_by_phone_number("555").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_seat_and_finish_update_both_records() {
        let store = store();
        let reservation =
            ReservationRepository::create(&store, new_reservation(today(), (12, 0), "555"))
                .await
                .unwrap();
        let table = TableRepository::create(
            &store,
            NewTable {
                table_name: "Patio".into(),
                capacity: 4,
                reservation_id: None,
            },
        )
        .await
        .unwrap();

        let seated = store
            .seat(table.table_id, reservation.reservation_id)
            .await
            .unwrap();
        assert_eq!(seated.reservation_id, Some(reservation.reservation_id));
        let stored = ReservationRepository::read(&store, reservation.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReservationStatus::Seated);

        let freed = store.finish(table.table_id).await.unwrap();
        assert!(!freed.is_occupied());
        let stored = ReservationRepository::read(&store, reservation.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReservationStatus::Finished);
    }

    #[tokio::test]
    async fn test_seat_unknown_reservation_leaves_table_free() {
        let store = store();
        let table = TableRepository::create(
            &store,
            NewTable {
                table_name: "Patio".into(),
                capacity: 4,
                reservation_id: None,
            },
        )
        .await
        .unwrap();

        assert!(store.seat(table.table_id, 99).await.is_err());
        let stored = TableRepository::read(&store, table.table_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_occupied());
    }

    #[tokio::test]
    async fn test_seed_loads_tables_sorted_by_name() {
        let store = store();
        let counts = store
            .seed(SeedData {
                reservations: vec![],
                tables: vec![
                    NewTable {
                        table_name: "Bar #2".into(),
                        capacity: 1,
                        reservation_id: None,
                    },
                    NewTable {
                        table_name: "#1".into(),
                        capacity: 6,
                        reservation_id: None,
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(counts, (0, 2));

        let names: Vec<String> = TableRepository::list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.table_name)
            .collect();
        assert_eq!(names, vec!["#1", "Bar #2"]);
    }

    fn new_table(name: &str, reservation_id: Option<u64>) -> NewTable {
        NewTable {
            table_name: name.into(),
            capacity: 4,
            reservation_id,
        }
    }

    #[tokio::test]
    async fn test_seat_rechecks_table_and_reservation() {
        let store = store();
        let first = ReservationRepository::create(&store, new_reservation(today(), (12, 0), "1"))
            .await
            .unwrap();
        let second = ReservationRepository::create(&store, new_reservation(today(), (12, 0), "2"))
            .await
            .unwrap();
        let table = TableRepository::create(&store, new_table("Patio", None))
            .await
            .unwrap();
        let other = TableRepository::create(&store, new_table("Window", None))
            .await
            .unwrap();

        store.seat(table.table_id, first.reservation_id).await.unwrap();

        let err = store
            .seat(table.table_id, second.reservation_id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Table Patio is occupied.");
        let err = store
            .seat(other.table_id, first.reservation_id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("reservation {} is already seated", first.reservation_id));

        let stored = ReservationRepository::read(&store, second.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReservationStatus::Booked);
        let stored = TableRepository::read(&store, table.table_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reservation_id, Some(first.reservation_id));
    }

    #[tokio::test]
    async fn test_finish_free_table_is_rejected() {
        let store = store();
        let table = TableRepository::create(&store, new_table("Patio", None))
            .await
            .unwrap();
        let err = store.finish(table.table_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Table Patio is not occupied.");
    }

    #[tokio::test]
    async fn test_finish_with_missing_reservation_leaves_table_occupied() {
        let store = store();
        let table = TableRepository::create(&store, new_table("Patio", Some(99)))
            .await
            .unwrap();

        let err = store.finish(table.table_id).await.unwrap_err();
        assert!(matches!(err, AppError::RepositoryError { .. }));
        let stored = TableRepository::read(&store, table.table_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reservation_id, Some(99));
    }

    #[tokio::test]
    async fn test_seed_rejects_table_with_unknown_reservation() {
        let store = store();
        let err = store
            .seed(SeedData {
                reservations: vec![new_reservation(today(), (12, 0), "1")],
                tables: vec![new_table("Patio", Some(99))],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown reservation 99"));

        // 拒絕時不寫入任何資料
        assert!(ReservationRepository::read(&store, 1).await.unwrap().is_none());
        assert!(TableRepository::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_table_may_point_at_seeded_reservation() {
        let store = store();
        let counts = store
            .seed(SeedData {
                reservations: vec![new_reservation(today(), (12, 0), "1")],
                tables: vec![new_table("Patio", Some(1))],
            })
            .await
            .unwrap();
        assert_eq!(counts, (1, 1));

        let freed = store.finish(1).await.unwrap();
        assert!(!freed.is_occupied());
    }
}
