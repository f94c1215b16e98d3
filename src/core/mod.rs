pub mod pipeline;
pub mod rules;
pub mod stages;
pub mod status;

pub use crate::domain::model::{NewReservation, NewTable, Reservation, ReservationStatus, Table};
pub use crate::domain::ports::{Clock, ReservationRepository, TableRepository};
pub use crate::utils::error::Result;
