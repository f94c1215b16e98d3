pub mod routes;
pub mod service;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
