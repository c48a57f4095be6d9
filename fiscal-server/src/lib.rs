//! fiscal-server: REST surface over the fiscal core engines

pub mod routes;
pub mod state;

pub use routes::{create_fiscal_router, error_response};
pub use state::AppState;
