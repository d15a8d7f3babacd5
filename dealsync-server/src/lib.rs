//! HTTP submission endpoint: startup field check, router, and runtime.

mod error;
pub mod protocol;
pub mod routes;
mod runtime;

pub use error::ServerError;
pub use protocol::{ErrorResponse, HealthResponse};
pub use routes::{router, AppState};
pub use runtime::{init_tracing, initialize, run, serve, start_blocking, Ready};
