// Crossplane Facade API Server Library
//
// HTTP surface for tenant requests: team registration, VM lifecycle, disk
// attachment and block volumes. Every request is handed to the
// `ActionOrchestrator`; this crate only decodes, routes and maps errors.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use server::ApiServer;
pub use state::ApiState;
