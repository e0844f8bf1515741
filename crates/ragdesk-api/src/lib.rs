//! HTTP surface of ragdesk.
//!
//! Handlers live in [`routes`], the router and its middleware stack in [`app`].

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use app::build_router;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
