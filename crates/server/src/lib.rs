//! HTTP surface for subwatch: subscription CRUD, upcoming occurrences,
//! settings and a manual dispatch trigger.

pub mod api;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
