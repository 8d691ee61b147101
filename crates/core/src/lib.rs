//! Shared types and the recurrence engine for subwatch.
//!
//! - [`subscription`]: the subscription record, request drafts and validation
//! - [`recurrence`]: lazy occurrence generation from an anchor and an interval
//! - [`window`]: listing and dispatch window filtering
//! - [`config`]: environment-driven configuration

pub mod config;
pub mod error;
pub mod recurrence;
pub mod settings;
pub mod subscription;
pub mod timestamp;
pub mod window;

pub use config::Config;
pub use error::*;
pub use recurrence::{occurrences, Interval, MonthRollover, Occurrences};
pub use settings::*;
pub use subscription::*;
pub use window::{list_upcoming_occurrences, Upcoming, Window, WindowEnd};
