//! vandydine: campus dining menus, cached and queryable.
//!
//! A daily refresh pulls each dining facility's weekly menu and hours from
//! the NetNutrition catalog, merges them into one snapshot and publishes it
//! to readers. Queries never touch the network.
//!
//! # Architecture
//!
//! - **Builder**: turns a weekly listing into a 7-day grid of meal slots
//! - **Hours**: assigns the catalog's untagged hours blocks to those slots
//! - **Scheduler**: daily refresh with fixed-delay retries and a persisted fallback
//! - **Resolver**: picks the next relevant meal for a point in time
//! - **Classifier**: turns free-form arguments into a facility × day × meal selection
//! - **Registry**: per-facility shortcut commands
//! - **Service**: read-only lookups over the live snapshot

pub mod app_dirs;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod error;
pub mod hours;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod snapshot;

pub use classifier::{Classifier, Selection};
pub use config::DiningConfig;
pub use error::{DiningError, ErrorKind, Result};
pub use model::{FacilityMenu, MealKind, MealSlot};
pub use registry::AliasRegistry;
pub use scheduler::{CycleOutcome, RefreshPolicy, RefreshScheduler};
pub use service::DiningService;
pub use snapshot::{CacheSnapshot, JsonSnapshotStore, SnapshotStore};
