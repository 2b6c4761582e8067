//! # netnutrition
//!
//! Catalog source for dining menus and hours published through CBORD
//! NetNutrition.
//!
//! ## Design
//!
//! - Scrapes the public NetNutrition pages with CSS selectors; no API keys
//! - One cookie-carrying HTTP session per [`NetNutritionSource`], because the
//!   upstream keeps the selected unit and menu server-side
//! - The unit directory (name → oid) is cached in memory with a TTL
//! - Returns raw listings ([`WeeklyListing`], [`WeeklyHours`]) with no
//!   availability interpretation; reconciliation is the caller's job
//!
//! Parsers live in [`parse`] and are usable without a network connection.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod parse;
pub mod source;
pub mod types;

pub use client::NetNutritionSource;
pub use config::SourceConfig;
pub use error::{Result, SourceError};
pub use source::CatalogSource;
pub use types::{
    DayHours, DayListing, HoursBlock, ItemEntry, MealListing, WeeklyHours, WeeklyListing,
};
