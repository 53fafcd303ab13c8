//! Scrape period-terminated abbreviations from a paginated category listing,
//! apply user allow/deny lists, and persist the canonical list.

pub mod config;
pub mod confirm;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod listing;
pub mod merge;
pub mod pipeline;
pub mod runtime;
pub mod store;

pub use error::ScrapeError;
