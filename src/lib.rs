//! Rental Catalog Library
//!
//! An in-memory, queryable catalog of rental listings for a
//! neighborhood-recommendation front end. Upstream aggregators are
//! simulated: every call pays a configurable latency, listing rents carry a
//! small random jitter, and results are memoized for a short TTL.
//!
//! # Modules
//!
//! - `cache`: TTL memoization keyed by canonical query parameters.
//! - `catalog`: The catalog service and its query operations.
//! - `circuit_breaker`: Circuit breaker for simulated sources.
//! - `clock`: Injectable wall clock.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `feed`: Seedable randomness for latency, jitter and trend figures.
//! - `fixtures`: Embedded listing dataset and validation.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: Listing, query and result models.
//! - `requests`: Latest-request-wins sequencing.
//! - `sources`: Per-aggregator fixture partitions.

pub mod cache;
pub mod catalog;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod errors;
pub mod feed;
pub mod fixtures;
pub mod handlers;
pub mod models;
pub mod requests;
pub mod sources;

pub use catalog::{with_deadline, PropertyCatalog};
pub use errors::CatalogError;
