//! # Rulesheet Core
//!
//! Shared logic for Rulesheet: the summary record model, the store
//! abstraction, in-page search highlighting and navigation, duplicate
//! detection, identity primitives, and title derivation.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Everything
//! that touches the outside world lives in the `rulesheet` crate and reaches
//! this one through the [`store::SummaryStore`] trait.

pub mod auth;
pub mod duplicates;
pub mod highlight;
pub mod models;
pub mod navigator;
pub mod session;
pub mod store;
pub mod time;
pub mod title;
