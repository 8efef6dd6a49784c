//! # Rulesheet
//!
//! Turn board game rulebook PDFs into concise, searchable rules summaries.
//!
//! A user uploads one or more rulebook PDFs. The text is extracted, sent to
//! a chat-completion model together with a fixed style prompt, and the
//! returned markdown is stored as a summary. Summaries are browsed, searched
//! and edited through a small server-rendered web app, or from the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Upload  │──▶│  Extract    │──▶│  Generate    │──▶│  SQLite  │
//! │ (PDFs)   │   │ pdf-extract │   │ chat API     │   │ summaries│
//! └──────────┘   └─────────────┘   └──────────────┘   └────┬─────┘
//!                                                          │
//!                                  ┌───────────────────────┤
//!                                  ▼                       ▼
//!                             ┌──────────┐           ┌──────────┐
//!                             │   CLI    │           │   HTTP   │
//!                             │(rulesheet)│          │  (axum)  │
//!                             └──────────┘           └──────────┘
//! ```
//!
//! Domain types, duplicate detection, search highlighting and navigation
//! live in the `rulesheet-core` crate. This crate adds the SQLite store, PDF
//! extraction, the generation client and the web surface.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed summary store |
//! | [`extract`] | PDF text extraction |
//! | [`prompt`] | Summary style prompt |
//! | [`generate`] | Chat-completion client |
//! | [`upload`] | Upload pipeline |
//! | [`access`] | Optional upload password |
//! | [`render`] | Markdown rendering and escaping |
//! | [`search`] | In-summary search |
//! | [`pages`] | HTML pages |
//! | [`server`] | HTTP server |
//! | [`get`] | `list`, `get` and `delete` commands |
//! | [`summarize`] | `summarize` and `duplicates` commands |

pub mod access;
pub mod config;
pub mod db;
pub mod extract;
pub mod generate;
pub mod get;
pub mod migrate;
pub mod pages;
pub mod prompt;
pub mod render;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod summarize;
pub mod upload;
