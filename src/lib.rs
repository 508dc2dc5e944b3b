//! sheetserve - a spreadsheet document as a REST resource
//!
//! Each `(doc_id, sheet_name)` pair is addressed by URL; the HTTP verbs
//! translate into load/find/insert/update/remove operations against a
//! row-oriented backing store consumed through the `store` contract.

pub mod api;
pub mod config;
pub mod credentials;
pub mod query;
pub mod store;
