//! Outer surfaces: the HTTP API and CSV import/export.

pub mod csv;
pub mod http;
