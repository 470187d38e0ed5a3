//! Pure stage logic of a transfer: trigger filtering, document decoding,
//! enrichment and CSV rendering. Nothing in here talks to a backend.

pub mod csv_export;
pub mod enrich;
pub mod ingestion;
pub mod trigger;
