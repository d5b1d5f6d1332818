//! Airwave domain core.
//!
//! Pure domain logic shared by the generation engine and the API server:
//! request validation, the lyric library and content resolver, the error
//! taxonomy, error sanitization, pricing, and library identifiers.
//! No I/O lives here.

pub mod error;
pub mod lyrics;
pub mod pricing;
pub mod request;
pub mod sanitize;
pub mod track_id;
pub mod types;
