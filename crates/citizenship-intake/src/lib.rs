//! Citizenship application intake: dual-calendar dates, age-gated validation,
//! Devanagari transliteration, and document encoding behind a two-step form.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
