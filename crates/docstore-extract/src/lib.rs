//! docstore-extract
//!
//! Reads JSON, PDF, DOCX and TXT files into ordered plain-text units. Only
//! JSON arrays split into several units; every other source becomes one.

pub mod docx;
pub mod json;
pub mod pdf;
pub mod reader;
pub mod txt;

pub use reader::{DocumentFormat, FormatReader};
