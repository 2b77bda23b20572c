//! Document serialization
//!
//! Nested JSON comes straight from [`crate::document::Document::to_json`];
//! this module adds the XML rendering used by the inspection tool.

pub mod xml;

pub use xml::{document_to_xml, XmlWriteError};
