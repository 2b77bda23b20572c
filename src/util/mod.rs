//! Shared text utilities
//!
//! Small conversions used by the enumerated-list states and the
//! built-in directives: Roman numerals, Unicode code-point notation,
//! and display-width measurement.

pub mod roman;
pub mod unicode;

pub use roman::{from_roman, to_roman, RomanError};
pub use unicode::{column_width, decode_unicode_notation, UnicodeNotationError};
