//! rstx: a reStructuredText dialect parser
//!
//! Parses UTF-8 source into a document tree plus structured
//! diagnostics and a cross-reference target database. The core is a
//! line-driven state machine: block states carve out sub-blocks and
//! recurse through nested machines, terminal text goes through the
//! inline tokenizer, and directives dispatch through an extensible
//! registry.
//!
//! ```rust
//! use rstx::{default_registry, parse, Settings};
//!
//! let settings = Settings::default();
//! let registry = default_registry();
//! let document = parse("index.txt", "Hello *world*.", &settings, &registry).unwrap();
//! assert!(document.diagnostics.is_empty());
//! ```

pub mod diagnostics;
pub mod directives;
pub mod document;
pub mod inline;
pub mod machine;
pub mod parser;
pub mod settings;
pub mod source;
pub mod states;
pub mod tools;
pub mod util;
pub mod writers;

pub use diagnostics::{Diagnostic, Reporter, Severity};
pub use directives::builtin::default_registry;
pub use directives::{DirectiveRegistry, DirectiveSpec};
pub use document::{AttrValue, Document, NodeData, NodeId, NodeKind};
pub use machine::ParserBug;
pub use parser::{parse, ParseContext};
pub use settings::Settings;
