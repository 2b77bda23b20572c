//! Parser configuration

/// Recognized configuration options. Defaults match the common
/// documentation-build setup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Width of a tab expansion, in spaces.
    pub tab_width: usize,
    /// Right-trim whitespace before an inline footnote reference.
    pub trim_footnote_reference_space: bool,
    /// Prefix attached to generated ids.
    pub id_prefix: String,
    /// Prefix for synthetic ids.
    pub auto_id_prefix: String,
    /// Minimum severity surfaced in the diagnostics list (1-4).
    pub report_level: u8,
    /// Severity that stops further parsing; 5 means never.
    pub halt_level: u8,
    /// Recognize inline markup boundaries at any character, instead of
    /// only after whitespace and punctuation.
    pub character_level_inline_markup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tab_width: 8,
            trim_footnote_reference_space: false,
            id_prefix: String::new(),
            auto_id_prefix: "id".to_string(),
            report_level: 1,
            halt_level: 5,
            character_level_inline_markup: false,
        }
    }
}
