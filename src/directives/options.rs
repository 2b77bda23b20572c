//! Directive option validators
//!
//! Each option in a directive's option spec names a validator that
//! converts the raw field value (or its absence) into a typed
//! attribute value, or explains why it cannot.

use crate::document::AttrValue;

/// Converts one raw option value. `None` means the option field had
/// an empty body.
pub type OptionValidator = fn(Option<&str>) -> Result<AttrValue, String>;

/// A flag option takes no value.
pub fn flag(value: Option<&str>) -> Result<AttrValue, String> {
    match value {
        None => Ok(AttrValue::Bool(true)),
        Some(text) if text.trim().is_empty() => Ok(AttrValue::Bool(true)),
        Some(text) => Err(format!("no argument is allowed; \"{}\" supplied", text)),
    }
}

/// The raw value, whitespace preserved; a value is required.
pub fn unchanged(value: Option<&str>) -> Result<AttrValue, String> {
    match value {
        Some(text) => Ok(AttrValue::Str(text.to_string())),
        None => Err("argument required but none supplied".to_string()),
    }
}

/// The raw value, or the empty string when absent.
pub fn unchanged_or_empty(value: Option<&str>) -> Result<AttrValue, String> {
    Ok(AttrValue::Str(value.unwrap_or("").to_string()))
}

pub fn nonnegative_int(value: Option<&str>) -> Result<AttrValue, String> {
    let text = value.ok_or_else(|| "argument required but none supplied".to_string())?;
    let parsed: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("invalid integer value: \"{}\"", text))?;
    if parsed < 0 {
        return Err(format!("negative value; must be positive or zero: {}", parsed));
    }
    Ok(AttrValue::Int(parsed))
}

/// Whitespace-separated class names, each run through `make_id`-style
/// cleanup.
pub fn class_option(value: Option<&str>) -> Result<AttrValue, String> {
    let text = value.ok_or_else(|| "argument required but none supplied".to_string())?;
    let mut names = Vec::new();
    for word in text.split_whitespace() {
        let id = crate::document::make_id(word);
        if id.is_empty() {
            return Err(format!("cannot make \"{}\" into a class name", word));
        }
        names.push(id);
    }
    if names.is_empty() {
        return Err("argument required but none supplied".to_string());
    }
    Ok(AttrValue::StrList(names))
}

/// Comma-separated line numbers and ranges: `1-2,4` becomes
/// `[(1,2), (4,4)]`.
pub fn line_ranges(value: Option<&str>) -> Result<AttrValue, String> {
    let text = value.ok_or_else(|| "argument required but none supplied".to_string())?;
    let mut pairs = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("invalid line range: \"{}\"", text));
        }
        let (low, high) = match part.split_once('-') {
            Some((low, high)) => (low.trim(), high.trim()),
            None => (part, part),
        };
        let low: i64 = low
            .parse()
            .map_err(|_| format!("invalid line number: \"{}\"", part))?;
        let high: i64 = high
            .parse()
            .map_err(|_| format!("invalid line number: \"{}\"", part))?;
        if low < 1 || high < low {
            return Err(format!("invalid line range: \"{}\"", part));
        }
        pairs.push((low, high));
    }
    Ok(AttrValue::IntPairs(pairs))
}

/// One of a fixed set of words.
pub fn choice(value: Option<&str>, choices: &[&str]) -> Result<AttrValue, String> {
    let text = value
        .ok_or_else(|| format!("must supply an argument; choose from {}", choices.join(", ")))?;
    let lowered = text.trim().to_lowercase();
    if choices.contains(&lowered.as_str()) {
        Ok(AttrValue::Str(lowered))
    } else {
        Err(format!(
            "\"{}\" unknown; choose from {}",
            text,
            choices.join(", ")
        ))
    }
}
