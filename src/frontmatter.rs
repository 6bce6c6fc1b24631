//! Frontmatter splitting: the `---` delimited key-value block at the top of a page.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;

use crate::error::LoadError;

/// Delimiter line opening and closing a frontmatter block.
const DELIMITER: &str = "---";

/// A page split into its frontmatter fields and markdown body.
#[derive(Debug)]
pub struct Split<'a> {
    /// Markdown after the closing delimiter.
    pub body: &'a str,
    /// Number of source lines before `body` starts.
    pub body_offset: u32,
    /// Frontmatter keys, including unknown ones.
    pub fields: BTreeMap<String, Value>,
}

impl Split<'_> {
    /// A boolean field, treating anything but `true` as false.
    pub fn flag(&self, key: &str) -> bool {
        return self.fields.get(key).and_then(Value::as_bool).unwrap_or(false);
    }

    /// A trimmed, non-empty string field.
    pub fn text(&self, key: &str) -> Option<String> {
        let value = self.fields.get(key)?.as_str()?.trim();
        if value.is_empty() {
            return None;
        }
        return Some(value.to_string());
    }
}

/// Render a scalar key as a string. Frontmatter keys are almost always
/// strings, but YAML allows numbers and booleans too.
fn key_to_string(key: &Value) -> Option<String> {
    return match key {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    };
}

/// Parse the YAML between the delimiters into a key-value map.
///
/// # Errors
///
/// Returns `LoadError::FrontmatterSyntax` for malformed YAML and
/// `LoadError::FrontmatterNotMapping` for non-mapping documents.
fn parse_fields(file: &Path, yaml: &str) -> Result<BTreeMap<String, Value>, LoadError> {
    if yaml.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
        return LoadError::FrontmatterSyntax { file: file.to_path_buf(), reason: e.to_string() };
    })?;

    let mapping = match value {
        Value::Mapping(m) => m,
        Value::Null => return Ok(BTreeMap::new()),
        _ => return Err(LoadError::FrontmatterNotMapping { file: file.to_path_buf() }),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = key_to_string(&key) else {
            return Err(LoadError::FrontmatterNotMapping { file: file.to_path_buf() });
        };
        fields.insert(key, value);
    }
    return Ok(fields);
}

/// Split frontmatter from the body. A page without an opening delimiter on
/// its first line has no frontmatter.
///
/// # Errors
///
/// Returns `LoadError::FrontmatterUnterminated` when the opening delimiter has
/// no closing match, or a YAML error from the block itself.
pub fn split<'a>(file: &Path, text: &'a str) -> Result<Split<'a>, LoadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(Split { body: text, body_offset: 0, fields: BTreeMap::new() });
    };
    if first.trim_end() != DELIMITER {
        return Ok(Split { body: text, body_offset: 0, fields: BTreeMap::new() });
    }

    let yaml_start = first.len();
    let mut consumed = first.len();
    let mut line_count: u32 = 1;

    for line in lines {
        line_count = line_count.saturating_add(1);
        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == "..." {
            let yaml = text.get(yaml_start..consumed).unwrap_or("");
            let body_start = consumed.saturating_add(line.len());
            let body = text.get(body_start..).unwrap_or("");
            let fields = parse_fields(file, yaml)?;
            return Ok(Split { body, body_offset: line_count, fields });
        }
        consumed = consumed.saturating_add(line.len());
    }

    return Err(LoadError::FrontmatterUnterminated { file: file.to_path_buf() });
}
