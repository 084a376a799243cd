//! The Safe YAML Reader: size-bounded, tag-rejecting parsing with list-file
//! flattening.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::record::ResourceRecord;
use crate::value::Value;

pub const MAX_YAML_BYTES: u64 = 100 * 1024 * 1024;

/// YAML tag handles that denote plain scalar/collection types. Anything else
/// — most importantly language-specific constructor tags like
/// `!!python/object:...` or `!!ruby/object:...`, and arbitrary local tags
/// like `!Ref` — is refused outright rather than handed to the parser.
const ALLOWED_TAGS: &[&str] = &[
    "!!str",
    "!!int",
    "!!bool",
    "!!float",
    "!!null",
    "!!map",
    "!!seq",
    "!!binary",
    "!!timestamp",
    "!!set",
    "!!omap",
    "!!pairs",
    "!!merge",
];

pub struct SafeYamlReader {
    max_bytes: u64,
}

impl Default for SafeYamlReader {
    fn default() -> Self {
        Self { max_bytes: MAX_YAML_BYTES }
    }
}

impl SafeYamlReader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Reads and parses a single validated path into zero or more records,
    /// flattening `*List` documents into their individual items.
    pub fn read(&self, path: &Path) -> Result<Vec<ResourceRecord>> {
        let metadata = fs::metadata(path)?;
        if metadata.len() > self.max_bytes {
            return Err(Error::TooLarge { path: path.to_path_buf(), limit: self.max_bytes });
        }

        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        if let Some(line) = find_unsafe_tag_line(&text) {
            tracing::warn!(path = %path.display(), line, "rejecting YAML document with unsafe tag");
            return Err(Error::UnsafeYaml(path.to_path_buf()));
        }

        let value: Value = serde_saphyr::from_str(&text).map_err(|e| parse_error(path, &e))?;
        if value.is_null() {
            return Ok(Vec::new());
        }

        let kind = value.get_str_path(&["kind"]).unwrap_or_default();
        if let Some(item_kind) = kind.strip_suffix("List") {
            let items = value.get_path(&["items"]).and_then(Value::as_seq).unwrap_or(&[]);
            return Ok(items
                .iter()
                .cloned()
                .map(|item| {
                    let mut record = ResourceRecord::new(path.to_path_buf(), item);
                    record.backfill_kind(item_kind);
                    record
                })
                .collect());
        }

        Ok(vec![ResourceRecord::new(path.to_path_buf(), value)])
    }
}

fn parse_error(path: &Path, err: &impl std::fmt::Display) -> Error {
    let message = err.to_string();
    let line = extract_line_number(&message);
    Error::ParseError { path: path.to_path_buf(), line, message }
}

fn extract_line_number(message: &str) -> usize {
    let lower = message.to_lowercase();
    if let Some(pos) = lower.find("line ") {
        let rest = &message[pos + "line ".len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        return digits.parse().unwrap_or(0);
    }
    0
}

/// Returns the 1-based line number of the first disallowed tag, if any.
fn find_unsafe_tag_line(text: &str) -> Option<usize> {
    for (idx, raw_line) in text.lines().enumerate() {
        if let Some(tag) = first_tag_token(raw_line) {
            if !ALLOWED_TAGS.contains(&tag.as_str()) {
                return Some(idx + 1);
            }
        }
    }
    None
}

/// Finds the first `!`-prefixed tag token on a line, ignoring quoted
/// sections and `#` comments. This is a conservative lexical pre-pass run
/// before any YAML parsing happens at all.
fn first_tag_token(line: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' && !in_double {
            in_single = !in_single;
        } else if c == '"' && !in_single {
            in_double = !in_double;
        } else if c == '#' && !in_single && !in_double && (i == 0 || chars[i - 1].is_whitespace()) {
            break;
        } else if c == '!' && !in_single && !in_double && starts_a_node(&chars, i) {
            let start = i;
            let mut j = i;
            while j < chars.len() && !chars[j].is_whitespace() {
                j += 1;
            }
            return Some(chars[start..j].iter().collect());
        }
        i += 1;
    }
    None
}

/// A `!` only introduces a tag when it sits where a node is expected to
/// start: at the beginning of the (indentation-stripped) line, or right
/// after a mapping `:` or sequence `-` marker. Anything else — `!` appearing
/// mid-scalar, as in `deployed!now` — is just a character in a plain value.
fn starts_a_node(chars: &[char], i: usize) -> bool {
    let mut j = i;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    j == 0 || matches!(chars[j - 1], ':' | '-')
}
