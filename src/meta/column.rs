//! Canonical column descriptors and raw type tokenizing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, MetaResult};

/// Dialect-independent column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    Float,
    Bool,
    #[serde(rename = "datetime")]
    DateTime,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw-byte to boolean mapping for booleans stored in fixed-width binary
/// columns. Drivers hand these back as byte strings, not native booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapping {
    pub falsy: Vec<u8>,
    pub truthy: Vec<u8>,
}

impl ValueMapping {
    /// `0x00 -> false`, `0x01 -> true`.
    pub fn bit() -> Self {
        Self {
            falsy: vec![0x00],
            truthy: vec![0x01],
        }
    }

    pub fn decode(&self, raw: &[u8]) -> Option<bool> {
        if raw == self.truthy.as_slice() {
            Some(true)
        } else if raw == self.falsy.as_slice() {
            Some(false)
        } else {
            None
        }
    }

    pub fn encode(&self, value: bool) -> &[u8] {
        if value {
            &self.truthy
        } else {
            &self.falsy
        }
    }
}

/// One column of a table or view. Immutable once its Blueprint is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
    pub size: Option<u32>,
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    pub autoincrement: bool,
    pub unsigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_mapping: Option<ValueMapping>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
            comment: None,
            size: None,
            scale: None,
            enum_values: Vec::new(),
            autoincrement: false,
            unsigned: false,
            value_mapping: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }
}

/// A raw type string split into its parts.
///
/// `int(10) unsigned` gives base `int`, args `["10"]`, modifiers `unsigned`.
/// `enum('a','it''s')` gives base `enum`, args `["'a'", "'it''s'"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeSpec {
    pub base: String,
    pub args: Vec<String>,
    pub modifiers: String,
}

impl TypeSpec {
    pub fn parse(column: &str, raw: &str) -> MetaResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MetaError::malformed_type(column, raw));
        }

        let Some(open) = trimmed.find('(') else {
            if trimmed.contains(')') {
                return Err(MetaError::malformed_type(column, raw));
            }
            return Ok(Self {
                base: trimmed.to_lowercase(),
                args: Vec::new(),
                modifiers: String::new(),
            });
        };

        let base = trimmed[..open].trim().to_lowercase();
        if base.is_empty() {
            return Err(MetaError::malformed_type(column, raw));
        }

        let (args, rest) = split_args(&trimmed[open + 1..])
            .ok_or_else(|| MetaError::malformed_type(column, raw))?;

        Ok(Self {
            base,
            args,
            modifiers: rest.trim().to_lowercase(),
        })
    }

    /// First word of the base type.
    pub fn head(&self) -> &str {
        self.base.split_whitespace().next().unwrap_or("")
    }

    /// Size and scale from numeric arguments.
    pub fn size_and_scale(&self, column: &str, raw: &str) -> MetaResult<(Option<u32>, Option<u32>)> {
        let mut numbers = self.args.iter().map(|a| {
            a.parse::<u32>()
                .map_err(|_| MetaError::malformed_type(column, raw))
        });
        let size = numbers.next().transpose()?;
        let scale = numbers.next().transpose()?;
        Ok((size, scale))
    }

    /// Quoted literal arguments with the quotes removed and `''` unescaped.
    pub fn literals(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| {
                let inner = a
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .unwrap_or(a);
                inner.replace("''", "'")
            })
            .collect()
    }
}

/// Split the text after an opening paren into comma-separated arguments, up to
/// the matching close paren. Returns the arguments and whatever follows.
fn split_args(text: &str) -> Option<(Vec<String>, &str)> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' if in_quote => {
                current.push(c);
                if matches!(chars.peek(), Some((_, '\''))) {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quote = false;
                }
            }
            '\'' => {
                in_quote = true;
                current.push(c);
            }
            ',' if !in_quote => {
                args.push(current.trim().to_string());
                current.clear();
            }
            ')' if !in_quote => {
                let last = current.trim();
                if !last.is_empty() || !args.is_empty() {
                    args.push(last.to_string());
                }
                return Some((args, &text[i + 1..]));
            }
            _ => current.push(c),
        }
    }

    None
}
