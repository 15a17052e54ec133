//! Column type classification

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Structured view of a raw engine type string such as `decimal(10,2) unsigned`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Base type name, case preserved
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<TypeLength>,
    /// Only computed for integer and decimal types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<bool>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned.unwrap_or(false)
    }

    /// Get a human-readable rendering of this type
    pub fn display_name(&self) -> String {
        let mut out = self.name.clone();
        match (self.precision, self.scale, &self.length) {
            (Some(p), Some(s), _) => out.push_str(&format!("({p},{s})")),
            (Some(p), None, _) => out.push_str(&format!("({p})")),
            (None, _, Some(length)) => out.push_str(&format!("({length})")),
            _ => {}
        }
        if self.is_unsigned() {
            out.push_str(" unsigned");
        }
        out
    }
}

/// Length argument of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeLength {
    Fixed(u64),
    /// Non-numeric argument kept verbatim, e.g. the value list of an enum
    Symbolic(String),
}

impl std::fmt::Display for TypeLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeLength::Fixed(n) => write!(f, "{}", n),
            TypeLength::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a raw type string into a [`TypeInfo`]
pub fn classify_type(raw: &str) -> Result<TypeInfo, SchemaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::malformed_type(raw, "empty type string"));
    }

    let (base, args) = match trimmed.split_once('(') {
        Some((left, rest)) => {
            let close = rest
                .rfind(')')
                .ok_or_else(|| SchemaError::malformed_type(raw, "unclosed parenthesis"))?;
            (left.trim(), Some(&rest[..close]))
        }
        // "bigint unsigned" has no parenthesized part; the modifiers follow the name
        None => (trimmed.split_whitespace().next().unwrap_or(trimmed), None),
    };
    if base.is_empty() {
        return Err(SchemaError::malformed_type(raw, "missing base type name"));
    }

    let mut info = TypeInfo::new(base);
    let lowered = base.to_ascii_lowercase();
    let unsigned = trimmed.to_ascii_lowercase().contains("unsigned");

    if lowered == "decimal" {
        info.unsigned = Some(unsigned);
        if let Some(args) = args {
            let mut parts = args.split(',').map(str::trim);
            info.precision = parse_numeric_arg(raw, parts.next(), "precision")?;
            info.scale = parse_numeric_arg(raw, parts.next(), "scale")?;
        }
        return Ok(info);
    }

    if lowered.contains("int") {
        info.unsigned = Some(unsigned);
    }
    info.length = args.and_then(parse_length);

    Ok(info)
}

fn parse_numeric_arg(
    raw: &str,
    part: Option<&str>,
    what: &str,
) -> Result<Option<u32>, SchemaError> {
    match part {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<u32>().map(Some).map_err(|_| {
            SchemaError::malformed_type(raw, format!("{what} '{text}' is not an integer"))
        }),
    }
}

fn parse_length(args: &str) -> Option<TypeLength> {
    let args = args.trim();
    if args.is_empty() {
        return None;
    }
    Some(match args.parse::<u64>() {
        Ok(n) => TypeLength::Fixed(n),
        Err(_) => TypeLength::Symbolic(args.to_string()),
    })
}
