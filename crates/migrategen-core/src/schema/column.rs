//! Column rows - raw column listing records and their normalized descriptors

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SchemaError;
use crate::mapper::TypeMapper;
use crate::types::{classify_type, TypeInfo};

/// One row of the engine's column listing (`SHOW FULL COLUMNS` shape)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    #[serde(rename = "Field", alias = "field", alias = "name")]
    pub field: String,
    #[serde(rename = "Type", alias = "type")]
    pub column_type: String,
    #[serde(rename = "Null", alias = "null", default)]
    pub null: String,
    #[serde(rename = "Key", alias = "key", default)]
    pub key: String,
    /// Scalar defaults (`0`, `true`) are kept as their text form
    #[serde(
        rename = "Default",
        alias = "default",
        default,
        deserialize_with = "deserialize_default"
    )]
    pub default: Option<String>,
    #[serde(rename = "Extra", alias = "extra", default)]
    pub extra: String,
}

impl RawColumn {
    pub fn new(field: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column_type: column_type.into(),
            null: "YES".to_string(),
            ..Self::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.null = "NO".to_string();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}

fn deserialize_default<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Unsigned(u64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(text) => text,
        Scalar::Integer(n) => n.to_string(),
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => u8::from(b).to_string(),
    }))
}

/// Per-column flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOptions {
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            nullable: true,
            default: None,
            auto_increment: None,
        }
    }
}

/// Normalized column, one per physical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub raw_type: String,
    pub type_info: TypeInfo,
    /// Type name in the target framework
    pub mapped_type: String,
    pub options: ColumnOptions,
    pub primary_key: bool,
}

impl ColumnDescriptor {
    pub fn is_auto_increment(&self) -> bool {
        self.options.auto_increment.unwrap_or(false)
    }
}

pub fn classify_options(raw: &RawColumn) -> ColumnOptions {
    let mut options = ColumnOptions {
        nullable: raw.null != "NO",
        ..ColumnOptions::default()
    };

    if let Some(default) = raw.default.as_deref().filter(|d| !d.is_empty()) {
        options.default = Some(default.to_string());
    }

    if raw.extra.trim().eq_ignore_ascii_case("auto_increment") {
        options.auto_increment = Some(true);
    }

    options
}

pub fn is_primary_key(raw: &RawColumn) -> bool {
    raw.key.trim().eq_ignore_ascii_case("PRI")
}

/// Build the normalized descriptor for one column row
pub fn build_column_descriptor(
    raw: &RawColumn,
    mapper: &dyn TypeMapper,
) -> Result<ColumnDescriptor, SchemaError> {
    let type_info = classify_type(&raw.column_type).map_err(|e| e.for_column(&raw.field))?;
    let mapped_type = mapper.map(&type_info.name);

    Ok(ColumnDescriptor {
        name: raw.field.clone(),
        raw_type: raw.column_type.clone(),
        mapped_type,
        options: classify_options(raw),
        primary_key: is_primary_key(raw),
        type_info,
    })
}
