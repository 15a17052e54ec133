//! Target framework type mapping
//!
//! The column model stays framework-agnostic; a [`TypeMapper`] turns a native
//! engine type name into the name the generated migration code uses.

use std::str::FromStr;

/// Maps native engine type names to target framework type names
pub trait TypeMapper: Send + Sync {
    fn map(&self, native: &str) -> String;
}

/// Supported code generation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFramework {
    Laravel,
    Doctrine,
    /// Lower-cased native names
    #[default]
    Identity,
}

impl TargetFramework {
    /// Get the type mapper for this target
    pub fn type_mapper(&self) -> Box<dyn TypeMapper> {
        match self {
            TargetFramework::Laravel => Box::new(TableMapper::new(LARAVEL_TYPES)),
            TargetFramework::Doctrine => Box::new(TableMapper::new(DOCTRINE_TYPES)),
            TargetFramework::Identity => Box::new(IdentityMapper),
        }
    }

    /// Resolve a configuration key, falling back to [`TargetFramework::Identity`]
    pub fn from_config_key(key: &str) -> Self {
        match key.parse() {
            Ok(target) => target,
            Err(message) => {
                tracing::warn!("{message}; using identity type mapping");
                TargetFramework::Identity
            }
        }
    }
}

impl FromStr for TargetFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "laravel" | "illuminate" => Ok(TargetFramework::Laravel),
            "doctrine" | "dbal" => Ok(TargetFramework::Doctrine),
            "identity" | "none" | "" => Ok(TargetFramework::Identity),
            _ => Err(format!(
                "Unknown target framework: '{}'. Supported targets: laravel, doctrine, identity.",
                s
            )),
        }
    }
}

impl std::fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetFramework::Laravel => write!(f, "laravel"),
            TargetFramework::Doctrine => write!(f, "doctrine"),
            TargetFramework::Identity => write!(f, "identity"),
        }
    }
}

/// Passes native names through lower-cased
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl TypeMapper for IdentityMapper {
    fn map(&self, native: &str) -> String {
        native.to_lowercase()
    }
}

/// Mapper backed by a static `(native, mapped)` table
#[derive(Debug, Clone, Copy)]
pub struct TableMapper {
    entries: &'static [(&'static str, &'static str)],
}

impl TableMapper {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Exact match first, then the longest native name contained in the input
    fn lookup(&self, native: &str) -> Option<&'static str> {
        let lowered = native.trim().to_lowercase();

        if let Some((_, mapped)) = self
            .entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&lowered))
        {
            return Some(mapped);
        }

        self.entries
            .iter()
            .filter(|(name, _)| lowered.contains(name))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, mapped)| *mapped)
    }
}

impl TypeMapper for TableMapper {
    fn map(&self, native: &str) -> String {
        match self.lookup(native) {
            Some(mapped) => mapped.to_string(),
            None => native.trim().to_lowercase(),
        }
    }
}

/// Laravel schema builder column methods
const LARAVEL_TYPES: &[(&str, &str)] = &[
    ("tinyint", "tinyInteger"),
    ("smallint", "smallInteger"),
    ("mediumint", "mediumInteger"),
    ("int", "integer"),
    ("integer", "integer"),
    ("bigint", "bigInteger"),
    ("decimal", "decimal"),
    ("numeric", "decimal"),
    ("float", "float"),
    ("double", "double"),
    ("real", "double"),
    ("bit", "boolean"),
    ("boolean", "boolean"),
    ("char", "char"),
    ("varchar", "string"),
    ("tinytext", "tinyText"),
    ("text", "text"),
    ("mediumtext", "mediumText"),
    ("longtext", "longText"),
    ("binary", "binary"),
    ("varbinary", "binary"),
    ("blob", "binary"),
    ("longblob", "binary"),
    ("enum", "enum"),
    ("set", "set"),
    ("json", "json"),
    ("date", "date"),
    ("datetime", "dateTime"),
    ("timestamp", "timestamp"),
    ("time", "time"),
    ("year", "year"),
    ("geometry", "geometry"),
    ("point", "point"),
];

/// Doctrine DBAL type names
const DOCTRINE_TYPES: &[(&str, &str)] = &[
    ("tinyint", "smallint"),
    ("smallint", "smallint"),
    ("mediumint", "integer"),
    ("int", "integer"),
    ("integer", "integer"),
    ("bigint", "bigint"),
    ("decimal", "decimal"),
    ("numeric", "decimal"),
    ("float", "float"),
    ("double", "float"),
    ("bit", "boolean"),
    ("boolean", "boolean"),
    ("char", "string"),
    ("varchar", "string"),
    ("text", "text"),
    ("blob", "blob"),
    ("binary", "binary"),
    ("varbinary", "binary"),
    ("enum", "string"),
    ("json", "json"),
    ("date", "date"),
    ("datetime", "datetime"),
    ("timestamp", "datetime"),
    ("time", "time"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_beats_substring() {
        let mapper = TargetFramework::Laravel.type_mapper();
        assert_eq!(mapper.map("tinyint"), "tinyInteger");
        assert_eq!(mapper.map("int"), "integer");
        assert_eq!(mapper.map("BIGINT"), "bigInteger");
    }

    #[test]
    fn test_longest_substring_wins() {
        let mapper = TableMapper::new(LARAVEL_TYPES);
        // no exact entry, but both "int" and "tinyint" are contained
        assert_eq!(mapper.map("unsigned tinyint"), "tinyInteger");
        assert_eq!(mapper.map("longtext"), "longText");
    }

    #[test]
    fn test_unmatched_passes_through_lowercased() {
        let mapper = TargetFramework::Doctrine.type_mapper();
        assert_eq!(mapper.map("GEOMETRY"), "geometry");
    }

    #[test]
    fn test_identity_mapper() {
        let mapper = TargetFramework::Identity.type_mapper();
        assert_eq!(mapper.map("VarChar"), "varchar");
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!(
            "Laravel".parse::<TargetFramework>(),
            Ok(TargetFramework::Laravel)
        );
        assert!("rails".parse::<TargetFramework>().is_err());
    }

    #[test]
    fn test_unknown_config_key_falls_back_to_identity() {
        assert_eq!(
            TargetFramework::from_config_key("rails"),
            TargetFramework::Identity
        );
        assert_eq!(
            TargetFramework::from_config_key("doctrine"),
            TargetFramework::Doctrine
        );
    }
}
