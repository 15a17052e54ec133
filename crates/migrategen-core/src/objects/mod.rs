//! Views, stored procedures and triggers
//!
//! These carry no ordering constraints between each other; they are emitted
//! after every table. Normalization strips the account- and server-specific
//! clauses the engine adds to its `SHOW CREATE ...` output.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DEFINER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*DEFINER\s*=\s*(`[^`]*`|'[^']*'|[^\s@]+)(@(`[^`]*`|'[^']*'|[^\s]+))?")
        .expect("valid regex")
});

static ALGORITHM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*ALGORITHM\s*=\s*\w+").expect("valid regex"));

static SQL_SECURITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*SQL\s+SECURITY\s+\w+").expect("valid regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `SHOW CREATE VIEW` row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawView {
    #[serde(rename = "View", alias = "view", alias = "name")]
    pub name: String,
    #[serde(rename = "Create View", alias = "definition")]
    pub definition: String,
}

/// `SHOW CREATE PROCEDURE` row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProcedure {
    #[serde(rename = "Procedure", alias = "procedure", alias = "name")]
    pub name: String,
    #[serde(rename = "Create Procedure", alias = "definition")]
    pub definition: String,
}

/// `SHOW TRIGGERS` row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrigger {
    #[serde(rename = "Trigger", alias = "trigger", alias = "name")]
    pub name: String,
    #[serde(rename = "Table", alias = "table")]
    pub table: String,
    #[serde(rename = "Timing", alias = "timing")]
    pub timing: String,
    #[serde(rename = "Event", alias = "event")]
    pub event: String,
    #[serde(rename = "Statement", alias = "statement")]
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDescriptor {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub name: String,
    pub table: String,
    /// `BEFORE` or `AFTER`
    pub timing: String,
    /// `INSERT`, `UPDATE` or `DELETE`
    pub event: String,
    pub statement: String,
}

impl TriggerDescriptor {
    /// Render the trigger as a `CREATE TRIGGER` statement
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE TRIGGER `{}` {} {} ON `{}` FOR EACH ROW {}",
            self.name, self.timing, self.event, self.table, self.statement
        )
    }
}

/// Strip engine-specific clauses from a view definition.
///
/// When `database` is given, `` `database`. `` qualifiers are removed so the
/// definition can be replayed against a differently-named database.
pub fn sanitize_view_definition(definition: &str, database: Option<&str>) -> String {
    let mut text = DEFINER_REGEX.replace_all(definition, "").into_owned();
    text = ALGORITHM_REGEX.replace_all(&text, "").into_owned();
    text = SQL_SECURITY_REGEX.replace_all(&text, "").into_owned();

    if let Some(database) = database.filter(|d| !d.is_empty()) {
        text = text.replace(&format!("`{database}`."), "");
    }

    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

pub fn normalize_view(raw: &RawView, database: Option<&str>) -> ViewDescriptor {
    ViewDescriptor {
        name: raw.name.trim().to_string(),
        definition: sanitize_view_definition(&raw.definition, database),
    }
}

pub fn normalize_procedure(raw: &RawProcedure) -> ProcedureDescriptor {
    // procedure bodies keep their line structure
    let definition = DEFINER_REGEX.replace(&raw.definition, "");
    ProcedureDescriptor {
        name: raw.name.trim().to_string(),
        definition: definition.trim().to_string(),
    }
}

pub fn normalize_trigger(raw: &RawTrigger) -> TriggerDescriptor {
    let statement = DEFINER_REGEX.replace(&raw.statement, "");
    TriggerDescriptor {
        name: raw.name.trim().to_string(),
        table: raw.table.trim().to_string(),
        timing: raw.timing.trim().to_uppercase(),
        event: raw.event.trim().to_uppercase(),
        statement: statement.trim().to_string(),
    }
}
