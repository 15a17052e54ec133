//! Error and diagnostic types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning raw metadata into ordered descriptors
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum SchemaError {
    /// A column type string could not be classified
    #[error("malformed column type '{raw}'{}: {reason}", column_suffix(.column))]
    #[diagnostic(code(migrategen::malformed_type))]
    MalformedType {
        column: Option<String>,
        raw: String,
        reason: String,
    },

    /// A constraint clause was present but could not be read
    #[error("malformed constraint in table '{table}': {reason}")]
    #[diagnostic(
        code(migrategen::malformed_ddl),
        help("the clause is skipped; check the CREATE TABLE text returned by the engine")
    )]
    MalformedDdl { table: String, reason: String },

    /// The dependency graph has no valid topological order
    #[error("unresolved foreign key cycle between tables: {}", .tables.join(" -> "))]
    #[diagnostic(
        code(migrategen::unresolved_cycle),
        help("break the cycle by creating one of the foreign keys in a later migration")
    )]
    UnresolvedCycle { tables: Vec<String> },
}

impl SchemaError {
    pub fn malformed_type(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedType {
            column: None,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_ddl(table: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedDdl {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Attach the column name to a `MalformedType` error
    pub fn for_column(self, name: &str) -> Self {
        match self {
            SchemaError::MalformedType { raw, reason, .. } => SchemaError::MalformedType {
                column: Some(name.to_string()),
                raw,
                reason,
            },
            other => other,
        }
    }

    /// Diagnostic kind matching this error
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            SchemaError::MalformedType { .. } => DiagnosticKind::MalformedType,
            SchemaError::MalformedDdl { .. } => DiagnosticKind::MalformedDdl,
            SchemaError::UnresolvedCycle { .. } => DiagnosticKind::UnresolvedCycle,
        }
    }
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(name) => format!(" for column '{name}'"),
        None => String::new(),
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic collected while assembling a catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub table: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            table: None,
            help: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            table: None,
            help: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the diagnostic code string (e.g., "E0001")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// E0001: Column type could not be classified
    MalformedType,
    /// E0002: Constraint clause could not be read
    MalformedDdl,
    /// E0003: Foreign keys form a cycle
    UnresolvedCycle,
    /// E0004: Foreign key references a table outside the snapshot
    UnknownReference,
    /// E0005: Same table name listed twice in the snapshot
    DuplicateTable,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedType => "E0001",
            DiagnosticKind::MalformedDdl => "E0002",
            DiagnosticKind::UnresolvedCycle => "E0003",
            DiagnosticKind::UnknownReference => "E0004",
            DiagnosticKind::DuplicateTable => "E0005",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedType => "malformed-type",
            DiagnosticKind::MalformedDdl => "malformed-ddl",
            DiagnosticKind::UnresolvedCycle => "unresolved-cycle",
            DiagnosticKind::UnknownReference => "unknown-reference",
            DiagnosticKind::DuplicateTable => "duplicate-table",
        }
    }
}
