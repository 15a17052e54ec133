//! Schema builder - converts a raw snapshot into a Catalog

use crate::error::{Diagnostic, DiagnosticKind, SchemaError};
use crate::mapper::{TargetFramework, TypeMapper};
use crate::objects::{normalize_procedure, normalize_trigger, normalize_view};
use crate::schema::{
    build_column_descriptor, dependencies_from_catalog, extract_dependencies_lenient, Catalog,
    Dependency, ForeignKeyRow, RawTable, SchemaSnapshot, TableDescriptor,
};

/// Builder for constructing a Catalog from raw schema metadata
pub struct SchemaBuilder {
    catalog: Catalog,
    diagnostics: Vec<Diagnostic>,
    mapper: Box<dyn TypeMapper>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_target(TargetFramework::default())
    }

    /// Create a builder that maps column types for the given target
    pub fn with_target(target: TargetFramework) -> Self {
        Self::with_mapper(target.type_mapper())
    }

    pub fn with_mapper(mapper: Box<dyn TypeMapper>) -> Self {
        Self {
            catalog: Catalog::new(),
            diagnostics: Vec::new(),
            mapper,
        }
    }

    /// Add every table and schema object of a snapshot
    pub fn add_snapshot(&mut self, snapshot: &SchemaSnapshot) {
        for table in &snapshot.tables {
            self.add_table(table, &snapshot.foreign_keys);
        }

        let database = snapshot.database.as_deref();
        self.catalog
            .views
            .extend(snapshot.views.iter().map(|v| normalize_view(v, database)));
        self.catalog
            .procedures
            .extend(snapshot.procedures.iter().map(normalize_procedure));
        self.catalog
            .triggers
            .extend(snapshot.triggers.iter().map(normalize_trigger));
    }

    /// Assemble one table's descriptor.
    ///
    /// A malformed column type aborts only this table; malformed foreign key
    /// clauses are skipped with a warning.
    pub fn add_table(&mut self, raw: &RawTable, foreign_keys: &[ForeignKeyRow]) {
        tracing::debug!(table = %raw.name, columns = raw.columns.len(), "building table");

        let mut table = TableDescriptor::new(&raw.name);
        for raw_column in &raw.columns {
            match build_column_descriptor(raw_column, self.mapper.as_ref()) {
                Ok(column) => table.columns.push(column),
                Err(err) => {
                    self.push_error(&raw.name, err);
                    return;
                }
            }
        }

        table.dependencies = self.collect_dependencies(raw, foreign_keys);

        if self.catalog.table_exists(&raw.name) {
            self.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::DuplicateTable,
                    format!(
                        "table '{}' appears more than once; keeping the last one",
                        raw.name
                    ),
                )
                .with_table(&raw.name),
            );
        }
        self.catalog.add_table(table);
    }

    /// Catalog rows take precedence; the DDL text is the fallback
    fn collect_dependencies(
        &mut self,
        raw: &RawTable,
        rows: &[ForeignKeyRow],
    ) -> Vec<Dependency> {
        if rows
            .iter()
            .any(|r| r.table_name == raw.name && r.is_foreign_key())
        {
            match dependencies_from_catalog(&raw.name, rows) {
                Ok(dependencies) => return dependencies,
                Err(err) => self.push_warning(&raw.name, err),
            }
        }

        let Some(ddl) = raw.create_statement.as_deref() else {
            return Vec::new();
        };
        let (dependencies, errors) = extract_dependencies_lenient(&raw.name, ddl);
        for err in errors {
            self.push_warning(&raw.name, err);
        }
        dependencies
    }

    fn push_error(&mut self, table: &str, err: SchemaError) {
        tracing::warn!(table, "skipping table: {err}");
        self.diagnostics.push(
            Diagnostic::error(err.kind(), err.to_string())
                .with_table(table)
                .with_help("the table is left out of the plan"),
        );
    }

    fn push_warning(&mut self, table: &str, err: SchemaError) {
        self.diagnostics
            .push(Diagnostic::warning(err.kind(), err.to_string()).with_table(table));
    }

    /// Report foreign keys pointing outside the catalog
    fn check_references(&mut self) {
        let mut unknown = Vec::new();
        for table in self.catalog.tables.values() {
            for referenced in table.referenced_tables() {
                if !self.catalog.table_exists(referenced) {
                    unknown.push((table.table.clone(), referenced.to_string()));
                }
            }
        }

        for (table, referenced) in unknown {
            self.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnknownReference,
                    format!(
                        "table '{}' references '{}' which is not in the snapshot",
                        table, referenced
                    ),
                )
                .with_table(table)
                .with_help("the reference does not constrain the emission order"),
            );
        }
    }

    /// Consume the builder and return the catalog
    pub fn build(mut self) -> (Catalog, Vec<Diagnostic>) {
        self.check_references();
        (self.catalog, self.diagnostics)
    }

    /// Get a reference to the current catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
