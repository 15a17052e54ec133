//! Schema catalog - raw snapshot input and assembled table descriptors

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::objects::{
    ProcedureDescriptor, RawProcedure, RawTrigger, RawView, TriggerDescriptor, ViewDescriptor,
};
use crate::order::{order_tables, DependencyGraph};
use crate::schema::{ColumnDescriptor, Dependency, ForeignKeyRow, RawColumn};

/// Already-fetched raw metadata for one database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Database name, used to strip qualifiers from view definitions
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    /// Foreign key catalog rows for every table
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyRow>,
    #[serde(default)]
    pub views: Vec<RawView>,
    #[serde(default)]
    pub procedures: Vec<RawProcedure>,
    #[serde(default)]
    pub triggers: Vec<RawTrigger>,
}

impl SchemaSnapshot {
    /// Drop the named tables and any trigger attached to them
    pub fn exclude_tables(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let excluded = |table: &str| names.iter().any(|n| n.eq_ignore_ascii_case(table));
        self.tables.retain(|t| !excluded(&t.name));
        self.foreign_keys.retain(|r| !excluded(&r.table_name));
        self.triggers.retain(|t| !excluded(&t.table));
    }
}

/// Raw metadata of one table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<RawColumn>,
    /// `SHOW CREATE TABLE` text
    #[serde(default, alias = "ddl")]
    pub create_statement: Option<String>,
}

impl RawTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            create_statement: None,
        }
    }

    pub fn with_column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_create_statement(mut self, ddl: impl Into<String>) -> Self {
        self.create_statement = Some(ddl.into());
        self
    }
}

/// Normalized table, the unit the orderer places
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub dependencies: Vec<Dependency>,
    /// Set once every referenced table has been placed ahead of this one
    pub resolved: bool,
}

impl TableDescriptor {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            dependencies: Vec::new(),
            resolved: false,
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Shorthand for a foreign key `column -> referenced_table.id`
    pub fn references(self, column: &str, referenced_table: &str) -> Self {
        let dependency = Dependency::new(self.table.clone(), column, referenced_table, "id");
        self.with_dependency(dependency)
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Tables this one must follow, excluding itself, in declaration order
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for dep in &self.dependencies {
            if !dep.is_self_referencing() && !tables.contains(&dep.referenced_table.as_str()) {
                tables.push(&dep.referenced_table);
            }
        }
        tables
    }
}

/// Assembled descriptors for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Table name -> descriptor, in first-discovery order
    pub tables: IndexMap<String, TableDescriptor>,
    pub views: Vec<ViewDescriptor>,
    pub procedures: Vec<ProcedureDescriptor>,
    pub triggers: Vec<TriggerDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: TableDescriptor) {
        self.tables.insert(table.table.clone(), table);
    }

    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Foreign key graph over a copy of the current tables
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::new(self.tables.clone())
    }

    /// Order the tables and bundle them with the other schema objects
    pub fn into_plan(self) -> Result<MigrationPlan, SchemaError> {
        let tables = order_tables(self.tables)?;
        Ok(MigrationPlan {
            tables,
            views: self.views,
            procedures: self.procedures,
            triggers: self.triggers,
        })
    }
}

/// Emission order for the code generator: tables first, then views,
/// procedures and triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub tables: Vec<TableDescriptor>,
    pub views: Vec<ViewDescriptor>,
    pub procedures: Vec<ProcedureDescriptor>,
    pub triggers: Vec<TriggerDescriptor>,
}

impl MigrationPlan {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_tables_skips_self_and_duplicates() {
        let table = TableDescriptor::new("comments")
            .references("post_id", "posts")
            .references("parent_id", "comments")
            .references("edited_post_id", "posts");

        assert_eq!(table.referenced_tables(), vec!["posts"]);
    }

    #[test]
    fn test_catalog_add_table() {
        let mut catalog = Catalog::new();
        catalog.add_table(TableDescriptor::new("users"));
        catalog.add_table(TableDescriptor::new("posts"));

        assert!(catalog.table_exists("users"));
        assert_eq!(catalog.table_names(), vec!["users", "posts"]);
    }

    #[test]
    fn test_dependency_graph_lists_dependents() {
        let mut catalog = Catalog::new();
        catalog.add_table(TableDescriptor::new("users"));
        catalog.add_table(TableDescriptor::new("posts").references("user_id", "users"));
        catalog.add_table(TableDescriptor::new("tags"));

        let graph = catalog.dependency_graph();
        assert_eq!(graph.dependents_of("users"), vec!["posts"]);
        assert!(graph.dependents_of("tags").is_empty());
        assert_eq!(graph.dependencies_of("posts"), vec!["users"]);
        // the catalog keeps its tables
        assert_eq!(catalog.table_names(), vec!["users", "posts", "tags"]);
    }

    #[test]
    fn test_exclude_tables_drops_related_rows() {
        let mut snapshot = SchemaSnapshot {
            tables: vec![RawTable::new("migrations"), RawTable::new("users")],
            triggers: vec![RawTrigger {
                name: "t".into(),
                table: "Migrations".into(),
                ..RawTrigger::default()
            }],
            ..SchemaSnapshot::default()
        };

        snapshot.exclude_tables(&["migrations".to_string()]);
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].name, "users");
        assert!(snapshot.triggers.is_empty());
    }
}
