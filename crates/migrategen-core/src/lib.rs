//! migrategen-core: schema introspection ordering library
//!
//! This library turns already-fetched database metadata (column listings,
//! `CREATE TABLE` text, foreign key catalog rows) into type-mapped table
//! descriptors ordered so that referenced tables are created first.

pub mod error;
pub mod mapper;
pub mod objects;
pub mod order;
pub mod schema;
pub mod types;

pub use error::{Diagnostic, DiagnosticKind, SchemaError, Severity};
pub use mapper::{TargetFramework, TypeMapper};
pub use order::{order_tables, DependencyGraph};
pub use schema::{
    build_column_descriptor, extract_dependencies, Catalog, ColumnDescriptor, Dependency,
    MigrationPlan, SchemaBuilder, SchemaSnapshot, TableDescriptor,
};
pub use types::{classify_type, TypeInfo};
