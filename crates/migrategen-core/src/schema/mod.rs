//! Schema management module

mod builder;
mod catalog;
mod column;
mod foreign_key;

pub use builder::SchemaBuilder;
pub use catalog::{Catalog, MigrationPlan, RawTable, SchemaSnapshot, TableDescriptor};
pub use column::{
    build_column_descriptor, classify_options, is_primary_key, ColumnDescriptor, ColumnOptions,
    RawColumn,
};
pub use foreign_key::{
    dependencies_from_catalog, extract_dependencies, extract_dependencies_lenient, Dependency,
    ForeignKeyRow, ReferentialAction,
};
