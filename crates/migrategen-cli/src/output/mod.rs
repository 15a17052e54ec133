//! Output formatting

use miette::{IntoDiagnostic, Result};
use migrategen_core::{Catalog, Diagnostic, MigrationPlan, Severity, TableDescriptor};

use crate::args::OutputFormat;

/// Output formatter for plans and diagnostics
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print the plan and the diagnostics collected while building it
    pub fn print_plan(&self, plan: &MigrationPlan, diagnostics: &[Diagnostic]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_human_diagnostics(diagnostics);
                self.print_human_plan(plan);
                Ok(())
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "snapshot": self.file_name,
                    "plan": plan,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
                Ok(())
            }
        }
    }

    /// Print diagnostics alone, used when no plan could be produced
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        match self.format {
            OutputFormat::Human => self.print_human_diagnostics(diagnostics),
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "snapshot": self.file_name,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
            }
        }
        Ok(())
    }

    fn print_human_diagnostics(&self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, diag.code(), diag.message);
            match &diag.table {
                Some(table) => eprintln!("  --> {} (table `{}`)", self.file_name, table),
                None => eprintln!("  --> {}", self.file_name),
            }
            if let Some(help) = &diag.help {
                eprintln!("   = help: {}", help);
            }
            eprintln!();
        }
    }

    fn print_human_plan(&self, plan: &MigrationPlan) {
        println!("Migration plan for {}:", self.file_name);
        println!("==================");

        for (i, table) in plan.tables.iter().enumerate() {
            println!("{:>3}. table {}{}", i + 1, table.table, depends_on(table));
        }

        let mut step = plan.tables.len();
        for view in &plan.views {
            step += 1;
            println!("{:>3}. view {}", step, view.name);
        }
        for procedure in &plan.procedures {
            step += 1;
            println!("{:>3}. procedure {}", step, procedure.name);
        }
        for trigger in &plan.triggers {
            step += 1;
            println!("{:>3}. trigger {} on {}", step, trigger.name, trigger.table);
        }
    }
}

/// Print every table's columns with raw and mapped types
pub fn print_schema(catalog: &Catalog) {
    let graph = catalog.dependency_graph();

    println!("Schema Information:");
    println!("==================");
    for (table_name, table) in &catalog.tables {
        println!("\nTable: {}", table_name);
        for col in &table.columns {
            let nullable = if col.options.nullable { "NULL" } else { "NOT NULL" };
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY");
            }
            if col.is_auto_increment() {
                flags.push("AUTO_INCREMENT");
            }
            println!(
                "  - {} {} -> {} {} {}",
                col.name,
                col.type_info.display_name(),
                col.mapped_type,
                nullable,
                flags.join(" ")
            );
        }
        for dep in &table.dependencies {
            println!(
                "  * {} -> {}.{} (ON DELETE {}, ON UPDATE {})",
                dep.source_column,
                dep.referenced_table,
                dep.referenced_column,
                dep.on_delete,
                dep.on_update
            );
        }
        let dependents = graph.dependents_of(table_name);
        if !dependents.is_empty() {
            println!("  referenced by: {}", dependents.join(", "));
        }
    }
}

fn depends_on(table: &TableDescriptor) -> String {
    let referenced = table.referenced_tables();
    if referenced.is_empty() {
        String::new()
    } else {
        format!(" (after {})", referenced.join(", "))
    }
}
