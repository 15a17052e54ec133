//! Foreign key dependency ordering
//!
//! Tables are emitted so that every table referenced by a foreign key comes
//! before the table holding the key. The graph is walked depth-first in input
//! order, pulling referenced tables forward the first time they are reached,
//! so tables without a constraint between them keep their discovery order.

use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::schema::TableDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Pending,
    /// On the current DFS path
    Visiting,
    Placed,
}

/// Table graph owned by a single ordering call
#[derive(Debug)]
pub struct DependencyGraph {
    tables: IndexMap<String, TableDescriptor>,
    /// Per table, indices of the tables it references (self and external references excluded)
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn new(tables: IndexMap<String, TableDescriptor>) -> Self {
        let edges = tables
            .values()
            .map(|table| {
                let mut targets = Vec::new();
                for referenced in table.referenced_tables() {
                    match tables.get_index_of(referenced) {
                        Some(idx) => targets.push(idx),
                        None => tracing::warn!(
                            table = %table.table,
                            referenced,
                            "foreign key references a table outside the set; ignoring for ordering"
                        ),
                    }
                }
                targets
            })
            .collect();

        Self { tables, edges }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables that must be emitted before `table`
    pub fn dependencies_of(&self, table: &str) -> Vec<&str> {
        let Some(idx) = self.tables.get_index_of(table) else {
            return Vec::new();
        };
        self.edges[idx].iter().map(|&dep| self.name(dep)).collect()
    }

    /// Tables that hold a foreign key to `table`
    pub fn dependents_of(&self, table: &str) -> Vec<&str> {
        let Some(target) = self.tables.get_index_of(table) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, targets)| targets.contains(&target))
            .map(|(idx, _)| self.name(idx))
            .collect()
    }

    fn name(&self, idx: usize) -> &str {
        self.tables
            .get_index(idx)
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    /// Consume the graph and return the descriptors in emission order
    pub fn into_order(self) -> Result<Vec<TableDescriptor>, SchemaError> {
        let count = self.tables.len();
        let mut marks = vec![Mark::Pending; count];
        let mut order: Vec<usize> = Vec::with_capacity(count);

        for root in 0..count {
            if marks[root] != Mark::Pending {
                continue;
            }

            marks[root] = Mark::Visiting;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                match self.edges[node].get(cursor) {
                    Some(&dep) => {
                        frame.1 += 1;
                        match marks[dep] {
                            Mark::Placed => {}
                            Mark::Pending => {
                                marks[dep] = Mark::Visiting;
                                stack.push((dep, 0));
                            }
                            Mark::Visiting => return Err(self.cycle_error(&stack, dep)),
                        }
                    }
                    None => {
                        stack.pop();
                        marks[node] = Mark::Placed;
                        order.push(node);
                    }
                }
            }
        }

        tracing::debug!(tables = order.len(), "resolved emission order");

        let mut slots: Vec<Option<TableDescriptor>> =
            self.tables.into_values().map(Some).collect();
        let mut ordered = Vec::with_capacity(count);
        for idx in order {
            if let Some(mut table) = slots[idx].take() {
                table.resolved = true;
                ordered.push(table);
            }
        }
        Ok(ordered)
    }

    /// Build the error for a back edge to `target`, listing the cycle path
    fn cycle_error(&self, stack: &[(usize, usize)], target: usize) -> SchemaError {
        let start = stack
            .iter()
            .position(|&(node, _)| node == target)
            .unwrap_or(0);
        let mut tables: Vec<String> = stack[start..]
            .iter()
            .map(|&(node, _)| self.name(node).to_string())
            .collect();
        tables.push(self.name(target).to_string());

        tracing::debug!(?tables, "foreign key cycle detected");
        SchemaError::UnresolvedCycle { tables }
    }
}

/// Order tables so referenced tables precede the tables referencing them.
///
/// Self-referencing foreign keys never block a table. Foreign keys to tables
/// missing from `tables` are ignored. Fails with
/// [`SchemaError::UnresolvedCycle`] when two or more tables reference each
/// other in a cycle.
pub fn order_tables(
    tables: IndexMap<String, TableDescriptor>,
) -> Result<Vec<TableDescriptor>, SchemaError> {
    DependencyGraph::new(tables).into_order()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table_map(tables: Vec<TableDescriptor>) -> IndexMap<String, TableDescriptor> {
        tables.into_iter().map(|t| (t.table.clone(), t)).collect()
    }

    fn names(ordered: &[TableDescriptor]) -> Vec<&str> {
        ordered.iter().map(|t| t.table.as_str()).collect()
    }

    #[test]
    fn test_chain_is_ordered() {
        let tables = table_map(vec![
            TableDescriptor::new("todos").references("category_id", "categories"),
            TableDescriptor::new("categories").references("user_id", "users"),
            TableDescriptor::new("users"),
        ]);

        let ordered = order_tables(tables).unwrap();
        assert_eq!(names(&ordered), vec!["users", "categories", "todos"]);
        assert!(ordered.iter().all(|t| t.resolved));
    }

    #[test]
    fn test_independent_tables_keep_input_order() {
        let tables = table_map(vec![
            TableDescriptor::new("products"),
            TableDescriptor::new("users"),
            TableDescriptor::new("settings"),
        ]);

        let ordered = order_tables(tables).unwrap();
        assert_eq!(names(&ordered), vec!["products", "users", "settings"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let tables = table_map(vec![
            TableDescriptor::new("employees").references("manager_id", "employees"),
        ]);

        let ordered = order_tables(tables).unwrap();
        assert_eq!(names(&ordered), vec!["employees"]);
    }

    #[test]
    fn test_two_table_cycle_is_reported() {
        let tables = table_map(vec![
            TableDescriptor::new("a").references("b_id", "b"),
            TableDescriptor::new("b").references("a_id", "a"),
        ]);

        let err = order_tables(tables).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnresolvedCycle {
                tables: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_cycle_behind_independent_entry_is_reported() {
        let tables = table_map(vec![
            TableDescriptor::new("root"),
            TableDescriptor::new("x").references("root_id", "root").references("z_id", "z"),
            TableDescriptor::new("y").references("x_id", "x"),
            TableDescriptor::new("z").references("y_id", "y"),
        ]);

        match order_tables(tables) {
            Err(SchemaError::UnresolvedCycle { tables }) => {
                assert_eq!(tables, vec!["x", "z", "y", "x"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_external_reference_does_not_block() {
        let tables = table_map(vec![
            TableDescriptor::new("audit").references("tenant_id", "tenants"),
            TableDescriptor::new("users"),
        ]);

        let ordered = order_tables(tables).unwrap();
        assert_eq!(names(&ordered), vec!["audit", "users"]);
    }

    #[test]
    fn test_graph_queries() {
        let graph = DependencyGraph::new(table_map(vec![
            TableDescriptor::new("users"),
            TableDescriptor::new("posts").references("user_id", "users"),
            TableDescriptor::new("comments")
                .references("post_id", "posts")
                .references("user_id", "users"),
        ]));

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies_of("comments"), vec!["posts", "users"]);
        assert_eq!(graph.dependents_of("users"), vec!["posts", "comments"]);
        assert!(graph.dependencies_of("missing").is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(order_tables(IndexMap::new()).unwrap().is_empty());
    }
}
