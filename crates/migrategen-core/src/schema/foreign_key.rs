//! Foreign key extraction from `CREATE TABLE` text and FK catalog rows

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::SchemaError;

/// Marker introducing constraint clauses in the engine's DDL output
const CONSTRAINT_MARKER: &str = "CONSTRAINT";
const FOREIGN_KEY_MARKER: &str = "FOREIGN KEY";

/// A foreign key edge: `source_table.source_column -> referenced_table.referenced_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source_table: String,
    pub source_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl Dependency {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_update: ReferentialAction::default(),
            on_delete: ReferentialAction::default(),
            constraint_name: None,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn with_constraint_name(mut self, name: impl Into<String>) -> Self {
        self.constraint_name = Some(name.into());
        self
    }

    pub fn is_self_referencing(&self) -> bool {
        self.source_table == self.referenced_table
    }
}

/// `ON UPDATE` / `ON DELETE` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    /// Engine default when the rule is omitted
    #[default]
    Restrict,
    Cascade,
    SetNull,
    NoAction,
    SetDefault,
}

impl std::str::FromStr for ReferentialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            _ => Err(format!("unknown referential action '{}'", s.trim())),
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetDefault => "SET DEFAULT",
        };
        f.write_str(text)
    }
}

/// One row of the engine's foreign key catalog
/// (`KEY_COLUMN_USAGE` joined with `REFERENTIAL_CONSTRAINTS`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    #[serde(rename = "TABLE_NAME", alias = "table_name")]
    pub table_name: String,
    #[serde(rename = "COLUMN_NAME", alias = "column_name")]
    pub column_name: String,
    #[serde(rename = "CONSTRAINT_NAME", alias = "constraint_name", default)]
    pub constraint_name: Option<String>,
    #[serde(rename = "REFERENCED_TABLE_NAME", alias = "referenced_table_name", default)]
    pub referenced_table_name: Option<String>,
    #[serde(rename = "REFERENCED_COLUMN_NAME", alias = "referenced_column_name", default)]
    pub referenced_column_name: Option<String>,
    #[serde(rename = "UPDATE_RULE", alias = "update_rule", default)]
    pub update_rule: Option<String>,
    #[serde(rename = "DELETE_RULE", alias = "delete_rule", default)]
    pub delete_rule: Option<String>,
}

impl ForeignKeyRow {
    /// Primary and unique key usage rows share the catalog view but reference nothing
    pub fn is_foreign_key(&self) -> bool {
        self.referenced_table_name
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }
}

/// Extract the foreign keys declared in a table's `CREATE TABLE` text.
///
/// Returns an empty vector when the text carries no constraint clauses. The
/// first malformed foreign key clause fails the whole call; use
/// [`extract_dependencies_lenient`] to skip such clauses instead.
pub fn extract_dependencies(table: &str, ddl: &str) -> Result<Vec<Dependency>, SchemaError> {
    let (dependencies, mut errors) = extract_dependencies_lenient(table, ddl);
    if errors.is_empty() {
        Ok(dependencies)
    } else {
        Err(errors.swap_remove(0))
    }
}

/// Like [`extract_dependencies`], but malformed clauses are skipped and
/// returned alongside the dependencies that could be read.
pub fn extract_dependencies_lenient(
    table: &str,
    ddl: &str,
) -> (Vec<Dependency>, Vec<SchemaError>) {
    let mut by_column: IndexMap<String, Dependency> = IndexMap::new();
    let mut errors = Vec::new();

    for clause in foreign_key_clauses(ddl) {
        match ClauseParser::new(table, clause.text).and_then(|p| p.parse()) {
            Ok(parsed) => {
                let pairs = parsed
                    .source_columns
                    .into_iter()
                    .zip(parsed.referenced_columns);
                for (source, referenced) in pairs {
                    let dependency = Dependency {
                        source_table: table.to_string(),
                        source_column: source.clone(),
                        referenced_table: parsed.referenced_table.clone(),
                        referenced_column: referenced,
                        on_update: parsed.on_update,
                        on_delete: parsed.on_delete,
                        constraint_name: clause.name.clone(),
                    };
                    insert_last_wins(&mut by_column, source, dependency);
                }
            }
            Err(err) => {
                tracing::warn!(
                    table,
                    clause = clause.text,
                    "skipping foreign key clause: {err}"
                );
                errors.push(err);
            }
        }
    }

    (by_column.into_values().collect(), errors)
}

/// Build dependencies for `table` from foreign key catalog rows
pub fn dependencies_from_catalog(
    table: &str,
    rows: &[ForeignKeyRow],
) -> Result<Vec<Dependency>, SchemaError> {
    let mut by_column: IndexMap<String, Dependency> = IndexMap::new();

    for row in rows
        .iter()
        .filter(|r| r.table_name == table && r.is_foreign_key())
    {
        let referenced_table = row.referenced_table_name.as_deref().unwrap_or_default();
        let dependency = Dependency {
            source_table: table.to_string(),
            source_column: row.column_name.clone(),
            referenced_table: referenced_table.to_string(),
            referenced_column: row.referenced_column_name.clone().unwrap_or_default(),
            on_update: parse_rule(table, row.update_rule.as_deref())?,
            on_delete: parse_rule(table, row.delete_rule.as_deref())?,
            constraint_name: row.constraint_name.clone(),
        };
        insert_last_wins(&mut by_column, row.column_name.clone(), dependency);
    }

    Ok(by_column.into_values().collect())
}

fn parse_rule(table: &str, rule: Option<&str>) -> Result<ReferentialAction, SchemaError> {
    match rule {
        None => Ok(ReferentialAction::default()),
        Some(text) if text.trim().is_empty() => Ok(ReferentialAction::default()),
        Some(text) => text
            .parse()
            .map_err(|reason: String| SchemaError::malformed_ddl(table, reason)),
    }
}

fn insert_last_wins(
    by_column: &mut IndexMap<String, Dependency>,
    column: String,
    dependency: Dependency,
) {
    if let Some(previous) = by_column.insert(column, dependency) {
        tracing::debug!(
            table = %previous.source_table,
            column = %previous.source_column,
            "replacing earlier foreign key on the same column"
        );
    }
}

/// Text of one `FOREIGN KEY ...` clause and the name of its constraint
#[derive(Debug, PartialEq, Eq)]
struct ClauseText<'a> {
    name: Option<String>,
    text: &'a str,
}

/// Split the DDL into foreign key clauses, one per line-leading `CONSTRAINT`
fn foreign_key_clauses(ddl: &str) -> Vec<ClauseText<'_>> {
    let starts = constraint_starts(ddl);

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(ddl.len());
            let segment = ddl[start + CONSTRAINT_MARKER.len()..end].trim();

            // CHECK constraints share the marker
            let fk_pos = segment.find(FOREIGN_KEY_MARKER)?;
            let name = backtick_name(&segment[..fk_pos]);
            let mut text = &segment[fk_pos..];

            let end = [text.find("\n)"), text.find(") ENGINE")]
                .into_iter()
                .flatten()
                .min();
            if let Some(end) = end {
                text = &text[..end];
            }
            let text = text.trim().trim_end_matches(',').trim_end();
            Some(ClauseText { name, text })
        })
        .collect()
}

/// Byte offsets of `CONSTRAINT` keywords that open a line.
///
/// The marker inside a comment or default string never starts a line of the
/// engine's `CREATE TABLE` output.
fn constraint_starts(ddl: &str) -> Vec<usize> {
    ddl.match_indices('\n')
        .map(|(pos, _)| pos + 1)
        .filter_map(|line_start| {
            let line = &ddl[line_start..];
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            let rest = &line[indent..];
            let is_keyword = rest.starts_with(CONSTRAINT_MARKER)
                && rest[CONSTRAINT_MARKER.len()..].starts_with([' ', '\t']);
            is_keyword.then_some(line_start + indent)
        })
        .collect()
}

fn backtick_name(text: &str) -> Option<String> {
    let open = text.find('`')?;
    let rest = &text[open + 1..];
    let close = rest.find('`')?;
    Some(rest[..close].to_string())
}

/// Parsed shape of `FOREIGN KEY (cols) REFERENCES tbl (cols) [ON ...]`
struct ParsedClause {
    source_columns: Vec<String>,
    referenced_table: String,
    referenced_columns: Vec<String>,
    on_update: ReferentialAction,
    on_delete: ReferentialAction,
}

struct ClauseParser<'a> {
    table: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> ClauseParser<'a> {
    fn new(table: &'a str, clause: &str) -> Result<Self, SchemaError> {
        let dialect = MySqlDialect {};
        let tokens = Tokenizer::new(&dialect, clause)
            .tokenize()
            .map_err(|e| SchemaError::malformed_ddl(table, e.to_string()))?
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
            .collect();
        Ok(Self {
            table,
            tokens,
            pos: 0,
        })
    }

    fn parse(mut self) -> Result<ParsedClause, SchemaError> {
        self.expect_keyword("FOREIGN")?;
        self.expect_keyword("KEY")?;
        let source_columns = self.identifier_list()?;
        self.expect_keyword("REFERENCES")?;
        let referenced_table = self.object_name()?;
        let referenced_columns = self.identifier_list()?;

        if source_columns.is_empty() || referenced_columns.is_empty() {
            return Err(self.error(
                "expected a source column, a referenced table and a referenced column",
            ));
        }
        if source_columns.len() != referenced_columns.len() {
            return Err(self.error(format!(
                "{} source column(s) but {} referenced column(s)",
                source_columns.len(),
                referenced_columns.len()
            )));
        }

        let mut on_update = None;
        let mut on_delete = None;
        while self.peek().is_some() {
            self.expect_keyword("ON")?;
            let event = self.word().map(|w| w.to_uppercase());
            let action = self.action()?;
            match event.as_deref() {
                Some("DELETE") => on_delete = Some(action),
                Some("UPDATE") => on_update = Some(action),
                _ => return Err(self.error("expected ON DELETE or ON UPDATE")),
            }
        }

        Ok(ParsedClause {
            source_columns,
            referenced_table,
            referenced_columns,
            on_update: on_update.unwrap_or_default(),
            on_delete: on_delete.unwrap_or_default(),
        })
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Next unquoted word, if any
    fn word(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Word(w)) if w.quote_style.is_none() => {
                self.pos += 1;
                Some(w.value)
            }
            _ => None,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SchemaError> {
        match self.word() {
            Some(w) if w.eq_ignore_ascii_case(keyword) => Ok(()),
            _ => Err(self.error(format!("expected {keyword}"))),
        }
    }

    fn identifier(&mut self) -> Result<String, SchemaError> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w.value),
            _ => Err(self.error(
                "expected a source column, a referenced table and a referenced column",
            )),
        }
    }

    fn identifier_list(&mut self) -> Result<Vec<String>, SchemaError> {
        if !matches!(self.next(), Some(Token::LParen)) {
            return Err(self.error("expected '(' before column list"));
        }
        let mut columns = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(columns);
                }
                Some(Token::Comma) => self.pos += 1,
                Some(_) => columns.push(self.identifier()?),
                None => return Err(self.error("unterminated column list")),
            }
        }
    }

    /// Referenced table, keeping only the last part of `schema.table`
    fn object_name(&mut self) -> Result<String, SchemaError> {
        let mut name = self.identifier()?;
        while matches!(self.peek(), Some(Token::Period)) {
            self.pos += 1;
            name = self.identifier()?;
        }
        Ok(name)
    }

    fn action(&mut self) -> Result<ReferentialAction, SchemaError> {
        let mut words = Vec::new();
        while let Some(word) = self.word() {
            if word.eq_ignore_ascii_case("ON") {
                self.pos -= 1;
                break;
            }
            words.push(word);
        }
        if words.is_empty() {
            return Err(self.error("missing referential action"));
        }
        words
            .join(" ")
            .parse()
            .map_err(|reason: String| self.error(reason))
    }

    fn error(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::malformed_ddl(self.table, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDERS_DDL: &str = "CREATE TABLE `orders` (
  `id` int(10) unsigned NOT NULL AUTO_INCREMENT,
  `user_id` int(10) unsigned NOT NULL,
  `total` decimal(10,2) NOT NULL,
  PRIMARY KEY (`id`),
  KEY `orders_user_id_foreign` (`user_id`),
  CONSTRAINT `orders_user_id_foreign` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE NO ACTION
) ENGINE=InnoDB AUTO_INCREMENT=3 DEFAULT CHARSET=utf8mb4";

    #[test]
    fn test_single_constraint() {
        let deps = extract_dependencies("orders", ORDERS_DDL).unwrap();
        assert_eq!(
            deps,
            vec![Dependency {
                source_table: "orders".into(),
                source_column: "user_id".into(),
                referenced_table: "users".into(),
                referenced_column: "id".into(),
                on_update: ReferentialAction::NoAction,
                on_delete: ReferentialAction::Cascade,
                constraint_name: Some("orders_user_id_foreign".into()),
            }]
        );
    }

    #[test]
    fn test_no_constraint_marker_yields_nothing() {
        let ddl = "CREATE TABLE `users` (\n  `id` int(11) NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=MyISAM";
        assert_eq!(extract_dependencies("users", ddl).unwrap(), vec![]);
    }

    #[test]
    fn test_multiple_constraints_and_missing_rules() {
        let ddl = "CREATE TABLE `todos` (
  `id` int NOT NULL,
  `category_id` int NOT NULL,
  `owner_id` int DEFAULT NULL,
  `parent_id` int DEFAULT NULL,
  CONSTRAINT `todos_category_id_foreign` FOREIGN KEY (`category_id`) REFERENCES `categories` (`id`) ON DELETE CASCADE,
  CONSTRAINT `todos_owner_id_foreign` FOREIGN KEY (`owner_id`) REFERENCES `users` (`id`) ON DELETE SET NULL ON UPDATE CASCADE,
  CONSTRAINT `todos_parent_id_foreign` FOREIGN KEY (`parent_id`) REFERENCES `todos` (`id`)
) ENGINE=InnoDB";

        let deps = extract_dependencies("todos", ddl).unwrap();
        assert_eq!(deps.len(), 3);

        assert_eq!(deps[0].referenced_table, "categories");
        assert_eq!(deps[0].on_delete, ReferentialAction::Cascade);
        assert_eq!(deps[0].on_update, ReferentialAction::Restrict);

        assert_eq!(deps[1].on_delete, ReferentialAction::SetNull);
        assert_eq!(deps[1].on_update, ReferentialAction::Cascade);

        assert!(deps[2].is_self_referencing());
        assert_eq!(deps[2].on_delete, ReferentialAction::Restrict);
    }

    #[test]
    fn test_check_constraints_are_ignored() {
        let ddl = "CREATE TABLE `items` (
  `qty` int NOT NULL,
  CONSTRAINT `items_chk_1` CHECK ((`qty` > 0))
) ENGINE=InnoDB";
        assert_eq!(extract_dependencies("items", ddl).unwrap(), vec![]);
    }

    #[test]
    fn test_marker_inside_comment_is_not_a_clause() {
        let ddl = "CREATE TABLE `audits` (
  `note` varchar(100) DEFAULT NULL COMMENT 'CONSTRAINT FOREIGN KEY (x) is checked elsewhere',
  `user_id` int NOT NULL,
  CONSTRAINT `audits_user_id_foreign` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)
) ENGINE=InnoDB";

        let (deps, errors) = extract_dependencies_lenient("audits", ddl);
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_column, "user_id");
        assert_eq!(deps[0].constraint_name.as_deref(), Some("audits_user_id_foreign"));

        let ddl = "CREATE TABLE `audits` (
  `note` varchar(100) COMMENT 'CONSTRAINT FOREIGN KEY (x)'
) ENGINE=InnoDB";
        assert_eq!(extract_dependencies("audits", ddl).unwrap(), vec![]);
    }

    #[test]
    fn test_schema_qualified_reference() {
        let ddl = "CREATE TABLE `posts` (
  `author_id` int NOT NULL,
  CONSTRAINT `fk_author` FOREIGN KEY (`author_id`) REFERENCES `blog`.`authors` (`id`) ON DELETE RESTRICT ON UPDATE RESTRICT
) ENGINE=InnoDB";
        let deps = extract_dependencies("posts", ddl).unwrap();
        assert_eq!(deps[0].referenced_table, "authors");
    }

    #[test]
    fn test_composite_key_yields_one_edge_per_column() {
        let ddl = "CREATE TABLE `lines` (
  CONSTRAINT `fk_order` FOREIGN KEY (`order_id`, `order_rev`) REFERENCES `orders` (`id`, `rev`)
) ENGINE=InnoDB";
        let deps = extract_dependencies("lines", ddl).unwrap();
        let pairs: Vec<_> = deps
            .iter()
            .map(|d| (d.source_column.as_str(), d.referenced_column.as_str()))
            .collect();
        assert_eq!(pairs, vec![("order_id", "id"), ("order_rev", "rev")]);
    }

    #[test]
    fn test_same_source_column_last_write_wins() {
        let ddl = "CREATE TABLE `notes` (
  CONSTRAINT `fk_a` FOREIGN KEY (`ref_id`) REFERENCES `alpha` (`id`),
  CONSTRAINT `fk_b` FOREIGN KEY (`ref_id`) REFERENCES `beta` (`id`)
) ENGINE=InnoDB";
        let deps = extract_dependencies("notes", ddl).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].referenced_table, "beta");
        assert_eq!(deps[0].constraint_name.as_deref(), Some("fk_b"));
    }

    #[test]
    fn test_missing_identifiers_is_malformed() {
        let ddl = "CREATE TABLE `broken` (
  CONSTRAINT `fk_x` FOREIGN KEY (`x_id`) REFERENCES `xs`
) ENGINE=InnoDB";
        let err = extract_dependencies("broken", ddl).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDdl { ref table, .. } if table == "broken"));
    }

    #[test]
    fn test_unknown_action_is_malformed() {
        let ddl = "CREATE TABLE `broken` (
  CONSTRAINT `fk_x` FOREIGN KEY (`x_id`) REFERENCES `xs` (`id`) ON DELETE EXPLODE
) ENGINE=InnoDB";
        assert!(extract_dependencies("broken", ddl).is_err());
    }

    #[test]
    fn test_lenient_skips_only_the_bad_clause() {
        let ddl = "CREATE TABLE `mixed` (
  CONSTRAINT `fk_bad` FOREIGN KEY (`a_id`) REFERENCES (`id`),
  CONSTRAINT `fk_good` FOREIGN KEY (`b_id`) REFERENCES `bs` (`id`) ON DELETE CASCADE ON UPDATE CASCADE
) ENGINE=InnoDB";
        let (deps, errors) = extract_dependencies_lenient("mixed", ddl);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].referenced_table, "bs");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_dependencies_from_catalog_rows() {
        let rows = vec![
            ForeignKeyRow {
                table_name: "orders".into(),
                column_name: "id".into(),
                constraint_name: Some("PRIMARY".into()),
                ..ForeignKeyRow::default()
            },
            ForeignKeyRow {
                table_name: "orders".into(),
                column_name: "user_id".into(),
                constraint_name: Some("orders_user_id_foreign".into()),
                referenced_table_name: Some("users".into()),
                referenced_column_name: Some("id".into()),
                update_rule: Some("NO ACTION".into()),
                delete_rule: Some("CASCADE".into()),
            },
            ForeignKeyRow {
                table_name: "invoices".into(),
                column_name: "order_id".into(),
                referenced_table_name: Some("orders".into()),
                referenced_column_name: Some("id".into()),
                ..ForeignKeyRow::default()
            },
        ];

        let deps = dependencies_from_catalog("orders", &rows).unwrap();
        assert_eq!(
            deps,
            vec![Dependency::new("orders", "user_id", "users", "id")
                .on_update(ReferentialAction::NoAction)
                .on_delete(ReferentialAction::Cascade)
                .with_constraint_name("orders_user_id_foreign")]
        );
    }

    #[test]
    fn test_referential_action_display_round_trip() {
        for action in [
            ReferentialAction::Restrict,
            ReferentialAction::Cascade,
            ReferentialAction::SetNull,
            ReferentialAction::NoAction,
            ReferentialAction::SetDefault,
        ] {
            assert_eq!(action.to_string().parse::<ReferentialAction>(), Ok(action));
        }
    }
}
