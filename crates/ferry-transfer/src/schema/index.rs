//! Index definition parsing.
//!
//! Postgres reports indexes as the `CREATE INDEX` statement that would
//! recreate them. The grammar in `index.pest` captures the qualifier, name,
//! table, access method and column list; everything else is ignored.

use pest::iterators::Pair;
use pest::Parser as PestParser;
use serde::Deserialize;

use crate::log::{Log, LogBook};
use crate::resources::{Index, IndexOrder, IndexType};

use grammar::{IndexDefParser, Rule};

// generated `Rule` stays out of the public API
mod grammar {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "schema/index.pest"]
    pub(super) struct IndexDefParser;
}

/// One row of `pg_indexes`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub indexname: String,
    /// Full `CREATE INDEX` statement.
    pub indexdef: String,
}

impl IndexDefinition {
    /// Creates a definition from its name and statement.
    pub fn new(indexname: impl Into<String>, indexdef: impl Into<String>) -> Self {
        Self {
            indexname: indexname.into(),
            indexdef: indexdef.into(),
        }
    }
}

/// Captures of a parsed index definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIndex {
    /// Qualifier in front of `INDEX` (`UNIQUE`, ...), if any.
    pub qualifier: Option<String>,
    /// Index name, unquoted.
    pub name: String,
    /// Table name, possibly schema-qualified.
    pub table: String,
    /// Access method, e.g. `btree`.
    pub method: String,
    /// Column names with their sort direction.
    pub columns: Vec<(String, IndexOrder)>,
}

/// Parses a `CREATE [qualifier] INDEX` statement.
///
/// Returns `None` when the statement does not match the grammar, which is the
/// case for expression indexes such as `(lower(email))`.
#[must_use]
pub fn parse_index_definition(definition: &str) -> Option<ParsedIndex> {
    let root = IndexDefParser::parse(Rule::index_def, definition)
        .ok()?
        .next()?;

    let mut parsed = ParsedIndex::default();
    for part in root.into_inner() {
        match part.as_rule() {
            Rule::index_type => parsed.qualifier = Some(part.as_str().to_string()),
            Rule::index_name => parsed.name = first_identifier(part),
            Rule::table_name => {
                parsed.table = part
                    .into_inner()
                    .map(|p| unquote(&p))
                    .collect::<Vec<_>>()
                    .join(".");
            }
            Rule::method => parsed.method = first_identifier(part),
            Rule::column_list => parsed.columns = part.into_inner().map(parse_column).collect(),
            _ => {}
        }
    }
    Some(parsed)
}

fn parse_column(pair: Pair<'_, Rule>) -> (String, IndexOrder) {
    let mut name = String::new();
    let mut order = IndexOrder::Asc;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::column_name => name = first_identifier(part),
            Rule::direction if part.as_str().eq_ignore_ascii_case("DESC") => {
                order = IndexOrder::Desc;
            }
            _ => {}
        }
    }
    (name, order)
}

fn first_identifier(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|inner| unquote(&inner))
        .unwrap_or_default()
}

/// `"my ""col"""` -> `my "col"`; bare identifiers are returned as-is.
fn unquote(pair: &Pair<'_, Rule>) -> String {
    let s = pair.as_str();
    if pair.as_rule() == Rule::quoted_ident && s.len() >= 2 {
        s[1..s.len() - 1].replace("\"\"", "\"")
    } else {
        s.to_string()
    }
}

/// Converts a `pg_indexes` row into an [`Index`].
///
/// Only btree indexes are transferable. Any other access method, or a
/// definition the grammar cannot read, is dropped with one ERROR log.
pub fn convert_index(definition: &IndexDefinition, logs: &mut LogBook) -> Option<Index> {
    let Some(parsed) = parse_index_definition(&definition.indexdef) else {
        logs.push(Log::error(format!(
            "Skipping index due to unsupported format: {} for index: {}. Transfers only support BTree.",
            definition.indexdef, definition.indexname
        )));
        return None;
    };

    if !parsed.method.eq_ignore_ascii_case("btree") {
        logs.push(Log::error(format!(
            "Skipping index due to unsupported type: {} for index: {}. Transfers only support BTree.",
            parsed.method, parsed.name
        )));
        return None;
    }

    let index_type = match parsed.qualifier.as_deref() {
        Some(q) if q.eq_ignore_ascii_case("UNIQUE") => IndexType::Unique,
        Some(q) if q.eq_ignore_ascii_case("FULLTEXT") => IndexType::Fulltext,
        _ => IndexType::Key,
    };
    let (attributes, orders) = parsed.columns.into_iter().unzip();

    Some(Index {
        id: parsed.name.clone(),
        name: parsed.name,
        index_type,
        attributes,
        orders,
    })
}
