//! Relational schema conversion.
//!
//! Turns Postgres catalog rows (`information_schema.columns`, `pg_indexes`)
//! into the portable [`Collection`] / [`Attribute`] / [`Index`] model, and
//! rows of a table into document data shaped by that collection.
//!
//! Conversion never fails on an unknown type: the column falls back to a
//! string attribute and a WARNING is recorded.

pub mod document;
pub mod index;

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::Result;
use crate::log::{Log, LogBook};
use crate::resources::{Attribute, AttributeKind, Collection, DEFAULT_STRING_SIZE};
use crate::sql::{QueryClient, Row};

pub use document::convert_row;
pub use index::{convert_index, parse_index_definition, IndexDefinition, ParsedIndex};

const COLUMNS_SQL: &str = "SELECT column_name, data_type, udt_name, is_nullable, column_default, \
     character_maximum_length, character_octet_length \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name::text = $1 \
     ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT indexname, indexdef FROM pg_indexes \
     WHERE schemaname = 'public' AND tablename::text = $1 \
     ORDER BY indexname";

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub column_name: String,
    /// SQL type name, `ARRAY` for array columns.
    pub data_type: String,
    /// Underlying type name; element type prefixed with `_` for arrays.
    #[serde(default)]
    pub udt_name: String,
    /// `YES` or `NO`.
    pub is_nullable: String,
    /// Default expression as stored in the catalog.
    #[serde(default)]
    pub column_default: Option<String>,
    /// Declared character limit.
    #[serde(default)]
    pub character_maximum_length: Option<u64>,
    /// Octet limit.
    #[serde(default)]
    pub character_octet_length: Option<u64>,
}

impl ColumnInfo {
    /// Describes a scalar, nullable column of `data_type`.
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            column_name: column_name.into(),
            udt_name: data_type.clone(),
            data_type,
            is_nullable: "YES".to_string(),
            column_default: None,
            character_maximum_length: None,
            character_octet_length: None,
        }
    }

    /// Whether the column holds an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("ARRAY")
    }

    /// Type the attribute is chosen by: the element type for arrays.
    #[must_use]
    pub fn type_name(&self) -> &str {
        if self.is_array() {
            self.udt_name.strip_prefix('_').unwrap_or(&self.udt_name)
        } else {
            &self.data_type
        }
    }

    fn string_size(&self) -> u64 {
        self.character_maximum_length
            .or(self.character_octet_length)
            .unwrap_or(DEFAULT_STRING_SIZE)
    }
}

/// Converts a column description into an [`Attribute`].
pub fn convert_attribute(column: &ColumnInfo, logs: &mut LogBook) -> Attribute {
    let type_name = column.type_name().to_ascii_lowercase();
    let kind = match type_name.as_str() {
        "boolean" | "bool" => AttributeKind::Bool,
        "smallint" | "int2" => AttributeKind::Int {
            min: Some(i64::from(i16::MIN)),
            max: Some(i64::from(i16::MAX)),
        },
        "integer" | "int4" => AttributeKind::Int {
            min: Some(i64::from(i32::MIN)),
            max: Some(i64::from(i32::MAX)),
        },
        "bigint" | "int8" | "numeric" => AttributeKind::Int {
            min: None,
            max: None,
        },
        "decimal" | "real" | "double precision" | "float4" | "float8" | "money" => {
            AttributeKind::Float {
                min: None,
                max: None,
            }
        }
        "timestamp with time zone" | "timestamp without time zone" | "timestamptz"
        | "timestamp" | "date" | "time with time zone" | "time without time zone" | "time"
        | "timetz" | "interval" => AttributeKind::DateTime,
        "uuid" | "character varying" | "varchar" | "character" | "bpchar" | "text" | "json"
        | "jsonb" | "bytea" => AttributeKind::String {
            size: column.string_size(),
        },
        other => {
            logs.push(Log::warning(format!(
                "Unsupported type: {} for column: {}, falling back to string",
                other, column.column_name
            )));
            AttributeKind::String {
                size: column.string_size(),
            }
        }
    };

    // array literals such as '{}'::text[] are not scalar defaults
    let default = if column.is_array() {
        None
    } else {
        convert_default(&kind, column.column_default.as_deref())
    };
    Attribute::new(column.column_name.clone(), kind)
        .required(column.is_nullable.eq_ignore_ascii_case("NO"))
        .array(column.is_array())
        .with_default(default)
}

/// Normalizes a catalog default expression to a value of `kind`.
///
/// Literals are kept (`'abc'::text` becomes `"abc"`, `(-1)` becomes `-1`);
/// expressions such as `nextval(...)` or `now()` yield `None`. Date-time
/// attributes never carry a default.
#[must_use]
pub fn convert_default(kind: &AttributeKind, raw: Option<&str>) -> Option<Value> {
    let raw = raw?.trim();
    if raw.is_empty() || matches!(kind, AttributeKind::DateTime) {
        return None;
    }

    let (literal, quoted) = match string_literal(raw) {
        Some(text) => (text, true),
        None => (strip_parens(raw).to_string(), false),
    };

    match kind {
        AttributeKind::Bool => match literal.to_ascii_lowercase().as_str() {
            "true" | "t" => Some(Value::Bool(true)),
            "false" | "f" => Some(Value::Bool(false)),
            _ => None,
        },
        AttributeKind::Int { .. } => literal.parse::<i64>().ok().map(Value::from),
        AttributeKind::Float { .. } => literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        AttributeKind::String { .. } if quoted => Some(Value::String(literal)),
        AttributeKind::String { .. } | AttributeKind::DateTime => None,
    }
}

/// Text of a leading `'...'` literal whose remainder is empty or a `::` cast.
fn string_literal(raw: &str) -> Option<String> {
    let body = raw.strip_prefix('\'')?;
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            text.push(c);
            continue;
        }
        if chars.peek().is_some_and(|(_, next)| *next == '\'') {
            chars.next();
            text.push('\'');
            continue;
        }
        let rest = body[i + 1..].trim_start();
        return (rest.is_empty() || rest.starts_with("::")).then_some(text);
    }
    None
}

fn strip_parens(mut raw: &str) -> &str {
    while let Some(inner) = raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        raw = inner.trim();
    }
    raw
}

/// Builds the collection for `table` of schema `public`.
///
/// Attributes follow column declaration order. Indexes that cannot be
/// represented are dropped and logged.
///
/// # Errors
///
/// Returns an error if the catalog queries fail or return malformed rows.
pub async fn convert_collection(
    client: &dyn QueryClient,
    table: &str,
    logs: &mut LogBook,
) -> Result<Collection> {
    let mut collection = Collection::new(table, table);

    for row in client.query(COLUMNS_SQL, &[table.into()]).await? {
        let column: ColumnInfo = from_row(row)?;
        collection.attributes.push(convert_attribute(&column, logs));
    }

    for row in client.query(INDEXES_SQL, &[table.into()]).await? {
        let definition: IndexDefinition = from_row(row)?;
        if let Some(index) = convert_index(&definition, logs) {
            collection.indexes.push(index);
        }
    }

    Ok(collection)
}

fn from_row<T: serde::de::DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
