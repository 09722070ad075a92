//! Relational query collaborator.
//!
//! Sources talk to relational backends through [`QueryClient`]: a
//! parameterized `query(sql, params) -> rows` where every row is a JSON
//! object keyed by column name.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text value.
    Text(String),
    /// 64-bit integer value.
    Int(i64),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for SqlParam {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for SqlParam {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Parameterized query execution against a relational backend.
///
/// Placeholders use the Postgres `$1, $2, ...` syntax.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Runs `sql` with `params` bound in order and returns every row.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>>;
}

/// Runs a `SELECT COUNT(*) AS count ...` statement and returns the count.
pub async fn count(client: &dyn QueryClient, sql: &str, params: &[SqlParam]) -> Result<u64> {
    let rows = client.query(sql, params).await?;
    let row = rows
        .first()
        .ok_or_else(|| Error::Extraction(format!("Count query returned no rows: {}", sql)))?;
    row.get("count")
        .and_then(value_as_u64)
        .ok_or_else(|| Error::Extraction(format!("Count query returned no 'count' column: {}", sql)))
}

/// Counts may come back as JSON numbers or, for `numeric`, as strings.
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Quotes a Postgres identifier (`my "table"` becomes `"my ""table"""`).
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `PostgreSQL` implementation of [`QueryClient`] backed by a sqlx pool.
///
/// Each statement is wrapped as `SELECT row_to_json(t) FROM (<sql>) t` so every
/// row arrives as a single JSON object regardless of column types.
#[cfg(feature = "postgres")]
pub struct PgQueryClient {
    pool: sqlx::PgPool,
}

#[cfg(feature = "postgres")]
impl PgQueryClient {
    /// Creates a client whose pool connects on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed.
    pub fn connect_lazy(connection_string: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect_lazy(connection_string)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "postgres")]
#[async_trait]
impl QueryClient for PgQueryClient {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let wrapped = format!("SELECT row_to_json(t) FROM ({}) t", sql);
        let mut query = sqlx::query_scalar::<sqlx::Postgres, Value>(&wrapped);
        for param in params {
            query = match param {
                SqlParam::Text(text) => query.bind(text.clone()),
                SqlParam::Int(int) => query.bind(*int),
            };
        }

        let values = query.fetch_all(&self.pool).await?;
        values
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(Error::Extraction(format!(
                    "Expected a JSON object per row, got {}",
                    other
                ))),
            })
            .collect()
    }
}
