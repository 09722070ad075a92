//! NHost source: users from `auth.users`, schema and rows from schema `public`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{ExportContext, Source};
use crate::error::{Error, Result};
use crate::log::Log;
use crate::report::CheckReport;
use crate::resources::{Database, Document, Hash, HashAlgorithm, ResourceKind, User};
use crate::schema::{convert_collection, convert_row};
use crate::sql::{count, quote_ident, QueryClient, Row};

const SUPPORTED: &[ResourceKind] = &[
    ResourceKind::Users,
    ResourceKind::Databases,
    ResourceKind::Collections,
    ResourceKind::Documents,
];

const USERS_COUNT_SQL: &str = "SELECT COUNT(*) AS count FROM auth.users";
const USERS_PAGE_SQL: &str = "SELECT * FROM auth.users ORDER BY created_at LIMIT $1 OFFSET $2";
const TABLES_COUNT_SQL: &str = "SELECT COUNT(*) AS count FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE'";
const TABLES_PAGE_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
     ORDER BY table_name LIMIT $1 OFFSET $2";

/// Id of the single database NHost exposes.
pub const PUBLIC_DATABASE: &str = "public";

/// NHost (Postgres) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NHostConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,
    /// User name.
    #[serde(default = "default_username")]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}

impl NHostConfig {
    /// `postgres://` connection string for these settings.
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// Exports an NHost project through a [`QueryClient`].
pub struct NHostSource {
    client: Box<dyn QueryClient>,
}

impl NHostSource {
    /// Creates a source backed by a lazily connecting Postgres pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection settings are malformed.
    #[cfg(feature = "postgres")]
    pub fn connect(config: &NHostConfig) -> Result<Self> {
        let client = crate::sql::PgQueryClient::connect_lazy(&config.connection_string())?;
        Ok(Self::with_client(client))
    }

    /// Creates a source over any query client.
    pub fn with_client(client: impl QueryClient + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }

    async fn probe(&self, sql: &str) -> Option<String> {
        count(self.client.as_ref(), sql, &[]).await.err().map(|e| e.to_string())
    }
}

/// Maps one `auth.users` row onto a [`User`]. Password hashes are bcrypt.
pub fn convert_user(row: &Row) -> Result<User> {
    let id = text(row, "id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Extraction("User row has no id".to_string()))?;
    let hash = text(row, "password_hash")
        .filter(|h| !h.is_empty())
        .map(|h| Hash::new(HashAlgorithm::Bcrypt, h));

    let mut user = User::new(
        id,
        text(row, "email").unwrap_or_default(),
        text(row, "display_name").unwrap_or_default(),
        hash,
        text(row, "phone_number").unwrap_or_default(),
    );
    user.email_verified = flag(row, "email_verified");
    user.phone_verified = flag(row, "phone_number_verified");
    user.disabled = flag(row, "disabled");
    Ok(user)
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn flag(row: &Row, column: &str) -> bool {
    row.get(column).and_then(Value::as_bool).unwrap_or(false)
}

#[async_trait]
impl Source for NHostSource {
    fn name(&self) -> &'static str {
        "NHost"
    }

    fn supported_resources(&self) -> &'static [ResourceKind] {
        SUPPORTED
    }

    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport> {
        let mut report = CheckReport::new(resources);
        for kind in resources {
            match kind {
                ResourceKind::Users => {
                    if let Some(e) = self.probe(USERS_COUNT_SQL).await {
                        report.add(*kind, format!("Failed to access users table. Error: {}", e));
                    }
                }
                ResourceKind::Databases | ResourceKind::Collections => {
                    if let Some(e) = self.probe(TABLES_COUNT_SQL).await {
                        report.add(*kind, format!("Failed to access tables table. Error: {}", e));
                    }
                }
                ResourceKind::Documents => {
                    if !resources.contains(&ResourceKind::Databases) {
                        report.add(
                            *kind,
                            "Documents resource requires Databases resource to be enabled.",
                        );
                    }
                }
                ResourceKind::Files | ResourceKind::Functions => {
                    report.add(*kind, format!("{} is not supported by NHost", kind));
                }
            }
        }
        Ok(report)
    }

    async fn export_users(&mut self, batch_size: usize, ctx: &mut ExportContext<'_>) -> Result<()> {
        let client = self.client.as_ref();
        let total = count(client, USERS_COUNT_SQL, &[]).await?;
        ctx.set_total(total);

        let mut offset = 0u64;
        while offset < total {
            let rows = client
                .query(USERS_PAGE_SQL, &[batch_size.into(), offset.into()])
                .await?;
            if rows.is_empty() {
                break;
            }
            offset += batch_size as u64;
            debug!(rows = rows.len(), offset, "Fetched users page");

            let mut users = Vec::with_capacity(rows.len());
            for row in &rows {
                match convert_user(row) {
                    Ok(user) => users.push(user),
                    Err(e) => {
                        let id = text(row, "id").unwrap_or_default();
                        ctx.fail(Log::error(e.to_string()).about_id("User", id));
                    }
                }
            }
            ctx.emit(users).await?;
        }
        Ok(())
    }

    async fn export_databases(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let client = self.client.as_ref();
        let tables = count(client, TABLES_COUNT_SQL, &[]).await?;
        ctx.set_total(1);

        let mut database = Database::new(PUBLIC_DATABASE, PUBLIC_DATABASE);
        let mut offset = 0u64;
        while offset < tables {
            let rows = client
                .query(TABLES_PAGE_SQL, &[batch_size.into(), offset.into()])
                .await?;
            if rows.is_empty() {
                break;
            }
            offset += batch_size as u64;

            for row in &rows {
                let table = text(row, "table_name").ok_or_else(|| {
                    Error::Extraction("Table listing returned a row without table_name".to_string())
                })?;
                let collection = convert_collection(client, &table, ctx.logs_mut()).await?;
                database.collections.push(Arc::new(collection));
            }
        }

        ctx.emit(vec![database]).await
    }

    async fn export_documents(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let client = self.client.as_ref();
        let collections: Vec<_> = ctx
            .cached_databases()
            .iter()
            .filter(|db| db.id == PUBLIC_DATABASE)
            .flat_map(|db| db.collections.iter().cloned())
            .collect();

        for collection in collections {
            let table = format!("public.{}", quote_ident(&collection.id));
            let total = count(client, &format!("SELECT COUNT(*) AS count FROM {}", table), &[])
                .await?;
            ctx.add_total(total);

            // ctid keeps OFFSET paging stable without relying on a key column
            let page_sql = format!("SELECT * FROM {} ORDER BY ctid LIMIT $1 OFFSET $2", table);
            let mut offset = 0u64;
            while offset < total {
                let rows = client
                    .query(&page_sql, &[batch_size.into(), offset.into()])
                    .await?;
                if rows.is_empty() {
                    break;
                }
                offset += batch_size as u64;

                let documents: Vec<Document> = rows
                    .iter()
                    .map(|row| {
                        let data = convert_row(&collection, row, ctx.logs_mut());
                        Document::new(
                            Document::UNIQUE_ID,
                            PUBLIC_DATABASE,
                            Arc::clone(&collection),
                            data,
                        )
                    })
                    .collect();
                ctx.emit(documents).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "nhost_tests.rs"]
mod tests;
