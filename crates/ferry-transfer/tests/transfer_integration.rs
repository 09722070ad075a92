//! End-to-end transfers through the public API.
//!
//! An in-memory relational backend stands in for the NHost database, so these
//! run without any external service.

#![allow(clippy::pedantic)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use ferry_transfer::destinations::local::LocalDestinationConfig;
use ferry_transfer::destinations::LocalDestination;
use ferry_transfer::error::Result;
use ferry_transfer::resources::{AttributeKind, ResourceKind};
use ferry_transfer::sources::local::LocalSourceConfig;
use ferry_transfer::sources::nhost::PUBLIC_DATABASE;
use ferry_transfer::sources::{LocalSource, NHostSource};
use ferry_transfer::sql::{QueryClient, Row, SqlParam};
use ferry_transfer::staging::StagingArea;
use ferry_transfer::{Progress, Transfer};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row must be an object, got {}", other),
    }
}

fn limit_offset(rows: &[Row], params: &[SqlParam]) -> Vec<Row> {
    let (limit, offset) = match params {
        [SqlParam::Int(limit), SqlParam::Int(offset)] => (*limit as usize, *offset as usize),
        other => panic!("expected LIMIT/OFFSET params, got {:?}", other),
    };
    rows.iter().skip(offset).take(limit).cloned().collect()
}

/// One user and one table `t(id int4 primary key, name text)`.
struct Backend {
    users: Vec<Row>,
    rows: Vec<Row>,
}

impl Backend {
    fn new() -> Self {
        Self {
            users: vec![row(json!({
                "id": "8d7c6f1e-0000-4000-8000-000000000001",
                "email": "ada@example.com",
                "display_name": "Ada",
                "password_hash": "$2a$10$abcdefghijklmnopqrstuv",
                "phone_number": null,
                "email_verified": true,
                "phone_number_verified": false,
                "disabled": false,
                "created_at": "2024-01-01T00:00:00Z"
            }))],
            rows: vec![
                row(json!({ "id": 1, "name": "first" })),
                row(json!({ "id": 2, "name": "second" })),
                row(json!({ "id": 3, "name": null })),
            ],
        }
    }
}

#[async_trait]
impl QueryClient for Backend {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let count = |n: usize| vec![row(json!({ "count": n }))];
        if sql.contains("auth.users") {
            if sql.starts_with("SELECT COUNT(*)") {
                return Ok(count(self.users.len()));
            }
            return Ok(limit_offset(&self.users, params));
        }
        if sql.contains("information_schema.tables") {
            if sql.starts_with("SELECT COUNT(*)") {
                return Ok(count(1));
            }
            return Ok(limit_offset(&[row(json!({ "table_name": "t" }))], params));
        }
        if sql.contains("information_schema.columns") {
            return Ok(vec![
                row(json!({
                    "column_name": "id", "data_type": "integer", "udt_name": "int4",
                    "is_nullable": "NO", "column_default": null,
                    "character_maximum_length": null, "character_octet_length": null
                })),
                row(json!({
                    "column_name": "name", "data_type": "text", "udt_name": "text",
                    "is_nullable": "YES", "column_default": null,
                    "character_maximum_length": null, "character_octet_length": null
                })),
            ]);
        }
        if sql.contains("pg_indexes") {
            return Ok(vec![row(json!({
                "indexname": "t_pkey",
                "indexdef": "CREATE UNIQUE INDEX t_pkey ON public.t USING btree (id)"
            }))]);
        }
        if sql.contains("public.\"t\"") {
            if sql.starts_with("SELECT COUNT(*)") {
                return Ok(count(self.rows.len()));
            }
            return Ok(limit_offset(&self.rows, params));
        }
        panic!("unexpected query: {}", sql);
    }
}

const ALL_SQL_KINDS: &[ResourceKind] = &[
    ResourceKind::Users,
    ResourceKind::Databases,
    ResourceKind::Documents,
];

async fn nhost_to_local(dir: &TempDir) -> Vec<Progress> {
    let mut source = NHostSource::with_client(Backend::new());
    let mut destination = LocalDestination::new(&LocalDestinationConfig {
        path: dir.path().join("backup"),
    })
    .unwrap();
    let mut seen = Vec::new();
    let mut on_progress = |p: Progress| seen.push(p);

    let mut transfer = Transfer::new(&mut source).with_batch_size(2);
    transfer
        .run_into(ALL_SQL_KINDS, &mut destination, &mut on_progress)
        .await
        .unwrap();
    let report = transfer.into_report();
    assert_eq!(report.error_count(), 0);
    seen
}

#[tokio::test]
async fn test_nhost_tables_land_in_backup() {
    let dir = TempDir::new().unwrap();
    let seen = nhost_to_local(&dir).await;

    let output = StagingArea::new(dir.path().join("backup")).load().await.unwrap();
    assert_eq!(output.users.len(), 1);
    assert_eq!(output.users[0].email, "ada@example.com");

    assert_eq!(output.databases.len(), 1);
    let database = &output.databases[0];
    assert_eq!(database.id, PUBLIC_DATABASE);
    assert_eq!(database.collections.len(), 1);

    let collection = &database.collections[0];
    assert_eq!(collection.id, "t");
    let id = collection.attribute("id").unwrap();
    assert!(matches!(id.kind, AttributeKind::Int { .. }));
    assert!(id.required);
    let name = collection.attribute("name").unwrap();
    assert!(matches!(name.kind, AttributeKind::String { .. }));
    assert!(!name.required);
    assert_eq!(collection.indexes.len(), 1);

    assert_eq!(output.documents.len(), 3);
    assert!(output
        .documents
        .iter()
        .all(|doc| doc.database_id == PUBLIC_DATABASE && doc.collection_id == "t"));
    assert_eq!(output.documents[2].data.get("name"), Some(&Value::Null));

    // documents come in pages of 2
    let documents: Vec<_> = seen
        .iter()
        .filter(|p| p.resource == ResourceKind::Documents)
        .map(|p| (p.current, p.total))
        .collect();
    assert_eq!(documents, vec![(2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_backup_replays_into_second_staging_area() {
    let dir = TempDir::new().unwrap();
    nhost_to_local(&dir).await;

    let mut source = LocalSource::new(&LocalSourceConfig {
        path: dir.path().join("backup"),
    });
    let mut destination = LocalDestination::new(&LocalDestinationConfig {
        path: dir.path().join("replay"),
    })
    .unwrap();
    let mut on_progress = |_: Progress| {};

    let mut transfer = Transfer::new(&mut source);
    transfer
        .run_into(ALL_SQL_KINDS, &mut destination, &mut on_progress)
        .await
        .unwrap();
    let report = transfer.into_report();
    assert_eq!(report.progress_for(ResourceKind::Documents).unwrap().current, 3);

    let original = StagingArea::new(dir.path().join("backup")).load().await.unwrap();
    let replayed = StagingArea::new(dir.path().join("replay")).load().await.unwrap();
    assert_eq!(replayed.users, original.users);
    assert_eq!(replayed.databases, original.databases);
    let data = |docs: &[ferry_transfer::staging::StagedDocument]| -> Vec<Map<String, Value>> {
        docs.iter().map(|doc| doc.data.clone()).collect()
    };
    assert_eq!(data(&replayed.documents), data(&original.documents));
}
