//! Appwrite destination over the Appwrite server REST API.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Destination, ImportContext};
use crate::credential::{
    import_password_user, HashedUserCreator, ScryptModifiedParams, ScryptParams,
};
use crate::error::Result;
use crate::http::{validate_endpoint, RestClient};
use crate::log::Log;
use crate::report::CheckReport;
use crate::resources::{
    Attribute, AttributeKind, Collection, Database, Document, Index, ResourceKind, User, UserType,
};

const SUPPORTED: &[ResourceKind] = &[
    ResourceKind::Users,
    ResourceKind::Databases,
    ResourceKind::Collections,
    ResourceKind::Documents,
];

/// Connection settings for an Appwrite project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppwriteConfig {
    /// API endpoint, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    /// Project id.
    pub project: String,
    /// Server API key.
    pub api_key: String,
}

/// Imports resources into an Appwrite project.
pub struct AppwriteDestination {
    client: RestClient,
}

impl AppwriteDestination {
    /// Creates a destination for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL.
    pub fn new(config: &AppwriteConfig) -> Result<Self> {
        validate_endpoint(&config.endpoint)?;
        Ok(Self::with_client(
            RestClient::new(&config.endpoint)
                .with_header("X-Appwrite-Project", &config.project)
                .with_header("X-Appwrite-Key", &config.api_key),
        ))
    }

    /// Creates a destination over a prepared client. JSON encoding is added.
    #[must_use]
    pub fn with_client(client: RestClient) -> Self {
        Self {
            client: client.with_header("Content-Type", "application/json"),
        }
    }

    async fn call(&self, method: Method, path: &str, params: Value) -> Result<Value> {
        self.client.call(method, path, &[], &params).await
    }

    async fn create_hashed_user(&self, path: &str, user: &User, extra: Value) -> Result<()> {
        let mut body = json!({
            "userId": user.id,
            "email": non_empty(&user.email),
            "name": non_empty(&user.name),
        });
        if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
            body.extend(extra);
        }
        self.call(Method::POST, path, body).await?;
        Ok(())
    }

    async fn create_plain_user(&self, user: &User) -> Result<()> {
        let body = json!({
            "userId": user.id,
            "email": non_empty(&user.email),
            "phone": non_empty(&user.phone),
            "password": null,
            "name": non_empty(&user.name),
        });
        self.call(Method::POST, "/users", body).await?;
        Ok(())
    }

    /// Applies profile fields the creation calls do not take.
    ///
    /// A failed update is logged; the user stays created.
    async fn enrich_user(&self, user: &User, ctx: &mut ImportContext<'_>) {
        let base = format!("/users/{}", user.id);
        let mut updates = Vec::with_capacity(5);
        if !user.name.is_empty() {
            updates.push(("name", format!("{}/name", base), json!({ "name": user.name })));
        }
        if !user.phone.is_empty() {
            updates.push(("phone", format!("{}/phone", base), json!({ "number": user.phone })));
        }
        updates.push((
            "email verification",
            format!("{}/verification", base),
            json!({ "emailVerification": user.email_verified }),
        ));
        updates.push((
            "phone verification",
            format!("{}/verification/phone", base),
            json!({ "phoneVerification": user.phone_verified }),
        ));
        updates.push((
            "status",
            format!("{}/status", base),
            json!({ "status": !user.disabled }),
        ));

        for (what, path, body) in updates {
            if let Err(e) = self.call(Method::PATCH, &path, body).await {
                ctx.log(Log::error(format!("Failed to update {}: {}", what, e)).about(user));
            }
        }
    }

    async fn create_collection(
        &self,
        database: &Database,
        collection: &Collection,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        let base = format!("/databases/{}/collections", database.id);
        self.call(
            Method::POST,
            &base,
            json!({
                "collectionId": collection.id,
                "name": collection.name,
                "permissions": [],
                "documentSecurity": false,
            }),
        )
        .await?;

        let base = format!("{}/{}", base, collection.id);
        for attribute in &collection.attributes {
            let (kind, body) = attribute_request(attribute);
            let path = format!("{}/attributes/{}", base, kind);
            if let Err(e) = self.call(Method::POST, &path, body).await {
                ctx.log(
                    Log::error(format!("Failed to create attribute '{}': {}", attribute.key, e))
                        .about(collection),
                );
            }
        }
        for index in &collection.indexes {
            let path = format!("{}/indexes", base);
            if let Err(e) = self.call(Method::POST, &path, index_request(index)).await {
                ctx.log(
                    Log::error(format!("Failed to create index '{}': {}", index.name, e))
                        .about(collection),
                );
            }
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

/// Endpoint suffix and body that create `attribute`.
///
/// Appwrite refuses defaults on required attributes, so those are omitted.
pub fn attribute_request(attribute: &Attribute) -> (&'static str, Value) {
    let mut body = Map::new();
    body.insert("key".to_string(), Value::from(attribute.key.clone()));
    body.insert("required".to_string(), Value::Bool(attribute.required));
    body.insert("array".to_string(), Value::Bool(attribute.array));
    if !attribute.required {
        if let Some(default) = &attribute.default {
            body.insert("default".to_string(), default.clone());
        }
    }

    let kind = match &attribute.kind {
        AttributeKind::Bool => "boolean",
        AttributeKind::Int { min, max } => {
            if let Some(min) = min {
                body.insert("min".to_string(), Value::from(*min));
            }
            if let Some(max) = max {
                body.insert("max".to_string(), Value::from(*max));
            }
            "integer"
        }
        AttributeKind::Float { min, max } => {
            if let Some(min) = min {
                body.insert("min".to_string(), Value::from(*min));
            }
            if let Some(max) = max {
                body.insert("max".to_string(), Value::from(*max));
            }
            "float"
        }
        AttributeKind::String { size } => {
            body.insert("size".to_string(), Value::from(*size));
            "string"
        }
        AttributeKind::DateTime => "datetime",
    };
    (kind, Value::Object(body))
}

fn index_request(index: &Index) -> Value {
    json!({
        "key": index.id,
        "type": index.index_type.as_str(),
        "attributes": index.attributes,
        "orders": index.orders,
    })
}

#[async_trait]
impl HashedUserCreator for AppwriteDestination {
    async fn create_bcrypt_user(&self, user: &User, hash: &str) -> Result<()> {
        self.create_hashed_user("/users/bcrypt", user, json!({ "password": hash }))
            .await
    }

    async fn create_argon2_user(&self, user: &User, hash: &str) -> Result<()> {
        self.create_hashed_user("/users/argon2", user, json!({ "password": hash }))
            .await
    }

    async fn create_sha_user(&self, user: &User, hash: &str, version: &str) -> Result<()> {
        self.create_hashed_user(
            "/users/sha",
            user,
            json!({ "password": hash, "passwordVersion": version }),
        )
        .await
    }

    async fn create_phpass_user(&self, user: &User, hash: &str) -> Result<()> {
        self.create_hashed_user("/users/phpass", user, json!({ "password": hash }))
            .await
    }

    async fn create_scrypt_user(
        &self,
        user: &User,
        hash: &str,
        params: ScryptParams<'_>,
    ) -> Result<()> {
        self.create_hashed_user(
            "/users/scrypt",
            user,
            json!({
                "password": hash,
                "passwordSalt": params.salt,
                "passwordCpu": params.cpu,
                "passwordMemory": params.memory,
                "passwordParallel": params.parallel,
                "passwordLength": params.key_length,
            }),
        )
        .await
    }

    async fn create_scrypt_modified_user(
        &self,
        user: &User,
        hash: &str,
        params: ScryptModifiedParams<'_>,
    ) -> Result<()> {
        self.create_hashed_user(
            "/users/scrypt-modified",
            user,
            json!({
                "password": hash,
                "passwordSalt": params.salt,
                "passwordSaltSeparator": params.separator,
                "passwordSignerKey": params.signing_key,
            }),
        )
        .await
    }
}

#[async_trait]
impl Destination for AppwriteDestination {
    fn name(&self) -> &'static str {
        "Appwrite"
    }

    fn supported_resources(&self) -> &'static [ResourceKind] {
        SUPPORTED
    }

    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport> {
        let mut report = CheckReport::new(resources);
        for kind in resources {
            let path = match kind {
                ResourceKind::Users => "/users",
                ResourceKind::Databases | ResourceKind::Collections | ResourceKind::Documents => {
                    "/databases"
                }
                ResourceKind::Files | ResourceKind::Functions => {
                    report.add(*kind, format!("{} is not supported by Appwrite", kind));
                    continue;
                }
            };
            if let Err(e) = self.call(Method::GET, path, json!({})).await {
                report.add(*kind, format!("Failed to list {}. Error: {}", &path[1..], e));
            }
        }
        Ok(report)
    }

    async fn import_users(&mut self, users: Vec<User>, ctx: &mut ImportContext<'_>) -> Result<()> {
        for user in &users {
            let created = if user.types.contains(&UserType::Email) {
                import_password_user(&*self, user).await
            } else {
                self.create_plain_user(user).await
            };
            match created {
                Ok(()) => {
                    ctx.succeeded();
                    self.enrich_user(user, ctx).await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => ctx.failed(user, e.to_string()),
            }
        }
        Ok(())
    }

    async fn import_databases(
        &mut self,
        databases: Vec<Database>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for database in &databases {
            ctx.add_total(ResourceKind::Collections, database.collections.len() as u64);
            let created = self
                .call(
                    Method::POST,
                    "/databases",
                    json!({ "databaseId": database.id, "name": database.name }),
                )
                .await;
            if let Err(e) = created {
                if e.is_fatal() {
                    return Err(e);
                }
                ctx.failed(database, e.to_string());
                continue;
            }
            ctx.succeeded();

            for collection in &database.collections {
                match self.create_collection(database, collection, ctx).await {
                    Ok(()) => ctx.succeeded_as(ResourceKind::Collections),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        ctx.failed_as(ResourceKind::Collections, collection.as_ref(), e.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    async fn import_documents(
        &mut self,
        documents: Vec<Document>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for document in &documents {
            let path = format!(
                "/databases/{}/collections/{}/documents",
                document.database_id, document.collection.id
            );
            let body = json!({ "documentId": document.id, "data": document.data });
            match self.call(Method::POST, &path, body).await {
                Ok(_) => ctx.succeeded(),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => ctx.failed(document, e.to_string()),
            }
        }
        debug!(count = documents.len(), "Imported document batch");
        Ok(())
    }
}

#[cfg(test)]
#[path = "appwrite_tests.rs"]
mod tests;
