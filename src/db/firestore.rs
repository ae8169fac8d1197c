// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend for the document store.
//!
//! Documents are stored as JSON objects whose `_id` field doubles as the
//! Firestore document ID. Filters translate to native structured queries;
//! note that Firestore equality does not match array members, so `Eq` is only
//! used on scalar fields.

use crate::db::pipeline::Filter;
use crate::error::AppError;
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::FirestoreQueryFilter;
use serde_json::{Map, Value};

/// Firestore caps `in` queries at 30 values.
const MAX_IN_VALUES: usize = 30;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreBackend {
    client: firestore::FirestoreDb,
}

impl FirestoreBackend {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError> {
        match filter {
            Filter::In { values, .. } if values.is_empty() => Ok(Vec::new()),
            Filter::In { field, values } if values.len() > MAX_IN_VALUES => {
                let mut docs = Vec::new();
                for chunk in values.chunks(MAX_IN_VALUES) {
                    let part = Filter::is_in(field, chunk.to_vec());
                    docs.extend(self.query(collection, part).await?);
                }
                Ok(docs)
            }
            _ => self.query(collection, filter.clone()).await,
        }
    }

    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Value>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| to_query_filter(&q, &filter))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new document.
    ///
    /// Unique fields are checked with a query right before the insert. That
    /// narrows the duplicate window but cannot close it without a transaction.
    pub async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique_fields: &[&str],
    ) -> Result<(), AppError> {
        let checks: Vec<Filter> = unique_fields
            .iter()
            .filter_map(|field| doc.get(*field).map(|v| Filter::eq(field, v.clone())))
            .collect();

        if !checks.is_empty() && !self.query(collection, Filter::or(checks)).await?.is_empty() {
            return Err(AppError::Conflict(format!(
                "{} already taken",
                unique_fields.join(" or ")
            )));
        }

        let _: Value = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite the given top-level fields and return the updated document.
    ///
    /// Returns `None` without writing if the document does not exist.
    pub async fn set_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        if self.get(collection, id).await?.is_none() {
            return Ok(None);
        }

        let paths: Vec<String> = fields.keys().cloned().collect();
        let updated: Value = self
            .client
            .fluent()
            .update()
            .fields(paths)
            .in_col(collection)
            .document_id(id)
            .object(&Value::Object(fields))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(Some(updated))
    }

    /// Create or replace a document.
    pub async fn put(&self, collection: &str, id: &str, doc: &Value) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

fn to_query_filter(q: &FirestoreQueryFilterBuilder, filter: &Filter) -> Option<FirestoreQueryFilter> {
    match filter {
        Filter::Eq { field, value } => q.field(field.as_str()).eq(value.clone()),
        Filter::In { field, values } => q.field(field.as_str()).is_in(values.clone()),
        Filter::Or(filters) => q.for_any(filters.iter().map(|f| to_query_filter(q, f))),
    }
}
