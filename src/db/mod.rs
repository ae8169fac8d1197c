// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store: user records, password hashing hook and aggregation.
//!
//! [`Store`] wraps one of two backends with the same JSON-document
//! primitives: Firestore in production and an in-process map for tests and
//! local development.

pub mod firestore;
pub mod memory;
pub mod pipeline;

pub use firestore::FirestoreBackend;
pub use memory::MemoryBackend;
pub use pipeline::{Expr, Filter, Lookup, Pipeline, Stage};

use crate::error::AppError;
use crate::models::{NewUser, User, UserPatch};
use crate::services::password;
use futures_util::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Fields that must be unique across `users`.
const USER_UNIQUE_FIELDS: &[&str] = &["username", "email"];

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreBackend),
    Memory(MemoryBackend),
}

/// Document store handle. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    backend: Backend,
}

impl Store {
    /// Connect to Firestore.
    pub async fn connect_firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreBackend::new(project_id).await?),
        })
    }

    /// Create an empty in-process store.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryBackend::new()),
        }
    }

    // ─── Backend Primitives ──────────────────────────────────────

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get(collection, id).await,
            Backend::Memory(db) => Ok(db.get(collection, id)),
        }
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.find(collection, filter).await,
            Backend::Memory(db) => Ok(db.find(collection, filter)),
        }
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique_fields: &[&str],
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.insert(collection, id, doc, unique_fields).await,
            Backend::Memory(db) => db.insert(collection, id, doc, unique_fields),
        }
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.set_fields(collection, id, fields).await,
            Backend::Memory(db) => Ok(db.set_fields(collection, id, fields)),
        }
    }

    /// Create or replace a raw document.
    ///
    /// Used to seed collections this service only reads (videos,
    /// subscriptions).
    pub async fn put_document<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), AppError> {
        let mut value = to_document(doc)?;
        if let Value::Object(map) = &mut value {
            map.insert("_id".to_string(), Value::from(id));
        }

        match &self.backend {
            Backend::Firestore(db) => db.put(collection, id, &value).await,
            Backend::Memory(db) => {
                db.put(collection, id, value);
                Ok(())
            }
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Find the first user whose username or email matches.
    pub async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let mut clauses = Vec::new();
        if let Some(username) = username {
            clauses.push(Filter::eq("username", username));
        }
        if let Some(email) = email {
            clauses.push(Filter::eq("email", email));
        }
        if clauses.is_empty() {
            return Ok(None);
        }

        self.find(collections::USERS, &Filter::or(clauses))
            .await?
            .into_iter()
            .next()
            .map(from_document)
            .transpose()
    }

    /// Create a user. The password is hashed before it is written and the
    /// username/email uniqueness constraint is checked at write time.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: password::hash(new_user.password).await?,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            watch_history: Vec::new(),
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let doc = to_document(&user)?;
        self.insert(collections::USERS, &user.id, doc, USER_UNIQUE_FIELDS)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    AppError::Conflict("User with email or username already exists".to_string())
                }
                other => other,
            })?;

        tracing::debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Apply a partial update and return the updated user.
    ///
    /// Only the patched fields are written; nothing else on the record is
    /// re-validated. Returns `None` if the user does not exist.
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, AppError> {
        if patch.is_empty() {
            return self.find_user_by_id(id).await;
        }

        let mut fields = Map::new();
        if let Some(full_name) = patch.full_name {
            fields.insert("fullName".to_string(), Value::from(full_name));
        }
        if let Some(email) = patch.email {
            fields.insert("email".to_string(), Value::from(email));
        }
        if let Some(avatar) = patch.avatar {
            fields.insert("avatar".to_string(), Value::from(avatar));
        }
        if let Some(cover_image) = patch.cover_image {
            fields.insert("coverImage".to_string(), Value::from(cover_image));
        }
        if let Some(plain) = patch.password {
            fields.insert("password".to_string(), Value::from(password::hash(plain).await?));
        }
        if let Some(token) = patch.refresh_token {
            fields.insert("refreshToken".to_string(), Value::from(token));
        }

        fields.insert(
            "updatedAt".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        self.set_fields(collections::USERS, id, fields)
            .await?
            .map(from_document)
            .transpose()
    }

    // ─── Aggregation ─────────────────────────────────────────────

    /// Run a pipeline against a collection.
    ///
    /// A leading match stage becomes the backend query; without one the
    /// pipeline would scan the whole collection, which is refused.
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Value>, AppError> {
        let (filter, rest) = match pipeline.stages.split_first() {
            Some((Stage::Match(filter), rest)) => (filter, rest),
            _ => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Pipeline on {} must start with a match stage",
                    collection
                )))
            }
        };

        let docs = self.find(collection, filter).await?;
        self.run_stages(docs, rest).await
    }

    fn run_stages<'a>(
        &'a self,
        mut docs: Vec<Value>,
        stages: &'a [Stage],
    ) -> BoxFuture<'a, Result<Vec<Value>, AppError>> {
        Box::pin(async move {
            for stage in stages {
                docs = match stage {
                    Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
                    Stage::Lookup(lookup) => self.run_lookup(docs, lookup).await?,
                    Stage::AddFields(fields) => docs
                        .into_iter()
                        .map(|d| pipeline::add_fields(d, fields))
                        .collect(),
                    Stage::Project(fields) => docs
                        .into_iter()
                        .map(|d| pipeline::project(d, fields))
                        .collect(),
                };
            }
            Ok(docs)
        })
    }

    async fn run_lookup(&self, docs: Vec<Value>, lookup: &Lookup) -> Result<Vec<Value>, AppError> {
        let keys = pipeline::join_keys(&docs, &lookup.local_field);
        let foreign = if keys.is_empty() {
            Vec::new()
        } else {
            self.find(&lookup.from, &Filter::is_in(&lookup.foreign_field, keys))
                .await?
        };

        let mut out = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let mut joined = pipeline::joined_for(&doc, lookup, &foreign);
            if !lookup.pipeline.is_empty() {
                joined = self.run_stages(joined, &lookup.pipeline).await?;
            }
            if let Value::Object(map) = &mut doc {
                map.insert(lookup.as_field.clone(), Value::Array(joined));
            }
            out.push(doc);
        }
        Ok(out)
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode document: {}", e)))
}

/// Decode a stored document into a typed record.
pub fn from_document<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Malformed document: {}", e)))
}
