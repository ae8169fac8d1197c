// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Query filters and multi-stage aggregation pipelines over JSON documents.
//!
//! A pipeline is plain data. The leading match is pushed down to the backend
//! query, lookups are resolved by [`crate::db::Store::aggregate`], and the
//! remaining stages are evaluated in process by the helpers in this module.

use serde_json::{Map, Value};

/// Predicate over a document.
///
/// Field paths use dots to descend into nested objects; arrays along the way
/// are flattened, so `subscribers.subscriber` yields every subscriber ID.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals (or, for arrays, contains) the value.
    Eq { field: String, value: Value },
    /// Field equals any of the values.
    In { field: String, values: Vec<Value> },
    /// Any of the nested filters matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.to_string(),
            values,
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq { field, value } => values_at(doc, field).into_iter().any(|v| v == value),
            Filter::In { field, values } => values_at(doc, field)
                .into_iter()
                .any(|v| values.contains(v)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Join another collection into each document.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// Foreign collection
    pub from: String,
    /// Path in the input document holding the join key(s)
    pub local_field: String,
    /// Path in the foreign document compared against the key(s)
    pub foreign_field: String,
    /// Output field receiving the array of joined documents
    pub as_field: String,
    /// Stages applied to each joined set before it is attached
    pub pipeline: Vec<Stage>,
}

impl Lookup {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
            pipeline: Vec::new(),
        }
    }

    /// Attach a sub-pipeline run over each joined set.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline.stages;
        self
    }
}

/// Computed field expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number of elements in the array at the path (0 if absent).
    Size(String),
    /// First element of the array at the path (null if empty).
    First(String),
    /// Whether the needle appears among the values at the path.
    Contains { haystack: String, needle: Value },
}

impl Expr {
    pub fn size(path: &str) -> Self {
        Expr::Size(path.to_string())
    }

    pub fn first(path: &str) -> Self {
        Expr::First(path.to_string())
    }

    pub fn contains(haystack: &str, needle: impl Into<Value>) -> Self {
        Expr::Contains {
            haystack: haystack.to_string(),
            needle: needle.into(),
        }
    }

    fn evaluate(&self, doc: &Value) -> Value {
        match self {
            Expr::Size(path) => {
                let len = lookup_path(doc, path)
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Value::from(len as u64)
            }
            Expr::First(path) => lookup_path(doc, path)
                .and_then(Value::as_array)
                .and_then(|arr| arr.first())
                .cloned()
                .unwrap_or(Value::Null),
            Expr::Contains { haystack, needle } => {
                let found = !needle.is_null()
                    && values_at(doc, haystack).into_iter().any(|v| v == needle);
                Value::Bool(found)
            }
        }
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    AddFields(Vec<(String, Expr)>),
    /// Keep only the listed top-level fields (plus `_id`).
    Project(Vec<String>),
}

/// Ordered list of stages run against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.stages.push(Stage::Lookup(lookup));
        self
    }

    pub fn add_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Expr)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect();
        self.stages.push(Stage::AddFields(fields));
        self
    }

    pub fn project<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        let fields = fields.into_iter().map(str::to_string).collect();
        self.stages.push(Stage::Project(fields));
        self
    }
}

/// Resolve a dotted path to a single value without array flattening.
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.get(key))
}

/// Collect every scalar reachable at a dotted path, flattening arrays.
pub fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for key in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|v| match v {
                Value::Array(items) => items.iter().filter_map(|item| item.get(key)).collect(),
                other => other.get(key).into_iter().collect::<Vec<_>>(),
            })
            .collect();
    }

    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        })
        .collect()
}

/// Apply an add-fields stage to one document.
pub fn add_fields(mut doc: Value, fields: &[(String, Expr)]) -> Value {
    let computed: Vec<(String, Value)> = fields
        .iter()
        .map(|(name, expr)| (name.clone(), expr.evaluate(&doc)))
        .collect();

    if let Value::Object(map) = &mut doc {
        for (name, value) in computed {
            map.insert(name, value);
        }
    }
    doc
}

/// Apply a projection to one document. `_id` is always kept.
pub fn project(doc: Value, fields: &[String]) -> Value {
    match doc {
        Value::Object(mut map) => {
            let mut out = Map::new();
            if let Some(id) = map.remove("_id") {
                out.insert("_id".to_string(), id);
            }
            for field in fields {
                if let Some(value) = map.remove(field) {
                    out.insert(field.clone(), value);
                }
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Distinct join keys found at `path` across the documents, in first-seen order.
pub fn join_keys(docs: &[Value], path: &str) -> Vec<Value> {
    let mut keys: Vec<Value> = Vec::new();
    for doc in docs {
        for value in values_at(doc, path) {
            if !value.is_null() && !keys.contains(value) {
                keys.push(value.clone());
            }
        }
    }
    keys
}

/// Foreign documents joined to one input document.
///
/// Results follow the order of the local key(s), so an array of IDs comes
/// back in the same order it is stored. Each foreign document appears once.
pub fn joined_for(doc: &Value, lookup: &Lookup, foreign: &[Value]) -> Vec<Value> {
    let mut taken = vec![false; foreign.len()];
    let mut joined = Vec::new();

    for key in values_at(doc, &lookup.local_field) {
        for (idx, candidate) in foreign.iter().enumerate() {
            if taken[idx] {
                continue;
            }
            if values_at(candidate, &lookup.foreign_field)
                .into_iter()
                .any(|v| v == key)
            {
                taken[idx] = true;
                joined.push(candidate.clone());
            }
        }
    }

    joined
}
