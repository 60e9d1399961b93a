//! Core types for the store adapter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the primary key field on every class.
///
/// The primary key is assigned at creation time and is immutable thereafter;
/// [`crate::marshal::apply_map`] always skips it.
pub const PRIMARY_KEY_FIELD: &str = "uuid";

/// A dynamically-typed field value as it crosses the command protocol.
///
/// Null is a legal wire value on writes (it clears the field), but reads
/// signal "no value" by omitting the field from the map entirely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Ordered sequence of scalar values.
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Human-readable name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Generic field-name to value mapping; the external representation of a record.
pub type FieldMap = BTreeMap<String, Value>;

/// Semantic type of a scalar field slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Bool,
    Int,
    Double,
    String,
    Bytes,
}

/// One declared field: name, scalar kind, and whether it holds an ordered list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub list: bool,
}

impl FieldSchema {
    pub fn scalar(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            list: false,
        }
    }

    pub fn list(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            list: true,
        }
    }
}

/// Declared schema of one class: an ordered list of fields.
///
/// Every class implicitly carries a `uuid: String` primary key field; it is
/// prepended during normalization if the declaration omits it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl ClassSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Ensure the implicit primary key field is declared first.
    ///
    /// Fails if the class declares `uuid` with a non-string or list type.
    pub fn normalized(mut self) -> crate::error::Result<Self> {
        match self.field(PRIMARY_KEY_FIELD) {
            Some(f) if f.kind == FieldKind::String && !f.list => Ok(self),
            Some(_) => Err(crate::error::AdapterError::Engine(format!(
                "class {}: {} must be a scalar string field",
                self.name, PRIMARY_KEY_FIELD
            ))),
            None => {
                self.fields
                    .insert(0, FieldSchema::scalar(PRIMARY_KEY_FIELD, FieldKind::String));
                Ok(self)
            }
        }
    }
}

/// Configuration for opening one named store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Tag for an in-memory store. Mutually exclusive with `path` in intent;
    /// when both are present the in-memory tag wins, matching the engine's
    /// configuration precedence.
    pub in_memory_identifier: Option<String>,

    /// On-disk storage location.
    pub path: Option<String>,

    /// Optional encryption key handed to the engine as-is.
    pub encryption_key: Option<Vec<u8>>,

    /// Schema registry for this store, loaded once at open time.
    pub schema: Vec<ClassSchema>,
}

impl StoreConfig {
    /// In-memory store with the given tag and schema.
    pub fn in_memory(tag: impl Into<String>, schema: Vec<ClassSchema>) -> Self {
        Self {
            in_memory_identifier: Some(tag.into()),
            schema,
            ..Default::default()
        }
    }

    /// The storage location string reported by the `filePath` verb.
    pub fn storage_location(&self) -> String {
        if let Some(tag) = &self.in_memory_identifier {
            return format!("memory://{tag}");
        }
        self.path.clone().unwrap_or_else(|| "memory://".to_string())
    }
}

/// Full-snapshot change notification pushed to the host.
///
/// Delivered once per observed change to a subscribed result set. `count` is
/// the unlimited result size; `results` is capped by the subscription limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub store_id: String,
    pub subscription_id: String,
    pub results: Vec<FieldMap>,
    pub count: usize,
}
