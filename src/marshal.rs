//! Dynamic record marshaling between native records and generic field maps.
//!
//! Both directions iterate the class's declared field set from the schema
//! registry, never the payload: unknown payload keys are ignored, and reads
//! cannot produce undeclared fields. Null fields are omitted on read; absence
//! in the map, not an explicit null, is the wire signal for "no value".

use crate::engine::{NativeRecord, NativeValue};
use crate::error::{AdapterError, Result};
use crate::types::{ClassSchema, FieldKind, FieldMap, FieldSchema, Value, PRIMARY_KEY_FIELD};

/// Convert a native record into a generic field map.
///
/// Non-null scalars are emitted as-is; list fields become an ordered
/// [`Value::List`] of scalars; null fields are omitted entirely.
pub fn record_to_map(schema: &ClassSchema, record: &NativeRecord) -> FieldMap {
    let mut map = FieldMap::new();
    for field in &schema.fields {
        if let Some(value) = record.get(&field.name) {
            map.insert(field.name.clone(), native_to_value(value));
        }
    }
    map
}

/// Apply a field map onto a native record.
///
/// Every declared field present in the map is assigned; the primary key field
/// is always skipped (creation-time identity, immutable thereafter). A wire
/// null clears the field. List values are copied into a fresh native list,
/// never aliased. Fails with `UnsupportedFieldType` if a value cannot be
/// coerced into the field's declared kind; the record is left partially
/// updated, so callers must run this inside a cancellable transaction.
pub fn apply_map(schema: &ClassSchema, record: &mut NativeRecord, fields: &FieldMap) -> Result<()> {
    for field in &schema.fields {
        if field.name == PRIMARY_KEY_FIELD {
            continue;
        }
        let Some(value) = fields.get(&field.name) else {
            continue;
        };
        match value {
            Value::Null => record.unset(&field.name),
            _ => {
                let native = coerce(field, value)?;
                record.set(&field.name, native);
            }
        }
    }
    Ok(())
}

/// Coerce one wire value into the field's declared native kind.
fn coerce(field: &FieldSchema, value: &Value) -> Result<NativeValue> {
    if field.list {
        let Value::List(items) = value else {
            return Err(unsupported(field));
        };
        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            elements.push(coerce_scalar(field, item)?);
        }
        return Ok(NativeValue::List(elements));
    }
    coerce_scalar(field, value)
}

fn coerce_scalar(field: &FieldSchema, value: &Value) -> Result<NativeValue> {
    match (field.kind, value) {
        (FieldKind::Bool, Value::Bool(b)) => Ok(NativeValue::Bool(*b)),
        (FieldKind::Int, Value::Int(n)) => Ok(NativeValue::Int(*n)),
        (FieldKind::Double, Value::Double(d)) => Ok(NativeValue::Double(*d)),
        // Integer wire values widen into double slots.
        (FieldKind::Double, Value::Int(n)) => Ok(NativeValue::Double(*n as f64)),
        (FieldKind::String, Value::String(s)) => Ok(NativeValue::String(s.clone())),
        (FieldKind::Bytes, Value::Bytes(b)) => Ok(NativeValue::Bytes(b.clone())),
        _ => Err(unsupported(field)),
    }
}

fn unsupported(field: &FieldSchema) -> AdapterError {
    AdapterError::UnsupportedFieldType {
        field: field.name.clone(),
    }
}

fn native_to_value(value: &NativeValue) -> Value {
    match value {
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Int(n) => Value::Int(*n),
        NativeValue::Double(d) => Value::Double(*d),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::Bytes(b) => Value::Bytes(b.clone()),
        NativeValue::List(items) => Value::List(items.iter().map(native_to_value).collect()),
    }
}
