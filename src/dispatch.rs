//! Command protocol: verb + argument map in, result or structured error out.
//!
//! Every verb of the host protocol routes through [`dispatch`]. All failures
//! are recovered here and reported as structured [`Response::Error`] values;
//! the adapter never panics across this boundary. Unknown verbs produce
//! [`Outcome::NotImplemented`], not an error, so hosts can probe capability.

use crate::batch;
use crate::error::{AdapterError, Result};
use crate::predicate::PredicateTerm;
use crate::registry::StoreRegistry;
use crate::types::{FieldMap, StoreConfig};
use serde::{Deserialize, Serialize};

/// Decoded argument map of one command.
///
/// Every field is optional at decode time; each verb demands what it needs
/// through [`require`], yielding `MissingArgument` before any work happens.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandArgs {
    pub store_id: Option<String>,
    pub class_name: Option<String>,
    pub uuid: Option<String>,
    pub primary_key: Option<String>,
    /// Field payload for `createObject`.
    pub fields: Option<FieldMap>,
    /// Field payload for `updateObject`.
    pub value: Option<FieldMap>,
    pub predicate: Option<Vec<PredicateTerm>>,
    pub limit: Option<i64>,
    pub subscription_id: Option<String>,
    pub config: Option<StoreConfig>,
    /// Keys targeted by `deleteGroup`.
    pub primary_keys: Option<Vec<String>>,
    /// Field holding the external resource path for `deleteGroup`.
    pub file_field: Option<String>,
    pub group_field: Option<String>,
    pub group_value: Option<String>,
}

/// Successful result of one command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// Verb completed with nothing to return.
    Done,
    /// A single marshaled record.
    Record(FieldMap),
    /// Query results plus the unlimited total count.
    Results { results: Vec<FieldMap>, count: usize },
    /// Storage location string.
    Path(String),
    /// Remaining-record count from a grouped delete.
    RemainingCount(usize),
    /// The verb is not part of the protocol.
    NotImplemented,
}

/// Wire-shaped response: success payload or structured error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    Success(Outcome),
    Error {
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl From<Result<Outcome>> for Response {
    fn from(result: Result<Outcome>) -> Self {
        match result {
            Ok(outcome) => Response::Success(outcome),
            Err(e) => Response::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
                detail: None,
            },
        }
    }
}

fn require<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| AdapterError::MissingArgument(name.to_string()))
}

/// Execute one command against the registry.
pub fn dispatch(registry: &StoreRegistry, verb: &str, args: &CommandArgs) -> Result<Outcome> {
    tracing::debug!(verb, "dispatching command");

    match verb {
        "initialize" => {
            let store_id = require(&args.store_id, "storeId")?;
            let config = require(&args.config, "config")?;
            registry.open(store_id, config)?;
            Ok(Outcome::Done)
        }
        "reset" => {
            registry.reset_all()?;
            Ok(Outcome::Done)
        }
        _ => {
            let store_id = require(&args.store_id, "storeId")?;
            let store = registry.resolve(store_id)?;

            match verb {
                "createObject" => {
                    let class_name = require(&args.class_name, "className")?;
                    let uuid = require(&args.uuid, "uuid")?;
                    let empty = FieldMap::new();
                    let fields = args.fields.as_ref().unwrap_or(&empty);
                    store.create(class_name, uuid, fields)?;
                    Ok(Outcome::Done)
                }
                "object" => {
                    let class_name = require(&args.class_name, "className")?;
                    let primary_key = require(&args.primary_key, "primaryKey")?;
                    // One-shot lookup reports absence as an error; `find`
                    // itself treats absence as a normal outcome.
                    match store.find(class_name, primary_key)? {
                        Some(record) => Ok(Outcome::Record(record)),
                        None => Err(AdapterError::RecordNotFound {
                            class_name: class_name.clone(),
                            primary_key: primary_key.clone(),
                        }),
                    }
                }
                "objects" => {
                    let class_name = require(&args.class_name, "className")?;
                    let terms = args.predicate.as_deref().unwrap_or(&[]);
                    let limit = args.limit.unwrap_or(-1);
                    let (results, count) = store.query(class_name, terms, limit)?;
                    Ok(Outcome::Results { results, count })
                }
                "updateObject" => {
                    let class_name = require(&args.class_name, "className")?;
                    let primary_key = require(&args.primary_key, "primaryKey")?;
                    let value = require(&args.value, "value")?;
                    let updated = store.update(class_name, primary_key, value)?;
                    Ok(Outcome::Record(updated))
                }
                "deleteObject" => {
                    let class_name = require(&args.class_name, "className")?;
                    let primary_key = require(&args.primary_key, "primaryKey")?;
                    store.delete(class_name, primary_key)?;
                    Ok(Outcome::Done)
                }
                "deleteAllObjects" => {
                    store.delete_all()?;
                    Ok(Outcome::Done)
                }
                "subscribeAllObjects" => {
                    let class_name = require(&args.class_name, "className")?;
                    let subscription_id = require(&args.subscription_id, "subscriptionId")?;
                    store
                        .subscriptions()
                        .subscribe(subscription_id, class_name, &[], -1)?;
                    Ok(Outcome::Done)
                }
                "subscribeObjects" => {
                    let class_name = require(&args.class_name, "className")?;
                    let subscription_id = require(&args.subscription_id, "subscriptionId")?;
                    let terms = args.predicate.as_deref().unwrap_or(&[]);
                    let limit = args.limit.unwrap_or(-1);
                    store
                        .subscriptions()
                        .subscribe(subscription_id, class_name, terms, limit)?;
                    Ok(Outcome::Done)
                }
                "unsubscribe" => {
                    let subscription_id = require(&args.subscription_id, "subscriptionId")?;
                    store.subscriptions().unsubscribe(subscription_id)?;
                    Ok(Outcome::Done)
                }
                "filePath" => Ok(Outcome::Path(store.storage_path())),
                "deleteGroup" => {
                    let class_name = require(&args.class_name, "className")?;
                    let primary_keys = require(&args.primary_keys, "primaryKeys")?;
                    let file_field = require(&args.file_field, "fileField")?;
                    let group_field = require(&args.group_field, "groupField")?;
                    let group_value = require(&args.group_value, "groupValue")?;
                    let remaining = batch::delete_group(
                        &store,
                        class_name,
                        primary_keys,
                        file_field,
                        group_field,
                        group_value,
                    )?;
                    Ok(Outcome::RemainingCount(remaining))
                }
                _ => Ok(Outcome::NotImplemented),
            }
        }
    }
}

/// Convenience wrapper producing a wire-shaped response.
pub fn respond(registry: &StoreRegistry, verb: &str, args: &CommandArgs) -> Response {
    dispatch(registry, verb, args).into()
}
