//! Wire shapes of the admin API and the strict decode into core entities.
use crate::model::{Entity, EntityId, EntityStatus, Scalar};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("entity at position {0} has an empty id")]
    EmptyId(usize),
    #[error("entity {id} has unknown status {status:?}")]
    UnknownStatus { id: String, status: String },
    #[error("entity {id} attribute {key:?} is not a scalar")]
    NonScalar { id: String, key: String },
}

#[derive(Deserialize, Debug)]
pub struct ListResp {
    pub items: Vec<RawEntity>,
}

#[derive(Deserialize, Debug)]
pub struct RawEntity {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
pub struct MutationResp {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode a list response body. One malformed entity rejects the whole page.
pub fn decode_list(body: &str) -> Result<Vec<Entity>, DecodeError> {
    let resp: ListResp =
        serde_json::from_str(body).map_err(|e| DecodeError::Json(e.to_string()))?;
    resp.items
        .into_iter()
        .enumerate()
        .map(|(pos, raw)| decode_entity(pos, raw))
        .collect()
}

fn decode_entity(pos: usize, raw: RawEntity) -> Result<Entity, DecodeError> {
    let id = raw.id.trim();
    if id.is_empty() {
        return Err(DecodeError::EmptyId(pos));
    }
    let status: EntityStatus = raw.status.parse().map_err(|_| DecodeError::UnknownStatus {
        id: id.to_string(),
        status: raw.status.clone(),
    })?;

    let mut attributes = BTreeMap::new();
    for (key, value) in raw.attributes {
        let scalar = decode_scalar(value).ok_or_else(|| DecodeError::NonScalar {
            id: id.to_string(),
            key: key.clone(),
        })?;
        attributes.insert(key, scalar);
    }

    Ok(Entity {
        id: EntityId::new(id),
        status,
        attributes,
    })
}

fn decode_scalar(value: Value) -> Option<Scalar> {
    match value {
        Value::Null => Some(Scalar::Null),
        Value::Bool(b) => Some(Scalar::Bool(b)),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
            Ok(ts) => Some(Scalar::Timestamp(ts.with_timezone(&Utc))),
            Err(_) => Some(Scalar::Text(s)),
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}
