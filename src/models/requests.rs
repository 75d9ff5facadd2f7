//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.
//!
//! Option fields are kept loosely typed here. A value of the wrong type is
//! not a body error; it becomes a field error from the validator, reported
//! in field order and only after the cache name has been checked.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::options::{CacheOptions, Proposed, RefreshSetting};
use crate::refresh::RefreshProvider;

/// Option overrides as sent over the wire.
///
/// Each field holds the raw JSON it arrived with. A field sent as `null`
/// is kept as `Some(Value::Null)` so it can be told apart from an omitted
/// one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionsRequest {
    #[serde(default, deserialize_with = "present")]
    pub validity: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub evict: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub refresh_callback: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub wait_for_refresh: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub wait_until_done: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A deferred refresh: a registered target name plus fixed arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub target: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl From<OptionsRequest> for CacheOptions {
    fn from(req: OptionsRequest) -> Self {
        CacheOptions {
            validity: req.validity.and_then(millis),
            evict: req.evict.and_then(millis),
            refresh_callback: req.refresh_callback.map(refresh_setting),
            wait_for_refresh: req.wait_for_refresh.and_then(json_flag),
            wait_until_done: req.wait_until_done.and_then(json_flag),
        }
    }
}

// == Wire Conversions ==

// `null` leaves a duration unset.
fn millis(raw: Value) -> Option<Proposed<i64>> {
    match raw {
        Value::Null => None,
        Value::Number(n) => Some(n.as_i64().map_or(Proposed::Malformed, Proposed::Value)),
        _ => Some(Proposed::Malformed),
    }
}

fn json_flag(raw: Value) -> Option<Proposed<bool>> {
    match raw {
        Value::Null => None,
        Value::Bool(flag) => Some(Proposed::Value(flag)),
        _ => Some(Proposed::Malformed),
    }
}

/// `null` is an explicit "no refresh" and overrides the instance default.
fn refresh_setting(raw: Value) -> RefreshSetting {
    if raw.is_null() {
        return RefreshSetting::Disabled;
    }
    match serde_json::from_value::<RefreshRequest>(raw) {
        Ok(req) => RefreshSetting::Provider(RefreshProvider::deferred(req.target, req.args)),
        Err(_) => RefreshSetting::Malformed,
    }
}

/// Query flags accept `true` or `false` and nothing else.
fn query_flag(raw: Option<String>) -> Option<Proposed<bool>> {
    raw.map(|raw| match raw.as_str() {
        "true" => Proposed::Value(true),
        "false" => Proposed::Value(false),
        _ => Proposed::Malformed,
    })
}

/// Request body for POST /caches
#[derive(Debug, Clone, Deserialize)]
pub struct StartCacheRequest {
    /// Instance name
    pub name: String,
    /// Instance defaults
    #[serde(default)]
    pub options: OptionsRequest,
}

/// Request body for PUT /caches/:name/keys/:key
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: String,
    /// Per-call overrides
    #[serde(default)]
    pub options: OptionsRequest,
}

/// Query string for GET /caches/:name/keys/:key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    pub wait_for_refresh: Option<String>,
}

impl From<GetQuery> for CacheOptions {
    fn from(query: GetQuery) -> Self {
        CacheOptions {
            wait_for_refresh: query_flag(query.wait_for_refresh),
            ..CacheOptions::default()
        }
    }
}

/// Query string for DELETE /caches/:name/keys/:key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvictQuery {
    pub wait_until_done: Option<String>,
}

impl From<EvictQuery> for CacheOptions {
    fn from(query: EvictQuery) -> Self {
        CacheOptions {
            wait_until_done: query_flag(query.wait_until_done),
            ..CacheOptions::default()
        }
    }
}
