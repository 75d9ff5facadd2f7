//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::EngineSettings;
use crate::error::Result;
use crate::manager::CacheManager;
use crate::models::{
    CachesResponse, EvictQuery, EvictResponse, GetQuery, GetResponse, HealthResponse, SetRequest,
    SetResponse, StartCacheRequest, StartResponse, StatsResponse, StopResponse,
};
use crate::options::CacheOptions;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to every running cache instance
    pub manager: CacheManager,
}

impl AppState {
    pub fn new(manager: CacheManager) -> Self {
        Self { manager }
    }

    /// State backed by an in-process host with the given engine settings.
    pub fn local(settings: EngineSettings) -> Self {
        Self::new(CacheManager::local(settings))
    }
}

/// Handler for POST /caches
pub async fn start_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<StartCacheRequest>,
) -> Result<(StatusCode, Json<StartResponse>)> {
    state
        .manager
        .start_cache(&req.name, CacheOptions::from(req.options))
        .await?;

    Ok((StatusCode::CREATED, Json(StartResponse::new(req.name))))
}

/// Handler for DELETE /caches/:name
pub async fn stop_cache_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StopResponse>> {
    state.manager.stop_cache(&name).await?;

    Ok(Json(StopResponse::new(name)))
}

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    Json(CachesResponse {
        caches: state.manager.cache_names(),
    })
}

/// Handler for GET /caches/:name/keys/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    let value = state
        .manager
        .get(&name, &key, &CacheOptions::from(query))
        .await?;

    Ok(Json(GetResponse::new(name, key, value)))
}

/// Handler for PUT /caches/:name/keys/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    state
        .manager
        .set(&name, key.clone(), req.value, &CacheOptions::from(req.options))
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for DELETE /caches/:name/keys/:key
pub async fn evict_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Query(query): Query<EvictQuery>,
) -> Result<Json<EvictResponse>> {
    state
        .manager
        .evict(&name, key.clone(), &CacheOptions::from(query))
        .await?;

    Ok(Json(EvictResponse::new(key)))
}

/// Handler for GET /caches/:name/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatsResponse>> {
    let stats = state.manager.get_stats(&name)?;

    Ok(Json(StatsResponse::new(name, stats)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.manager.cache_names().len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::models::OptionsRequest;
    use crate::options::OptionField;
    use serde_json::json;

    fn state() -> AppState {
        AppState::local(EngineSettings::default())
    }

    fn start_request(name: &str) -> StartCacheRequest {
        StartCacheRequest {
            name: name.to_string(),
            options: OptionsRequest::default(),
        }
    }

    fn sync_set(value: &str) -> SetRequest {
        SetRequest {
            value: value.to_string(),
            options: OptionsRequest {
                wait_until_done: Some(json!(true)),
                ..OptionsRequest::default()
            },
        }
    }

    fn path(name: &str, key: &str) -> Path<(String, String)> {
        Path((name.to_string(), key.to_string()))
    }

    #[tokio::test]
    async fn test_start_set_and_get_handlers() {
        let state = state();
        let (status, _) = start_cache_handler(State(state.clone()), Json(start_request("users")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        set_handler(State(state.clone()), path("users", "k"), Json(sync_set("v")))
            .await
            .unwrap();

        let response = get_handler(
            State(state.clone()),
            path("users", "k"),
            Query(GetQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(response.value, "v");
        assert_eq!(response.cache, "users");
    }

    #[tokio::test]
    async fn test_get_unknown_cache() {
        let result = get_handler(State(state()), path("ghost", "k"), Query(GetQuery::default())).await;
        assert_eq!(result.unwrap_err(), CacheError::InvalidCacheName("ghost".into()));
    }

    #[tokio::test]
    async fn test_evict_handler() {
        let state = state();
        start_cache_handler(State(state.clone()), Json(start_request("users")))
            .await
            .unwrap();
        set_handler(State(state.clone()), path("users", "k"), Json(sync_set("v")))
            .await
            .unwrap();

        let query = EvictQuery {
            wait_until_done: Some("true".into()),
        };
        evict_handler(State(state.clone()), path("users", "k"), Query(query))
            .await
            .unwrap();

        let result = get_handler(State(state), path("users", "k"), Query(GetQuery::default())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_set_options() {
        let state = state();
        start_cache_handler(State(state.clone()), Json(start_request("users")))
            .await
            .unwrap();

        let req = SetRequest {
            value: "v".into(),
            options: OptionsRequest {
                validity: Some(json!(0)),
                ..OptionsRequest::default()
            },
        };
        let result = set_handler(State(state), path("users", "k"), Json(req)).await;
        assert_eq!(result.unwrap_err(), CacheError::InvalidOption(OptionField::Validity));
    }

    #[tokio::test]
    async fn test_malformed_query_on_unknown_cache_reports_cache() {
        let query = GetQuery {
            wait_for_refresh: Some("yes".into()),
        };
        let result = get_handler(State(state()), path("ghost", "k"), Query(query)).await;
        assert_eq!(result.unwrap_err(), CacheError::InvalidCacheName("ghost".into()));
    }

    #[tokio::test]
    async fn test_malformed_query_on_known_cache_reports_field() {
        let state = state();
        start_cache_handler(State(state.clone()), Json(start_request("users")))
            .await
            .unwrap();

        let query = EvictQuery {
            wait_until_done: Some("soon".into()),
        };
        let result = evict_handler(State(state), path("users", "k"), Query(query)).await;
        assert_eq!(
            result.unwrap_err(),
            CacheError::InvalidOption(OptionField::WaitUntilDone)
        );
    }

    #[tokio::test]
    async fn test_stats_and_list_handlers() {
        let state = state();
        start_cache_handler(State(state.clone()), Json(start_request("b")))
            .await
            .unwrap();
        start_cache_handler(State(state.clone()), Json(start_request("a")))
            .await
            .unwrap();

        let list = list_caches_handler(State(state.clone())).await;
        assert_eq!(list.caches, vec!["a".to_string(), "b".to_string()]);

        let stats = stats_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();
        assert_eq!(stats.stats.entries, 0);

        let stopped = stop_cache_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();
        assert_eq!(stopped.name, "a");
        assert!(stats_handler(State(state), Path("a".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.caches, 0);
    }
}
