use crate::config::ServerConfig;
use crate::data::{GroupingRequest, GroupingResult};
use crate::{partition, roster, solver};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("roster has {count} students, the limit is {limit}")]
    TooManyStudents { count: usize, limit: usize },
    #[error("grouping task failed: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::TooManyStudents { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

async fn generate_handler(
    State(config): State<Arc<ServerConfig>>,
    Json(request): Json<GroupingRequest>,
) -> Result<Json<GroupingResult>, ApiError> {
    if request.students.len() > config.max_students {
        return Err(ApiError::TooManyStudents {
            count: request.students.len(),
            limit: config.max_students,
        });
    }

    let group_size = partition::clamp_group_size(request.preferred_group_size);
    if group_size != request.preferred_group_size {
        warn!(
            "Preferred group size {} clamped to {}",
            request.preferred_group_size, group_size
        );
    }

    let mut options = request.options;
    if options.seed == 0 {
        options.seed = config.default_seed;
    }

    // the engine is synchronous, keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let roster = roster::reconcile(request.students, &request.aliases);
        solver::generate_groups(&roster.students, group_size, &options)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(result))
}

pub fn router(config: Arc<ServerConfig>) -> Router {
    Router::new()
        .route("/v1/groups/generate", post(generate_handler))
        .with_state(config)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(config))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn post_json(config: ServerConfig, body: String) -> (StatusCode, Vec<u8>) {
        let response = router(Arc::new(config))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/groups/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn students(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "id": format!("S{:03}", i), "name": format!("Student {}", i) }))
            .collect()
    }

    #[tokio::test]
    async fn test_generate_endpoint() {
        let body = json!({ "students": students(8), "preferredGroupSize": 4 });
        let (status, bytes) = post_json(ServerConfig::default(), body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["strategy"], "strict");
        assert_eq!(value["separationConflicts"], 0);
        assert_eq!(value["unassignedCount"], 0);
        assert_eq!(value["groups"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_group_size_clamped() {
        let body = json!({ "students": students(6), "preferredGroupSize": 1 });
        let (status, bytes) = post_json(ServerConfig::default(), body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let result: GroupingResult = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(result.groups.len(), 3);
        assert!(result.groups.iter().all(|g| g.len() == 2));
    }

    #[tokio::test]
    async fn test_roster_limit() {
        let config = ServerConfig {
            max_students: 5,
            ..Default::default()
        };
        let body = json!({ "students": students(6), "preferredGroupSize": 3 });
        let (status, bytes) = post_json(config, body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "roster has 6 students, the limit is 5"
        );
    }

    #[tokio::test]
    async fn test_legacy_separation_honoured() {
        let mut roster = students(6);
        roster[0]["separationIDs"] = json!(["legacy-1"]);
        let body = json!({
            "students": roster,
            "preferredGroupSize": 3,
            "options": { "respectSeparations": true },
            "aliases": { "legacy-1": "S001" }
        });
        let (status, bytes) = post_json(ServerConfig::default(), body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let result: GroupingResult = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(result.separation_conflicts, 0);
        let together = result
            .groups
            .iter()
            .any(|g| g.contains(&"S000".to_string()) && g.contains(&"S001".to_string()));
        assert!(!together);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let (status, _) = post_json(ServerConfig::default(), "{\"students\": 3}".to_string()).await;
        assert!(status.is_client_error());
    }
}
