// src/handlers/mod.rs
pub mod content_suggestion;
pub mod images;
pub mod jobs;
pub mod project_manager;
pub mod video_scripts;
pub mod video_search;
pub mod voice;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::error::{AppError, AppResult};
use crate::generators::GenerationError;

/// Run media work on its own task so a client disconnect does not cancel it
/// halfway; the handler only waits for the result.
pub(crate) async fn run_detached<T, F>(work: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        tracing::error!("❌ Media task ended abnormally: {}", e);
        AppError::Generation(GenerationError::Failed(format!("media task failed: {}", e)))
    })?
}

/// An empty body means "all defaults"; anything else must be valid JSON.
pub(crate) fn optional_json<T>(body: &Bytes) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::jobs::JobManager;
    use crate::models::auth::Claims;
    use crate::models::NewScript;
    use crate::store::{InMemoryStore, ScriptStore};
    use crate::workflow::testing::coordinator_with;
    use crate::{build_router, AppState};

    const SECRET: &str = "router-test-secret";

    fn app() -> (Router, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let (coordinator, _) = coordinator_with(store.clone());
        let state = Arc::new(AppState {
            store: store.clone(),
            coordinator: Arc::new(coordinator),
            job_manager: Arc::new(JobManager::new(1)),
            youtube_client: None,
            tiktok_client: None,
            jwt_secret: SECRET.to_string(),
        });
        (build_router(state), store)
    }

    fn bearer(user_id: Uuid, is_staff: bool) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            username: "tester".into(),
            email: "tester@example.com".into(),
            is_superuser: false,
            is_staff,
            exp: now + 3600,
            iat: now,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn owned_script(store: &InMemoryStore, creator_id: Option<Uuid>) -> Uuid {
        store
            .create_script(NewScript {
                title: "Owned".into(),
                description: String::new(),
                target_audience: "all".into(),
                total_duration: 30,
                creator_id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn generate_returns_script_with_ordered_scenes() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/video-scripts/generate",
                json!({"topic": "volcanoes", "target_audience": "kids", "duration": 60}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "draft");
        let numbers: Vec<i64> = body["scenes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["scene_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn generate_rejects_bad_duration() {
        let (app, store) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/video-scripts/generate",
                json!({"topic": "volcanoes", "target_audience": "kids", "duration": 0}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(store.scene_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_script_is_not_found() {
        let (app, _) = app();
        let uri = format!("/video-scripts/scripts/{}", Uuid::new_v4());
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn listing_rejects_oversized_page() {
        let (app, _) = app();
        let (status, _) = send(&app, get("/video-scripts/scripts?limit=500")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn project_manager_requires_token() {
        let (app, _) = app();
        let uri = format!("/project-manager/user/{}/scripts", Uuid::new_v4());
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn project_manager_scopes_listing_to_caller() {
        let (app, store) = app();
        let me = Uuid::new_v4();
        let someone_else = Uuid::new_v4();
        owned_script(&store, Some(me)).await;
        owned_script(&store, Some(someone_else)).await;

        let request = Request::get(format!("/project-manager/user/{}/scripts", me))
            .header(header::AUTHORIZATION, bearer(me, false))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let request = Request::get(format!("/project-manager/user/{}/scripts", someone_else))
            .header(header::AUTHORIZATION, bearer(me, false))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let request = Request::get(format!("/project-manager/user/{}/scripts", someone_else))
            .header(header::AUTHORIZATION, bearer(me, true))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn project_manager_archives_own_script() {
        let (app, store) = app();
        let me = Uuid::new_v4();
        let script_id = owned_script(&store, Some(me)).await;

        let request = Request::post(format!("/project-manager/scripts/{}/archive", script_id))
            .header(header::AUTHORIZATION, bearer(me, false))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "archived");

        let request = Request::delete(format!("/project-manager/scripts/{}", script_id))
            .header(header::AUTHORIZATION, bearer(Uuid::new_v4(), false))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(store.get_script(script_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn media_job_is_accepted() {
        let (app, store) = app();
        let script_id = owned_script(&store, None).await;

        let (status, body) = send(
            &app,
            post_json(&format!("/jobs/media/{}", script_id), json!({"kind": "image"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["script_id"], script_id.to_string());
        assert_eq!(body["status"], "queued");

        let job_id = body["job_id"].as_str().unwrap().to_string();
        let (status, _) = send(&app, get(&format!("/jobs/{}", job_id))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn media_job_for_missing_script_is_not_found() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            post_json(&format!("/jobs/media/{}", Uuid::new_v4()), json!({"kind": "voice"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn video_search_without_client_reports_error() {
        let (app, _) = app();
        let (status, body) = send(&app, get("/video-search/youtube/cooking")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn batch_without_body_uses_defaults() {
        let (app, store) = app();
        let script_id = owned_script(&store, None).await;

        let request = Request::post(format!("/images/generate-for-script/{}", script_id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["script_id"], script_id.to_string());
    }

    #[tokio::test]
    async fn batch_with_malformed_params_is_rejected() {
        let (app, store) = app();
        let script_id = owned_script(&store, None).await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/images/generate-for-script/{}", script_id),
                json!({"width": "big"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("Invalid JSON"));

        let request = Request::post(format!("/voice/script-to-speech/{}", script_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let script = store.get_script(script_id).await.unwrap().unwrap();
        assert_eq!(script.status, crate::models::ScriptStatus::Draft);
    }

    #[tokio::test]
    async fn search_routes_without_clients_report_errors() {
        let (app, _) = app();
        for uri in ["/video-search/google/cooking", "/video-search/tiktok/cooking"] {
            let (status, body) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
            assert!(body["message"].as_str().unwrap().contains("not configured"));
        }
    }

    #[tokio::test]
    async fn content_suggestion_validates_request() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            post_json(
                "/content-suggestion/youtube/search",
                json!({"keyword": "  ", "max_results": 5}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json(
                "/content-suggestion/youtube/search",
                json!({"keyword": "cooking", "max_results": 0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_reports_collaborators() {
        let (app, _) = app();
        let (status, body) = send(&app, get("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"], true);
        assert_eq!(body["script_generator"], "mock");
        assert_eq!(body["youtube_search"], false);
        assert_eq!(body["tiktok_search"], false);
    }
}
