//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - health at `/`
/// - quiz and psychology API under `/api/...`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::http_health))
        // Quiz
        .route("/api/quiz/generate", post(http::http_generate_quiz))
        .route("/api/quiz/categories", get(http::http_get_categories))
        // Psychology ("questions" is an alias kept for older clients)
        .route("/api/psychology/generate", post(http::http_generate_psychology))
        .route("/api/psychology/questions", post(http::http_generate_psychology))
        .route("/api/psychology/analyze", post(http::http_analyze_personality))
        .route("/api/psychology/traits", get(http::http_get_traits))
        // Service
        .route("/api/stats", get(http::http_get_stats))
        .route("/api/model/info", get(http::http_get_model_info))
        .route("/api/model/reload", post(http::http_reload_models))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ModelPaths, ServerConfig};
    use crate::slots::testing::MemoryBackend;

    const QUIZ: &str = " Which gas do plants absorb from the air? A) Oxygen B) Carbon dioxide C) Helium Answer:B";
    const PSYCH: &str = " Do you prefer a planned weekend? A) Always B) Depends C) Never";

    fn app(loaded: bool) -> (Router, Arc<AppState>) {
        let cfg = ServerConfig {
            models: ModelPaths { quiz: "quiz".into(), psychology: "psych".into(), analysis: "analysis".into() },
            ..ServerConfig::default()
        };
        let scripts: &[(&str, &str)] = if loaded {
            &[("quiz", QUIZ), ("psych", PSYCH), ("analysis", " ok")]
        } else {
            &[]
        };
        let state = Arc::new(AppState::new(cfg, Arc::new(MemoryBackend::with(scripts))));
        state.load_models();
        (build_router(state.clone()), state)
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("request");
        let resp = app.oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn health_reports_loaded_models() {
        let (app, _) = app(true);
        let (status, body) = call(app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["modelLoaded"], true);
        assert_eq!(body["totalRequests"], 1);
        assert!(body["aiStats"]["totalGenerated"].is_number());
    }

    #[tokio::test]
    async fn quiz_defaults_apply_to_empty_body() {
        let (app, state) = app(true);
        let (status, body) = call(app, Method::POST, "/api/quiz/generate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["aiGenerated"], true);
        assert_eq!(body["question"]["category"], "Science");
        assert_eq!(body["question"]["difficulty"], "Medium");
        assert_eq!(body["question"]["answers"], json!(["Oxygen", "Carbon dioxide", "Helium"]));
        assert_eq!(body["question"]["correctAnswerIndex"], 1);
        assert_eq!(body["generationTimeUnit"], "ms");
        assert_eq!(state.requests.snapshot().successful_generations, 1);
    }

    #[tokio::test]
    async fn quiz_without_models_is_a_counted_fallback() {
        let (app, state) = app(false);
        let body = json!({"category": "Engineering", "difficulty": "Hard", "playerName": "ada"});
        let (status, body) = call(app, Method::POST, "/api/quiz/generate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["aiGenerated"], false);
        assert_eq!(body["aiModel"], "Fallback");
        assert_eq!(body["question"]["stealChance"], 25.0);
        assert_eq!(state.requests.snapshot().failed_generations, 1);
    }

    #[tokio::test]
    async fn psychology_count_is_validated() {
        for count in [0, 17] {
            let (app, _) = app(true);
            let (status, body) = call(app, Method::POST, "/api/psychology/generate", Some(json!({ "count": count }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap_or_default().contains("between 1 and 16"));
        }
    }

    #[tokio::test]
    async fn psychology_questions_alias_caps_at_eight() {
        let (app, _) = app(true);
        let (status, body) = call(app, Method::POST, "/api/psychology/questions", Some(json!({ "count": 12 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 8);
        assert_eq!(body["questions"][0]["trait"], "E/I");
        assert_eq!(body["questions"][7]["trait"], "J/P");
        assert_eq!(body["questions"][0]["options"], json!(["Always", "Depends", "Never"]));
    }

    #[tokio::test]
    async fn analyze_rejects_missing_or_empty_answers() {
        let (app1, _) = app(true);
        let (status, _) = call(app1, Method::POST, "/api/psychology/analyze", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (app2, _) = app(true);
        let (status, body) = call(app2, Method::POST, "/api/psychology/analyze", Some(json!({ "answers": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No answers provided");
    }

    #[tokio::test]
    async fn analyze_flattens_result() {
        let (app, _) = app(true);
        let answers: Vec<Value> = (1..=8).map(|id| json!({ "questionId": id, "selectedOption": 2 })).collect();
        let (status, body) = call(app, Method::POST, "/api/psychology/analyze", Some(json!({ "answers": answers }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["personalityType"], "INFP");
        assert_eq!(body["title"], "The Mediator");
        assert_eq!(body["aiGenerated"], false);
        assert!(body["scores"]["I"].as_f64().unwrap_or_default() > 0.5);
        assert!(body["analysisTime"].is_number());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (app, _) = app(true);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/psychology/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let resp = app.oneshot(req).await.expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_without_models_report_status() {
        let (app, _) = app(false);
        let (status, body) = call(app, Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai"]["status"], "Model not loaded");
        assert!(body.get("psychology").is_none());
        assert_eq!(body["server"]["totalRequests"], 1);
    }

    #[tokio::test]
    async fn static_listings() {
        let (app1, _) = app(false);
        let (_, cats) = call(app1, Method::GET, "/api/quiz/categories", None).await;
        assert_eq!(cats["difficulties"], json!(["Easy", "Medium", "Hard"]));
        assert_eq!(cats["categories"]["Technology"][2], "AI");
        assert_eq!(cats["modelLoaded"], false);

        let (app2, _) = app(false);
        let (_, traits) = call(app2, Method::GET, "/api/psychology/traits", None).await;
        assert_eq!(traits["types"].as_array().map(|a| a.len()), Some(16));
        assert_eq!(traits["traits"][3], "Judging/Perceiving");
    }

    #[tokio::test]
    async fn model_info_and_reload() {
        let (app, _) = app(true);
        let (_, info) = call(app.clone(), Method::GET, "/api/model/info", None).await;
        assert_eq!(info["modelLoaded"], true);
        assert_eq!(info["loadedModels"].as_array().map(|a| a.len()), Some(3));
        assert_eq!(info["slots"][0]["state"], "ready");

        let (status, reload) = call(app, Method::POST, "/api/model/reload", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reload["success"], true);
    }
}
