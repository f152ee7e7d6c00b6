#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use jacport_api::config::ServerConfig;
use jacport_api::router::build_app_router;
use jacport_api::state::AppState;
use jacport_events::JobRegistry;
use jacport_github::{FileFilter, RemoteFile, SourceError, SourceFetcher};
use jacport_llm::{CompletionRequest, Gateway, GatewayConfig, GatewayError, TextGenerator};
use jacport_pipeline::{Pipeline, PipelineConfig};
use tokio_util::task::TaskTracker;

/// Answers every call with well-formed output, optionally after a delay.
#[derive(Default)]
pub struct CannedGenerator {
    pub delay: Option<Duration>,
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(match request.purpose {
            "classify" => "controller".into(),
            "plan" => r#"{"nodes": [{"original_class": "Todo", "jac_node": "TodoNode"}], "order": []}"#.into(),
            "convert" => "```jac\nnode TodoNode {\n    has title: str;\n}\n```".into(),
            "readme" => "# Converted".into(),
            _ => "#!/bin/bash\njac run main.jac".into(),
        })
    }
}

/// Serves the same two files for any repository.
pub struct TwoFileSource;

#[async_trait]
impl SourceFetcher for TwoFileSource {
    async fn fetch_files(
        &self,
        _repo_url: &str,
        _filter: &FileFilter,
        _limit: usize,
    ) -> Result<Vec<RemoteFile>, SourceError> {
        Ok(vec![
            RemoteFile {
                path: "app.py".into(),
                content: "from flask import Flask\n".into(),
            },
            RemoteFile {
                path: "models.py".into(),
                content: "class Todo:\n    pass\n".into(),
            },
        ])
    }
}

/// Build a test `ServerConfig` with safe defaults and short stream waits.
pub fn test_config(output_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        job_ttl_secs: 3600,
        stream_wait_ms: 300,
        keepalive_secs: 60,
        pipeline: PipelineConfig {
            max_files: 50,
            max_retries: 1,
            stage_timeout: None,
            output_dir: output_dir.to_path_buf(),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _output_dir: tempfile::TempDir,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(CannedGenerator::default(), |_| {})
}

/// Build the full application router, with fakes behind the pipeline.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(
    generator: CannedGenerator,
    tweak: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let output_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(output_dir.path());
    tweak(&mut config);

    let registry = Arc::new(JobRegistry::new(config.job_ttl()));
    let gateway = Arc::new(Gateway::new(
        Arc::new(generator),
        GatewayConfig {
            max_parallel: 2,
            call_timeout: None,
            default_model: "test-model".into(),
        },
    ));
    let pipeline = Arc::new(Pipeline::new(
        gateway,
        Arc::new(TwoFileSource),
        Arc::clone(&registry),
        config.pipeline.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        pipeline,
        tasks: TaskTracker::new(),
    };
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        _output_dir: output_dir,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// `(event, data)` pairs of every named SSE frame in `body`.
pub fn sse_events(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut name = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(v) = line.strip_prefix("event: ") {
                    name = Some(v.to_string());
                } else if let Some(v) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(v).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}
