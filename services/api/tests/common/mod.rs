//! Shared helpers for the API integration tests: an in-memory app with
//! scripted models, plus request helpers built on `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use api_lib::{
    adapters::InMemoryTableStore,
    config::Config,
    web::{router, AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use saga_core::{
    ports::{PortError, PortResult, TextGenerationService},
    prompt::AssembledPrompt,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const USER: &str = "user-1";

/// A model that replays scripted replies and records every prompt it receives.
/// Once the script runs out it answers with a numbered placeholder text.
#[derive(Default)]
pub struct FakeModel {
    script: Mutex<VecDeque<PortResult<String>>>,
    prompts: Mutex<Vec<AssembledPrompt>>,
}

impl FakeModel {
    pub fn reply(&self, text: &str) {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, error: PortError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<AssembledPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> AssembledPrompt {
        self.prompts().pop().expect("the model was never called")
    }
}

#[async_trait]
impl TextGenerationService for FakeModel {
    async fn generate(&self, prompt: &AssembledPrompt) -> PortResult<String> {
        let call_nr = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.clone());
            prompts.len()
        };
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Generated text {}", call_nr)))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub story_model: Arc<FakeModel>,
    pub summary_model: Arc<FakeModel>,
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        log_level: tracing::Level::DEBUG,
        openai_api_key: None,
        model_api_base: None,
        story_model: "story-test".to_string(),
        summary_model: "summary-test".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
    }
}

pub fn build_test_app() -> TestApp {
    let story_model = Arc::new(FakeModel::default());
    let summary_model = Arc::new(FakeModel::default());
    let state = Arc::new(AppState::new(
        Arc::new(InMemoryTableStore::new()),
        Arc::new(test_config()),
        story_model.clone(),
        summary_model.clone(),
    ));

    TestApp {
        router: router(state.clone()),
        state,
        story_model,
        summary_model,
    }
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(USER), None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(USER), Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PATCH", uri, Some(USER), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, Some(USER), None).await
}

/// Creates a book and returns its id.
pub async fn create_book(app: &Router, title: &str) -> String {
    let (status, body) = post_json(
        app,
        "/books",
        serde_json::json!({
            "title": title,
            "globalGenre": "fantasy",
            "globalMood": "dark",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["bookId"].as_str().unwrap().to_string()
}
