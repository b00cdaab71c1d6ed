// Route-level tests for the HTTP control surface, driven through the
// router as a tower service (no socket needed).

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{FakeChannel, FakeFinalizer};
use std::sync::Arc;
use stepvoice::jobs::{Instruction, Job, JobStore, MemoryJobStore, Step};
use stepvoice::{create_router, AppState, SessionConfig};
use tower::ServiceExt;

fn test_state() -> (AppState, Arc<MemoryJobStore>) {
    let jobs = Arc::new(MemoryJobStore::new());
    let state = AppState::new(
        FakeChannel::new(),
        FakeFinalizer::new(),
        jobs.clone(),
        SessionConfig::default(),
    );
    (state, jobs)
}

fn sample_job(job_id: &str) -> Job {
    Job {
        job_id: job_id.to_string(),
        transcription: "Open the valve slowly".to_string(),
        instructions: vec![Instruction {
            instruction_text: "Open the valve slowly".to_string(),
            steps: vec![Step {
                text: "Open the valve slowly".to_string(),
                audio_artifact_ref: format!("mem://{job_id}/instruction_0.wav"),
            }],
        }],
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let (state, _jobs) = test_state();
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn job_routes_cover_the_store_contract() -> Result<()> {
    let (state, jobs) = test_state();
    let app = create_router(state);

    jobs.insert(sample_job("job-http")).await?;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/jobs").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/jobs/job-http").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/jobs/job-missing")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/jobs/job-http")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/jobs/job-http")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn unknown_session_routes_return_not_found() -> Result<()> {
    let (state, _jobs) = test_state();
    let app = create_router(state);

    for uri in [
        "/sessions/session-ghost/status",
        "/sessions/session-ghost/transcript",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions/session-ghost/stop")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn microphone_start_fails_cleanly_without_a_backend() -> Result<()> {
    let (state, _jobs) = test_state();
    let app = create_router(state);

    // No platform audio backend is linked into test builds.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions/start")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"session_id":"session-mic"}"#))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    Ok(())
}
