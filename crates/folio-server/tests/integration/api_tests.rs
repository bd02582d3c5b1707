use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::{
    TEST_API_KEY, TestApp, UNREACHABLE_TARGET, setup_test_app, setup_test_app_no_auth,
};

fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request.header("authorization", format!("Bearer {TEST_API_KEY}"))
}

fn create_request(url: &str) -> Request<Body> {
    authed(Request::post("/v1/crawl-jobs"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "url": url }).to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn get_job_json(app: &TestApp, id: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get(format!("/v1/crawl-jobs/{id}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(Request::get("/v1/crawl-jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::get("/v1/crawl-jobs")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn open_api_accepts_requests_without_key() {
    let app = setup_test_app_no_auth().await;

    let response = app
        .router
        .oneshot(Request::get("/v1/crawl-jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_crawl_job_returns_202_and_runs_to_completion() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(create_request(UNREACHABLE_TARGET))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Crawl started");
    assert_eq!(json["status"], "RUNNING");
    assert_eq!(json["url"], UNREACHABLE_TARGET);
    let job_id = json["job_id"].as_str().unwrap().to_string();

    let (status, job) = get_job_json(&app, &job_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["id"], job_id.as_str());
    assert_eq!(job["target_url"], UNREACHABLE_TARGET);

    tokio::time::timeout(Duration::from_secs(30), app.jobs.drain())
        .await
        .expect("crawl did not finish");

    // The seed is refused before any request goes out: zero items, no failure.
    let (_, job) = get_job_json(&app, &job_id).await;
    assert_eq!(job["status"], "COMPLETED");
    assert_eq!(job["items_found"], 0);
    assert!(job["error"].is_null());
    assert!(!job["finished_at"].is_null());
}

#[tokio::test]
async fn create_crawl_job_with_blank_url_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(create_request("   "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "validation_error");

    let listed = app
        .router
        .oneshot(authed(Request::get("/v1/crawl-jobs")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(listed).await["total"], 0);
}

#[tokio::test]
async fn create_crawl_job_without_url_field_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(
            authed(Request::post("/v1/crawl-jobs"))
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_crawl_job_with_unsupported_scheme_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(create_request("ftp://books.example.com/catalog"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_job_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = get_job_json(&app, &uuid::Uuid::new_v4().to_string()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn list_jobs_filters_by_status() {
    let app = setup_test_app().await;

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(create_request(UNREACHABLE_TARGET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
    tokio::time::timeout(Duration::from_secs(30), app.jobs.drain())
        .await
        .expect("crawls did not finish");

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/crawl-jobs?status=completed&limit=1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["jobs"][0]["status"], "COMPLETED");

    let response = app
        .router
        .clone()
        .oneshot(
            authed(Request::get("/v1/crawl-jobs?status=FAILED"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json_body(response).await["total"], 0);
}

#[tokio::test]
async fn list_jobs_with_unknown_status_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(
            authed(Request::get("/v1/crawl-jobs?status=paused"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_error");
}

#[tokio::test]
async fn create_after_shutdown_returns_503() {
    let app = setup_test_app().await;
    app.jobs.shutdown().await;

    let response = app
        .router
        .oneshot(create_request(UNREACHABLE_TARGET))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "shutting_down");
}
