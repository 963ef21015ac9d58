mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestContext;
use quiz_service::models::Role;

#[actix_web::test]
async fn sign_up_reports_every_invalid_field() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/sign-up")
        .set_json(json!({
            "username": "ab",
            "password": "short",
            "nickname": "quizfan",
            "email": "not-an-email",
            "majorName": "Computer Science",
            "agreeEmail": true
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    let fields = body.as_object().expect("field map");
    assert!(fields.contains_key("username"));
    assert!(fields.contains_key("password"));
    assert!(fields.contains_key("email"));
    assert!(!fields.contains_key("major_name"));
}

#[actix_web::test]
async fn sign_in_rejects_blank_credentials() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/sign-in")
        .set_json(json!({"username": " ", "password": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/sign-in")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"username\":")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn post_body_is_validated_before_any_lookup() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(ctx.bearer(Uuid::new_v4(), Role::User))
        .set_json(json!({"categoryId": 0, "title": "", "content": "body"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("category_id").is_some());
    assert!(body.get("title").is_some());
}

#[actix_web::test]
async fn blank_comment_is_rejected() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{}/comments", Uuid::new_v4()))
        .insert_header(ctx.bearer(Uuid::new_v4(), Role::User))
        .set_json(json!({"content": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn blank_report_reason_is_rejected() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/quizzes/{}/reports", Uuid::new_v4()))
        .insert_header(ctx.bearer(Uuid::new_v4(), Role::User))
        .set_json(json!({"reason": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("reason").is_some());
}

#[actix_web::test]
async fn oauth_sign_up_with_unknown_ticket_is_unauthorized() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/oauth/sign-up")
        .set_json(json!({
            "signUpToken": "never-issued",
            "oauthId": "victim-kakao-id",
            "loginType": "KAKAO",
            "email": "kim@kakao.com",
            "nickname": "kim",
            "majorName": "CS",
            "agreeEmail": false
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn non_uuid_path_is_not_found() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::delete()
        .uri("/api/v1/quizzes/not-a-uuid")
        .insert_header(ctx.bearer(Uuid::new_v4(), Role::User))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
