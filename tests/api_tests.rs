#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use common::{HR_NAME, HR_PIN, TestApp, bearer, peer};
use fichaje::models::TokenPair;

macro_rules! login {
    ($service:expr, $name:expr, $pin:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "name": $name, "pin": $pin }))
            .to_request();
        let tokens: TokenPair = test::call_and_read_body_json(&$service, req).await;
        tokens
    }};
}

#[actix_web::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let service = init_app!(app);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "status": "ok" }));
}

#[actix_web::test]
async fn login_errors_are_distinguishable() {
    let app = TestApp::new().await;
    let service = init_app!(app);

    let cases = [
        (HR_NAME, "0000", StatusCode::UNAUTHORIZED, "auth.not_found"),
        (HR_NAME, "12", StatusCode::UNPROCESSABLE_ENTITY, "validation.bad_pin_format"),
        ("", HR_PIN, StatusCode::UNPROCESSABLE_ENTITY, "validation.empty_name"),
    ];
    for (name, pin, status, code) in cases {
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "name": name, "pin": pin }))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), status);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], code);
    }
}

#[actix_web::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new().await;
    let service = init_app!(app);

    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "auth.missing_token");

    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .insert_header(bearer("not-a-jwt"))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn hr_sets_up_and_employee_clocks_at_the_kiosk() {
    let app = TestApp::new().await;
    let service = init_app!(app);
    let hr = login!(service, HR_NAME, HR_PIN);

    let req = test::TestRequest::post()
        .uri("/api/clients")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .set_json(json!({ "name": "Cliente A" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let client: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .set_json(json!({ "name": "Juanjo", "pin": "6119" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let juanjo: Value = test::read_body_json(resp).await;
    assert!(juanjo.get("pin_hash").is_none());

    let req = test::TestRequest::get()
        .uri("/kiosk/roster")
        .peer_addr(peer())
        .to_request();
    let roster: Vec<Value> = test::call_and_read_body_json(&service, req).await;
    assert!(roster.iter().any(|e| e["id"] == juanjo["id"]));

    let clock = |action: &str| {
        test::TestRequest::post()
            .uri("/kiosk/clock")
            .peer_addr(peer())
            .set_json(json!({
                "employee_id": juanjo["id"],
                "pin": "6119",
                "action": action,
                "client_id": client["id"],
            }))
            .to_request()
    };

    let resp = test::call_service(&service, clock("in")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let event: Value = test::read_body_json(resp).await;
    assert_eq!(event["kind"], "in");

    let resp = test::call_service(&service, clock("in")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "state.invalid_transition");

    let req = test::TestRequest::get()
        .uri(&format!("/api/attendance/status/{}", juanjo["id"]))
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .to_request();
    let status: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(status["status"], "clocked_in");
    assert_eq!(status["last_event"]["id"], event["id"]);

    // Wrong PIN at the kiosk never records anything.
    let req = test::TestRequest::post()
        .uri("/kiosk/clock")
        .peer_addr(peer())
        .set_json(json!({
            "employee_id": juanjo["id"],
            "pin": "0000",
            "action": "out",
        }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn personal_session_clocks_and_reports() {
    let app = TestApp::new().await;
    let client = app.client("Cliente A").await;
    let juanjo = app.employee("Juanjo", "6119").await;
    let service = init_app!(app);
    let tokens = login!(service, "Juanjo", "6119");

    let req = test::TestRequest::post()
        .uri("/api/attendance/clock-in")
        .peer_addr(peer())
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "client_id": client.id }))
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);

    app.clock.advance(chrono::Duration::hours(2));
    let req = test::TestRequest::post()
        .uri("/api/attendance/clock-out")
        .peer_addr(peer())
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/reports/summary?from=2026-03-02T07:00:00Z&to=2026-03-02T11:00:00Z&employee_id={}",
            juanjo.id
        ))
        .peer_addr(peer())
        .insert_header(bearer(&tokens.access_token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["total_hours"], 2.0);
    assert_eq!(summary["clients"][0]["name"], "Cliente A");

    // Employees cannot manage clients.
    let req = test::TestRequest::post()
        .uri("/api/clients")
        .peer_addr(peer())
        .insert_header(bearer(&tokens.access_token))
        .set_json(json!({ "name": "Cliente B" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn refresh_tokens_rotate_once() {
    let app = TestApp::new().await;
    let service = init_app!(app);
    let tokens = login!(service, HR_NAME, HR_PIN);

    let refresh = |token: &str| {
        test::TestRequest::post()
            .uri("/auth/refresh")
            .peer_addr(peer())
            .insert_header(bearer(token))
            .to_request()
    };

    let resp = test::call_service(&service, refresh(&tokens.refresh_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: TokenPair = test::read_body_json(resp).await;

    let resp = test::call_service(&service, refresh(&tokens.refresh_token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // An access token is not a refresh token.
    let resp = test::call_service(&service, refresh(&rotated.access_token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .peer_addr(peer())
        .insert_header(bearer(&rotated.refresh_token))
        .to_request();
    assert_eq!(
        test::call_service(&service, req).await.status(),
        StatusCode::NO_CONTENT
    );
    let resp = test::call_service(&service, refresh(&rotated.refresh_token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn pending_count_is_not_taken_for_an_id() {
    let app = TestApp::new().await;
    let service = init_app!(app);
    let hr = login!(service, HR_NAME, HR_PIN);

    let req = test::TestRequest::post()
        .uri("/api/requests")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .set_json(json!({
            "kind": "vacation",
            "start_date": "2026-08-03",
            "end_date": "2026-08-07"
        }))
        .to_request();
    assert_eq!(
        test::call_service(&service, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::get()
        .uri("/api/requests/pending-count")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body, json!({ "pending": 1 }));

    let req = test::TestRequest::get()
        .uri("/api/requests?status=pending&per_page=5")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .to_request();
    let page: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["per_page"], 5);
}

#[actix_web::test]
async fn schedule_in_use_maps_to_conflict() {
    let app = TestApp::new().await;
    let service = init_app!(app);
    let hr = login!(service, HR_NAME, HR_PIN);

    let req = test::TestRequest::post()
        .uri("/api/schedule-types")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .set_json(json!({ "name": "Full time", "weekly_hours": 40.0 }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let schedule: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .set_json(json!({ "name": "Ana", "pin": "1111", "schedule_id": schedule["id"] }))
        .to_request();
    assert_eq!(
        test::call_service(&service, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/api/schedule-types/{}", schedule["id"]))
        .peer_addr(peer())
        .insert_header(bearer(&hr.access_token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "conflict.schedule_in_use");
}
