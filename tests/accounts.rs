mod common;

use common::{ADMIN_EMAIL, VOLUNTEER_PASSWORD, spawn_app};
use serde_json::json;

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn public_signup_then_signin_and_me() {
    let app = spawn_app().await;
    let (status, user) = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "name": "Pat Public", "email": "Pat@Example.com", "password": "Str0ng!pw" }),
        )
        .await;
    assert_eq!(status, 201, "{user}");
    assert_eq!(user["role"], "public");
    assert_eq!(user["email"], "pat@example.com");
    assert!(user.get("password_hash").is_none());

    let token = app.token("pat@example.com", "Str0ng!pw").await;
    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(me["id"], user["id"]);

    let (status, _) = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "name": "Pat Again", "email": "pat@example.com", "password": "Str0ng!pw" }),
        )
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn bad_credentials_and_weak_passwords_are_rejected() {
    let app = spawn_app().await;
    let (status, _) = app.sign_in(ADMIN_EMAIL, "Wrong!pass1").await;
    assert_eq!(status, 401);
    let (status, _) = app.sign_in("nobody@relief.test", "Wrong!pass1").await;
    assert_eq!(status, 401);

    let (status, body) = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "name": "Weak", "email": "weak@example.com", "password": "password" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["fields"], json!(["password"]), "{body}");
}

#[tokio::test]
async fn routes_enforce_token_and_role() {
    let app = spawn_app().await;
    let (status, _) = app.get("/api/auth/me", None).await;
    assert_eq!(status, 401);
    let (status, _) = app.get("/api/auth/me", Some("not-a-token")).await;
    assert_eq!(status, 401);

    let (_, volunteer_token) = app
        .approved_volunteer(&app.admin_token().await, "vol@relief.test")
        .await;
    let (status, _) = app.get("/api/admin/stats", Some(&volunteer_token)).await;
    assert_eq!(status, 403);

    let admin = app.admin_token().await;
    let (status, _) = app.get("/api/volunteer/me", Some(&admin)).await;
    assert_eq!(status, 403);
    let (status, stats) = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(status, 200);
    assert_eq!(stats["approved_volunteers"], 1);
}

#[tokio::test]
async fn volunteer_application_requires_documents_and_approval() {
    let app = spawn_app().await;
    let (status, _) = app
        .post(
            "/api/volunteers/signup",
            None,
            json!({
                "name": "No Docs",
                "email": "nodocs@relief.test",
                "password": VOLUNTEER_PASSWORD,
                "phone": "9845000000",
                "skills": ["cooking"],
                "documents": { "identity_proof": "", "address_proof": "uploads/a.pdf" }
            }),
        )
        .await;
    assert_eq!(status, 400);

    let id = app.apply_as_volunteer("pending@relief.test", &["Cooking"]).await;
    let (status, _) = app.sign_in("pending@relief.test", VOLUNTEER_PASSWORD).await;
    assert_eq!(status, 403);

    let admin = app.admin_token().await;
    let (status, pending) = app.get("/api/admin/volunteers?status=0", Some(&admin)).await;
    assert_eq!(status, 200);
    assert_eq!(pending.as_array().map(Vec::len), Some(1));
    assert_eq!(pending[0]["skills"], json!(["cooking"]));

    let (status, approved) = app
        .post(&format!("/api/admin/volunteers/{id}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 200, "{approved}");
    assert_eq!(approved["application_status"], 1);
    assert_eq!(app.mailer.sent_to("pending@relief.test").len(), 1);

    let (status, _) = app
        .post(&format!("/api/admin/volunteers/{id}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 409);

    let token = app.token("pending@relief.test", VOLUNTEER_PASSWORD).await;
    let (status, profile) = app.get("/api/volunteer/me", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(profile["id"], id.as_str());
}

#[tokio::test]
async fn rejected_application_removes_the_account() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.apply_as_volunteer("reject@relief.test", &["rescue"]).await;
    let (status, _) = app
        .post(&format!("/api/admin/volunteers/{id}/reject"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, 204);
    assert_eq!(app.mailer.sent_to("reject@relief.test").len(), 1);

    let (status, _) = app.sign_in("reject@relief.test", VOLUNTEER_PASSWORD).await;
    assert_eq!(status, 401);
    // the email is free again
    app.apply_as_volunteer("reject@relief.test", &["rescue"]).await;
}
