mod common;

use anyhow::Result;
use qm_gatekeeper::access::{PermissionLevel, ResourceCategory};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn method_query_and_body_reach_the_application() -> Result<()> {
    let app = common::spawn_app().await?;
    let (identity, credential) = app.user(&[(ResourceCategory::Invoice, PermissionLevel::Edit)]);

    let res = app
        .post("/invoice/9/lines?draft=true", Some(&credential), "qty=4")
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["uri"], "/invoice/9/lines?draft=true");
    assert_eq!(body["body"], "qty=4");
    assert_eq!(body["user_id"], identity.id.to_string());
    Ok(())
}

#[tokio::test]
async fn client_cannot_spoof_the_identity_header() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = reqwest::Client::new()
        .get(format!("{}/auth/confirm", app.base_url))
        .header("x-qm-user-id", "00000000-0000-0000-0000-000000000000")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["user_id"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn application_redirects_are_relayed_not_followed() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, credential) = app.user(&[]);

    let res = app.get("/reports/legacy", Some(&credential)).await?;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(common::location(&res).as_deref(), Some("/reports"));
    assert_eq!(
        res.headers().get("x-app-version").and_then(|v| v.to_str().ok()),
        Some("7")
    );
    assert_eq!(res.text().await?, "moved");
    assert_eq!(app.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn oversized_body_is_rejected_before_forwarding() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, credential) = app.user(&[(ResourceCategory::Po, PermissionLevel::Edit)]);

    let res = app
        .post("/po/1", Some(&credential), "x".repeat(common::BODY_LIMIT + 1))
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(app.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn dot_segments_cannot_reach_a_blocked_category() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, credential) = app.user(&[(ResourceCategory::Qmrl, PermissionLevel::View)]);

    let res = app.raw_get("/admin/users", Some(&credential)).await?;
    assert_eq!(res.status, 307);

    for target in [
        "/qmrl/../admin/users",
        "/qmrl/%2e%2e/admin/users",
        "/qmrl/%2E%2E/admin/users",
        "/qmrl/.%2e/admin/users",
        "//admin/users",
    ] {
        let res = app.raw_get(target, Some(&credential)).await?;
        assert_eq!(res.status, 307, "{}", target);
        assert_eq!(res.header("location"), Some("/dashboard"), "{}", target);
    }

    assert_eq!(app.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn application_receives_the_path_that_was_authorized() -> Result<()> {
    let app = common::spawn_app().await?;
    let (identity, credential) = app.user(&[(ResourceCategory::Po, PermissionLevel::View)]);

    let res = app
        .raw_get("/qmrl/%2e%2e/po/1?tab=lines", Some(&credential))
        .await?;
    assert_eq!(res.status, 200);

    let body = res.json()?;
    assert_eq!(body["uri"], "/po/1?tab=lines");
    assert_eq!(body["user_id"], identity.id.to_string());
    assert_eq!(app.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn encoded_path_characters_are_refused() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, credential) = app.user(&[(ResourceCategory::Qmrl, PermissionLevel::View)]);

    for target in ["/%61dmin/users", "/qmrl%2F..%2Fadmin", "/qmrl/%2e%2e%2fadmin"] {
        let res = app.raw_get(target, Some(&credential)).await?;
        assert_eq!(res.status, 400, "{}", target);
        assert_eq!(res.json()?["code"], "BAD_REQUEST", "{}", target);
    }

    assert_eq!(app.hits(), 0);
    Ok(())
}
