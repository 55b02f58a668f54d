//! Admin API tests over a real listener.

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;
use common::{client, start_server, test_config, ADMIN_KEY};

#[tokio::test]
async fn test_admin_disabled_by_default() {
    let server = start_server(test_config()).await;
    assert!(server.admin_addr.is_none());

    // Admin routes are not mounted on the public listener.
    let res = client().get(server.url("/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_create_form_then_submit_and_browse() {
    let mut config = test_config();
    config.admin.enabled = true;
    let server = start_server(config).await;
    let http = client();

    let unauthorized = http.get(server.admin_url("/admin/forms")).send().await.unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let created: Value = http
        .post(server.admin_url("/admin/forms"))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({"name": "Feedback", "allowed_origins": "*"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let public_id = created["public_id"].as_str().unwrap().to_string();
    let form_id = created["id"].as_u64().unwrap();

    for (who, text) in [("203.0.113.5", "great product"), ("203.0.113.6", "slow shipping")] {
        let res = http
            .post(server.url(&format!("/f/{public_id}")))
            .header("x-forwarded-for", who)
            .json(&json!({"feedback": text}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let forms: Value = http
        .get(server.admin_url("/admin/forms"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let feedback = forms
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["public_id"] == public_id.as_str())
        .unwrap();
    assert_eq!(feedback["submission_count"], 2);

    let page: Value = http
        .get(server.admin_url(&format!("/admin/forms/{form_id}/submissions")))
        .bearer_auth(ADMIN_KEY)
        .query(&[("search", "SHIPPING"), ("per_page", "10")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["per_page"], 10);
    assert_eq!(page["submissions"][0]["fields"]["feedback"], "slow shipping");
    assert_eq!(page["submissions"][0]["client_address"], "203.0.113.6");

    let status: Value = http
        .get(server.admin_url("/admin/status"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["forms"], 3);
    assert!(status["tracked_rate_limit_keys"].as_u64().unwrap() >= 2);

    server.stop().await;
}

#[tokio::test]
async fn test_update_delete_and_export() {
    let mut config = test_config();
    config.admin.enabled = true;
    let server = start_server(config).await;
    let http = client();
    let form_id = server.repository.find_form_by_public_id("open").unwrap().unwrap().id;

    for (who, payload) in [
        ("203.0.113.7", json!({"email": "a@example.com", "note": "first"})),
        ("203.0.113.8", json!({"email": "b@example.com", "_gotcha": "bot"})),
        ("203.0.113.9", json!({"topic": "pricing"})),
    ] {
        let res = http
            .post(server.url("/f/open"))
            .header("x-forwarded-for", who)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let export = http
        .get(server.admin_url(&format!("/admin/forms/{form_id}/export.csv")))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    assert!(export.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    let text = export.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,submitted_at,client_address,email,note,topic");
    // Spam rows are left out; newest first.
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with(",203.0.113.9,,,pricing"));
    assert!(lines[2].ends_with(",203.0.113.7,a@example.com,first,"));

    let updated: Value = http
        .put(server.admin_url(&format!("/admin/forms/{form_id}")))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({"is_active": false}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["public_id"], "open");
    assert_eq!(updated["submission_count"], 2);

    let closed = http
        .post(server.url("/f/open"))
        .json(&json!({"email": "late@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(closed.status(), StatusCode::FORBIDDEN);

    let deleted = http
        .delete(server.admin_url(&format!("/admin/forms/{form_id}")))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = http
        .post(server.url("/f/open"))
        .json(&json!({"email": "late@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let listing = http
        .get(server.admin_url(&format!("/admin/forms/{form_id}/submissions")))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(listing.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}
