//! Integration tests for aura-studio API endpoints
//!
//! Campaign, post and media flows through the full router.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{create_test_app, MultipartBody};

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "aura-studio");
    assert_eq!(json["feedback_provider"], "mock");
}

#[tokio::test]
async fn test_create_campaign_normalizes_brief() {
    let app = create_test_app().await;

    let (status, json) = app
        .post_json(
            "/api/campaigns",
            &json!({
                "name": "  Spring Launch  ",
                "brief": {
                    "overview": " New trail line ",
                    "target_audience": "Weekend runners",
                    "brand_voice": ["Bold", " bold ", "", "Playful"],
                    "guardrails": "No medical claims"
                }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "Spring Launch");
    assert_eq!(json["brief"]["overview"], "New trail line");
    assert_eq!(json["brief"]["brand_voice"], json!(["bold", "playful"]));
    assert!(json["id"].is_string());
    assert!(json["created_at"].is_string());
}

#[tokio::test]
async fn test_create_campaign_validation_errors() {
    let app = create_test_app().await;

    let (status, json) = app.post_json("/api/campaigns", &json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

    let too_many: Vec<String> = (0..9).map(|i| format!("tag{}", i)).collect();
    let (status, _) = app
        .post_json(
            "/api/campaigns",
            &json!({ "name": "Tags", "brief": { "brand_voice": too_many } }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post_json(
            "/api/campaigns",
            &json!({ "name": "Tags", "brief": { "brand_voice": ["x".repeat(33)] } }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_campaigns_search_and_include_posts() {
    let app = create_test_app().await;
    let spring = app.create_campaign(json!({ "name": "Spring Launch" })).await;
    app.create_campaign(json!({ "name": "Autumn Sale" })).await;
    app.create_post(&spring, "Teaser", "Something is coming.").await;

    let (status, json) = app.get("/api/campaigns?search=spring&include=posts").await;
    assert_eq!(status, StatusCode::OK);
    let campaigns = json["campaigns"].as_array().unwrap();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0]["name"], "Spring Launch");
    assert_eq!(campaigns[0]["posts"].as_array().unwrap().len(), 1);

    let (_, json) = app.get("/api/campaigns").await;
    let campaigns = json["campaigns"].as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert!(campaigns[0].get("posts").is_none());
}

#[tokio::test]
async fn test_get_update_campaign() {
    let app = create_test_app().await;
    let id = app
        .create_campaign(json!({ "name": "Spring", "brief": { "brand_voice": ["warm"] } }))
        .await;

    let (status, json) = app
        .put_json(&format!("/api/campaigns/{}", id), &json!({ "name": "Spring 2" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Spring 2");
    assert_eq!(json["brief"]["brand_voice"], json!(["warm"]));

    let (status, json) = app.get(&format!("/api/campaigns/{}?include=posts", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Spring 2");
    assert_eq!(json["posts"], json!([]));
}

#[tokio::test]
async fn test_unknown_ids_return_404() {
    let app = create_test_app().await;

    for uri in [
        "/api/campaigns/missing",
        "/api/campaigns/missing/posts",
        "/api/posts/missing",
        "/api/posts/missing/analysis/latest",
        "/api/posts/missing/analysis/some-id",
    ] {
        let (status, json) = app.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    let (status, _) = app.delete("/api/campaigns/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send_form(
            "POST",
            "/api/campaigns/missing/posts",
            MultipartBody::new().text("title", "x"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_post_with_media() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;

    let form = MultipartBody::new()
        .text("title", " Launch day ")
        .text("caption", "Our new shoes are here.")
        .text("scheduled_at", "2025-04-01T09:00:00Z")
        .file("media", "hero.PNG", "image/png", b"fake-png")
        .file("media", "clip.mp4", "video/mp4", b"fake-mp4");
    let (status, json) = app
        .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", json);
    assert_eq!(json["title"], "Launch day");
    assert_eq!(json["platform"], "instagram");
    assert_eq!(json["status"], "draft");
    assert!(json["scheduled_at"].as_str().unwrap().starts_with("2025-04-01T09:00:00"));

    let media = json["media"].as_array().unwrap();
    assert_eq!(media.len(), 2);
    assert_eq!(media[0]["type"], "image");
    assert_eq!(media[1]["type"], "video");
    assert_eq!(media[0]["size_bytes"], 8);

    let url = media[0]["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("/media/{}/", campaign_id)));
    assert!(url.ends_with(".png"));

    // Served back through the static media route
    let response = app.router.clone();
    let served = tower::util::ServiceExt::oneshot(
        response,
        axum::http::Request::builder()
            .uri(url)
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_extra_media_files_are_dropped() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;

    let mut form = MultipartBody::new().text("title", "Gallery");
    for i in 0..7 {
        form = form.file("media", &format!("img{}.jpg", i), "image/jpeg", b"jpg");
    }
    let (status, json) = app
        .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["media"].as_array().unwrap().len(), 5);

    let stored = std::fs::read_dir(app.media_root().join(&campaign_id)).unwrap().count();
    assert_eq!(stored, 5);
}

#[tokio::test]
async fn test_invalid_post_removes_saved_files() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;

    let form = MultipartBody::new()
        .text("title", &"t".repeat(121))
        .file("media", "hero.png", "image/png", b"png");
    let (status, _) = app
        .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let dir = app.media_root().join(&campaign_id);
    let remaining = std::fs::read_dir(&dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_update_post_fields_and_media() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;

    let form = MultipartBody::new()
        .text("title", "Launch")
        .text("caption", "Original caption.")
        .file("media", "old.png", "image/png", b"old");
    let (_, created) = app
        .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
        .await;
    let post_id = created["id"].as_str().unwrap().to_string();
    let old_url = created["media"][0]["url"].as_str().unwrap().to_string();

    // Text-only update keeps media
    let (status, json) = app
        .send_form(
            "PUT",
            &format!("/api/posts/{}", post_id),
            MultipartBody::new().text("caption", "Edited caption."),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["caption"], "Edited caption.");
    assert_eq!(json["title"], "Launch");
    assert_eq!(json["media"][0]["url"], old_url.as_str());

    // Uploading files replaces the media set and removes old files
    let (status, json) = app
        .send_form(
            "PUT",
            &format!("/api/posts/{}", post_id),
            MultipartBody::new().file("media", "new.png", "image/png", b"new"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let media = json["media"].as_array().unwrap();
    assert_eq!(media.len(), 1);
    assert_ne!(media[0]["url"], old_url.as_str());

    let old_path = app.media_root().join(old_url.trim_start_matches("/media/"));
    assert!(!old_path.exists());
}

#[tokio::test]
async fn test_delete_campaign_cascades() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;

    let form = MultipartBody::new()
        .text("caption", "A caption long enough to analyze.")
        .file("media", "hero.png", "image/png", b"png");
    let (_, post) = app
        .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
        .await;
    let post_id = post["id"].as_str().unwrap().to_string();
    let file_url = post["media"][0]["url"].as_str().unwrap().to_string();

    let (status, json) = app
        .post_json(&format!("/api/posts/{}/analysis", post_id), &json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.wait_for_analysis(&post_id, json["analysis_id"].as_str().unwrap())
        .await;

    let (status, json) = app.delete(&format!("/api/campaigns/{}", campaign_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "deleted": true }));

    let (status, _) = app.get(&format!("/api/posts/{}", post_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for table in ["posts", "post_media", "post_analyses", "analysis_spans", "analysis_suggestions"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} not empty", table);
    }

    let file_path = app.media_root().join(file_url.trim_start_matches("/media/"));
    assert!(!file_path.exists());
}

#[tokio::test]
async fn test_delete_post() {
    let app = create_test_app().await;
    let campaign_id = app.create_campaign(json!({ "name": "Spring" })).await;
    let post = app.create_post(&campaign_id, "Launch", "Caption.").await;
    let post_id = post["id"].as_str().unwrap();

    let (status, json) = app.delete(&format!("/api/posts/{}", post_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);

    let (status, _) = app.delete(&format!("/api/posts/{}", post_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = app.get(&format!("/api/campaigns/{}/posts", campaign_id)).await;
    assert_eq!(json["posts"], json!([]));
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let app = create_test_app().await;

    // Valid JSON of the wrong shape
    let (status, json) = app.post_json("/api/campaigns", &json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert!(json["error"]["message"].as_str().unwrap().contains("name"));

    let (status, json) = app
        .post_json("/api/campaigns", &json!({ "name": "Spring", "brief": { "brand_voice": null } }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

    let (status, json) = app
        .post_json("/api/analysis/draft", &json!({ "caption": 5 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

    // Broken syntax
    let (status, json) = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/campaigns")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{\"name\": "))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    // Missing content type
    let (status, json) = app
        .send(
            axum::http::Request::builder()
                .method("PUT")
                .uri("/api/campaigns/anything")
                .body(axum::body::Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
