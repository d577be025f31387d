//! Integration tests for the recipe box HTTP API
//!
//! Tests cover:
//! - Recipe collection list/save against a JSON file
//! - Multipart image upload into sanitized folders
//! - Media delete/rename including path containment
//! - Import request validation

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use kitchen_api::{
    bootstrap, build_router,
    config::Config,
    import::{FetchSettings, Importer},
    media::MediaManager,
    models::Recipe,
    store::MemoryStore,
    AppState,
};

struct TestApp {
    dir: TempDir,
    config: Config,
    router: Router,
}

impl TestApp {
    fn media_dir(&self) -> std::path::PathBuf {
        self.config.media_dir()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, body)
    }
}

/// Test helper: app backed by files under a fresh temp root
async fn setup_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config::with_root(dir.path());
    bootstrap(&config).await.unwrap();
    let state = AppState::from_config(&config).unwrap();
    let router = build_router(state, &config);
    TestApp {
        dir,
        config,
        router,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

const BOUNDARY: &str = "kitchen-test-boundary";

fn multipart_request(folder: Option<&str>, image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(folder) = folder {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Recipe collection
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;
    let (status, body) = app.send(empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_list_recipes_starts_empty() {
    let app = setup_app().await;
    let (status, body) = app.send(empty_request("GET", "/api/recipes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_save_then_list_round_trips() {
    let app = setup_app().await;
    let recipes = json!([
        {
            "id": 1,
            "title": "Pasta",
            "description": "Quick",
            "ingredients": ["Tomato", "Pasta"],
            "instructions": "Boil water\n\nAdd pasta",
            "imageUrl": "/recipes/medias/pasta.jpg",
            "servings": 2,
            "prepTime": "PT5M",
            "cookTime": "PT10M",
            "sourceUrl": "https://example.com/pasta"
        },
        {
            "title": "Soup",
            "description": "",
            "ingredients": [],
            "instructions": "",
            "imageUrl": "",
            "servings": 4,
            "prepTime": "",
            "cookTime": "",
            "sourceUrl": ""
        }
    ]);

    let (status, body) = app
        .send(json_request("POST", "/api/recipes", recipes.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "count": 2}));

    let (status, body) = app.send(empty_request("GET", "/api/recipes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, recipes);
    assert!(app.config.recipes_file().exists());
}

#[tokio::test]
async fn test_save_accepts_null_and_loose_fields() {
    let app = setup_app().await;
    let recipes = json!([
        {"title": "Keep me"},
        {"title": "Imported", "servings": null},
        {"title": "Loose", "description": null, "servings": "6"}
    ]);

    let (status, body) = app
        .send(json_request("POST", "/api/recipes", recipes))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = app.send(empty_request("GET", "/api/recipes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[0]["title"], "Keep me");
    assert_eq!(body[1]["servings"], 4);
    assert_eq!(body[2]["description"], "");
    assert_eq!(body[2]["servings"], 6);
}

#[tokio::test]
async fn test_corrupt_collection_lists_empty() {
    let app = setup_app().await;
    std::fs::write(app.config.recipes_file(), "[{ broken").unwrap();

    let (status, body) = app.send(empty_request("GET", "/api/recipes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_memory_store_backs_router() {
    let dir = TempDir::new().unwrap();
    let config = Config::with_root(dir.path());
    let media = MediaManager::new(config.media_dir());
    let importer = Importer::new(&FetchSettings::default(), media.clone()).unwrap();
    let seeded = vec![Recipe {
        title: "Seeded".to_string(),
        ..Recipe::default()
    }];
    let state = AppState::new(Arc::new(MemoryStore::new(seeded)), media, importer);
    let app = TestApp {
        router: build_router(state, &config),
        dir,
        config,
    };

    let (_, body) = app.send(empty_request("GET", "/api/recipes")).await;
    assert_eq!(body[0]["title"], "Seeded");
    assert_eq!(body[0]["servings"], 4);
    assert!(!app.dir.path().join("recipes").exists());
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_into_sanitized_folder() {
    let app = setup_app().await;
    let (status, body) = app
        .send(multipart_request(
            Some("Desserts/Tarte Tatin!"),
            Some(("tatin.png", b"fake png bytes")),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("/recipes/medias/Desserts/Tarte_Tatin_/img-"), "{path}");
    assert!(path.ends_with(".png"));

    let file_name = path.rsplit('/').next().unwrap();
    let on_disk = app
        .media_dir()
        .join("Desserts")
        .join("Tarte_Tatin_")
        .join(file_name);
    assert_eq!(std::fs::read(on_disk).unwrap(), b"fake png bytes");

    // The returned URL is served back by the media route.
    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", path))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake png bytes");
}

#[tokio::test]
async fn test_upload_without_folder_goes_to_media_root() {
    let app = setup_app().await;
    let (status, body) = app
        .send(multipart_request(None, Some(("photo.jpg", b"jpg"))))
        .await;
    assert_eq!(status, StatusCode::OK);

    let path = body["path"].as_str().unwrap();
    let file_name = path.strip_prefix("/recipes/medias/").unwrap();
    assert!(!file_name.contains('/'));
    assert!(app.media_dir().join(file_name).exists());
}

#[tokio::test]
async fn test_upload_empty_file_is_stored() {
    let app = setup_app().await;
    let (status, body) = app
        .send(multipart_request(None, Some(("empty.png", b""))))
        .await;
    assert_eq!(status, StatusCode::OK);

    let path = body["path"].as_str().unwrap();
    let file_name = path.strip_prefix("/recipes/medias/").unwrap();
    assert!(file_name.ends_with(".png"));
    assert_eq!(std::fs::read(app.media_dir().join(file_name)).unwrap(), b"");
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let app = setup_app().await;
    let (status, body) = app.send(multipart_request(Some("x"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

// =============================================================================
// Media management
// =============================================================================

#[tokio::test]
async fn test_delete_file_flow() {
    let app = setup_app().await;
    std::fs::write(app.media_dir().join("old.jpg"), "x").unwrap();

    let (status, _) = app
        .send(json_request("DELETE", "/api/file", json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "DELETE",
            "/api/file",
            json!({"path": "/recipes/medias/old.jpg"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert!(!app.media_dir().join("old.jpg").exists());

    // Already gone: still a success.
    let (status, _) = app
        .send(json_request(
            "DELETE",
            "/api/file",
            json!({"path": "/recipes/medias/old.jpg"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_outside_media_root_is_forbidden() {
    let app = setup_app().await;
    std::fs::write(app.config.recipes_file(), "[]").unwrap();

    let (status, body) = app
        .send(json_request(
            "DELETE",
            "/api/file",
            json!({"path": "/recipes/medias/../recipes.json"}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");
    assert!(app.config.recipes_file().exists());

    let (status, _) = app
        .send(json_request(
            "DELETE",
            "/api/folder",
            json!({"path": "/recipes/medias/../.."}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.media_dir().exists());
}

#[tokio::test]
async fn test_delete_folder_is_recursive_and_idempotent() {
    let app = setup_app().await;
    let nested = app.media_dir().join("Soups").join("Winter");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("a.jpg"), "x").unwrap();

    for _ in 0..2 {
        let (status, body) = app
            .send(json_request(
                "DELETE",
                "/api/folder",
                json!({"path": "/recipes/medias/Soups"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
    assert!(!app.media_dir().join("Soups").exists());
}

#[tokio::test]
async fn test_rename_folder() {
    let app = setup_app().await;
    std::fs::create_dir_all(app.media_dir().join("Old")).unwrap();
    std::fs::write(app.media_dir().join("Old").join("a.jpg"), "x").unwrap();

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/rename-folder",
            json!({"oldPath": "/recipes/medias/Old"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/rename-folder",
            json!({"oldPath": "/recipes/medias/Old", "newPath": "/recipes/medias/Group/New"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert!(app.media_dir().join("Group/New/a.jpg").exists());

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/rename-folder",
            json!({"oldPath": "/recipes/medias/Old", "newPath": "/recipes/medias/Other"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Old folder not found, nothing to rename");
}

#[tokio::test]
async fn test_rename_outside_media_root_is_forbidden() {
    let app = setup_app().await;
    std::fs::create_dir_all(app.media_dir().join("Keep")).unwrap();

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/rename-folder",
            json!({"oldPath": "/recipes/medias/Keep", "newPath": "/recipes/medias/../../escaped"}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.media_dir().join("Keep").exists());
    assert!(!app.dir.path().join("escaped").exists());
}

// =============================================================================
// Import validation
// =============================================================================

#[tokio::test]
async fn test_import_requires_url() {
    let app = setup_app().await;
    let (status, body) = app
        .send(json_request("POST", "/api/import-recipe", json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No URL provided");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/import-recipe",
            json!({"url": "file:///etc/passwd"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
