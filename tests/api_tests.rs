use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

use outfit_api::{
    db::MemorySessionStore,
    middleware::session::SESSION_ID_HEADER,
    routes::{create_router, AppState},
    services::{
        catalog::CatalogLoader,
        selector::OutfitSelector,
        tryon::{DirectoryGarmentResolver, TryOnCache},
        Stylist,
    },
};

const SESSION: &str = "6f1c1d2e-8a7b-4c3d-9e0f-112233445566";

const OUTFITS: &str = r#"[
    {"id": "o1", "image": "o1.jpg", "keywords": ["graphic", "streetwear"]},
    {"id": "o2", "image": "o2.jpg", "keywords": ["cargo", "utility"]},
    {"id": "o3", "image": "o3.jpg", "keywords": ["linen"]}
]"#;

const PRODUCTS: &str = r#"[
    {"id": "T1", "name": "Graphic Tee", "price": 25, "currency": "USD", "keywords": ["graphic"]},
    {"id": "T2", "name": "Linen Shirt", "price": 45, "currency": "USD", "keywords": ["linen"]},
    {"id": "B1", "name": "Cargo Pants", "price": 55, "currency": "USD", "keywords": ["cargo", "utility"]},
    {"id": "B2", "name": "Pleated Trousers", "price": 70, "currency": "USD", "keywords": ["tailored"]},
    {"id": "X1", "name": "Canvas Tote", "price": 18, "currency": "USD", "keywords": ["utility"]}
]"#;

fn write_catalog(dir: &Path) -> (PathBuf, PathBuf) {
    let outfits = dir.join("outfits.json");
    let products = dir.join("products.json");
    std::fs::write(&outfits, OUTFITS).unwrap();
    std::fs::write(&products, PRODUCTS).unwrap();
    (outfits, products)
}

/// Router with no external providers: selection always falls back
fn create_test_app(dir: &Path) -> Router {
    let (outfits, products) = write_catalog(dir);
    let stylist = Stylist::new(
        Arc::new(CatalogLoader::new(outfits, products)),
        OutfitSelector::new(None, "test-model".to_string(), 0.7),
        TryOnCache::new(None, dir.join("media")),
        Arc::new(DirectoryGarmentResolver::new(dir.join("garments"))),
        None,
    );

    create_router(Arc::new(AppState {
        store: Arc::new(MemorySessionStore::new()),
        stylist,
    }))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(SESSION_ID_HEADER, SESSION);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_session_header_is_issued() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let issued = response.headers().get(SESSION_ID_HEADER).unwrap();
    assert!(uuid::Uuid::parse_str(issued.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_malformed_session_header_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = app
        .oneshot(
            Request::get("/health")
                .header(SESSION_ID_HEADER, "not-a-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let issued = response.headers().get(SESSION_ID_HEADER).unwrap();
    assert_ne!(issued, "not-a-session");
    assert!(uuid::Uuid::parse_str(issued.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_deck_lists_all_cards() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let (status, body) = send(&app, "GET", "/api/v1/deck", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["o1", "o2", "o3"]);
}

#[tokio::test]
async fn test_swipes_build_profile_and_reset_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    for outfit_id in ["o1", "o1", "o2"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/swipes",
            Some(json!({"outfit_id": outfit_id, "action": "like"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, profile) = send(
        &app,
        "POST",
        "/api/v1/swipes",
        Some(json!({"outfit_id": "o3", "action": "dislike"})),
    )
    .await;

    assert_eq!(profile["graphic"], 2);
    assert_eq!(profile["cargo"], 1);
    assert!(profile.get("linen").is_none());

    let (status, profile) = send(&app, "DELETE", "/api/v1/preferences", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile, json!({}));

    let (_, profile) = send(&app, "GET", "/api/v1/preferences", None).await;
    assert_eq!(profile, json!({}));
}

#[tokio::test]
async fn test_swipe_unknown_outfit_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/swipes",
        Some(json!({"outfit_id": "nope", "action": "like"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_store_ranks_matching_products() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    send(
        &app,
        "POST",
        "/api/v1/swipes",
        Some(json!({"outfit_id": "o2", "action": "like"})),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/v1/store", None).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Vec<(String, u64)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["item"]["id"].as_str().unwrap().to_string(),
                s["score"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        listing,
        vec![("B1".to_string(), 2), ("X1".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_outfit_generation_falls_back_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    send(
        &app,
        "POST",
        "/api/v1/swipes",
        Some(json!({"outfit_id": "o1", "action": "like"})),
    )
    .await;

    let (status, first) = send(&app, "POST", "/api/v1/outfits", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["top_id"], "T1");
    assert_eq!(first["bottom_id"], "B1");
    assert!(first["error"].as_str().unwrap().starts_with("call failed"));
    assert_eq!(first["top"]["name"], "Graphic Tee");
    assert!(first["tryon_image"].is_null());

    // The previous pair is never served twice in a row
    let (_, second) = send(&app, "POST", "/api/v1/outfits", None).await;
    assert_eq!(second["top_id"], "T2");
    assert_eq!(second["bottom_id"], "B2");
    assert!(second["style_notes"]
        .as_str()
        .unwrap()
        .contains("avoid repeating"));
}
