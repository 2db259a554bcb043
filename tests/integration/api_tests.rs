//! API integration tests for image derivation and error handling.
//!
//! The scenarios assume a 2000x1000 source identified as `demo.jpg` served
//! with a 10M pixel budget under the `v3` prefix.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use iiif_server::server::RouterConfig;

use super::test_utils::{
    body_bytes, body_json, build_router, build_router_with, create_test_jpeg, decode_image,
    get_request, is_valid_jpeg, MockImageSource,
};

fn demo_router() -> axum::Router {
    let source = MockImageSource::new().with_image("demo.jpg", create_test_jpeg(2000, 1000));
    build_router(source)
}

// =============================================================================
// Successful Derivations
// =============================================================================

#[tokio::test]
async fn test_full_max_default_jpg() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/full/max/0/default.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpg"
    );

    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body));

    // 2M pixels is within the 10M budget, so max is a no-op.
    let img = decode_image(&body);
    assert_eq!((img.width(), img.height()), (2000, 1000));
}

#[tokio::test]
async fn test_square_confined_rotated_gray_png() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/square/!300,300/90/gray.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );

    // 1000x1000 centred crop, confined to 300x300, quarter turn.
    let body = body_bytes(response).await;
    let img = decode_image(&body);
    assert_eq!((img.width(), img.height()), (300, 300));
    assert!(img.as_luma8().is_some(), "gray output should be luminance-only");
}

#[tokio::test]
async fn test_pct_region_pct_size_bitonal_webp() {
    let router = demo_router();

    let response = router
        .oneshot(get_request(
            "/iiif/v3/demo.jpg/pct:0,0,50,50/pct:50/180/bitonal.webp",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/webp"
    );

    // 1000x500 region, half scale, rotated 180.
    let body = body_bytes(response).await;
    let img = decode_image(&body);
    assert_eq!((img.width(), img.height()), (500, 250));
}

#[tokio::test]
async fn test_mirrored_rotation() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/full/200,/!90/default.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    // 200x100 after width-only resize, then a quarter turn.
    let img = decode_image(&body_bytes(response).await);
    assert_eq!((img.width(), img.height()), (100, 200));
}

#[tokio::test]
async fn test_exact_size_may_distort() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/full/300,300/0/default.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let img = decode_image(&body_bytes(response).await);
    assert_eq!((img.width(), img.height()), (300, 300));
}

#[tokio::test]
async fn test_identifier_with_slashes() {
    let source =
        MockImageSource::new().with_image("folder/demo.jpg", create_test_jpeg(400, 200));
    let router = build_router(source);

    let response = router
        .oneshot(get_request(
            "/iiif/v3/folder/demo.jpg/full/max/0/default.jpg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_region_beyond_image_rejected() {
    let router = demo_router();

    let response = router
        .oneshot(get_request(
            "/iiif/v3/demo.jpg/0,0,3000,1000/full/0/default.jpg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "InvalidRegion");
}

#[tokio::test]
async fn test_unsupported_rotation_rejected() {
    let router = demo_router();

    let response = router
        .oneshot(get_request(
            "/iiif/v3/demo.jpg/full/5000,5000/45/default.jpg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    // The angle is validated before the size stage, so the rotation error
    // wins even though the size also exceeds the budget.
    assert_eq!(error["error"]["code"], "RotationUnsupported");
}

#[tokio::test]
async fn test_size_over_budget_rejected() {
    let router = demo_router();

    let response = router
        .oneshot(get_request(
            "/iiif/v3/demo.jpg/full/5000,5000/0/default.jpg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "SizeTooLarge");
}

#[tokio::test]
async fn test_missing_identifier_is_404() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/missing.jpg/full/max/0/default.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["@context"], "http://iiif.io/api/image/3/context.json");
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"]["code"], "NotFound");
}

#[tokio::test]
async fn test_non_canonical_path_rejected() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg//full/max/0/default.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "InvalidPath");
}

#[tokio::test]
async fn test_unknown_format_rejected() {
    let router = demo_router();

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/full/max/0/default.bmp"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "InvalidRequest");
}

#[tokio::test]
async fn test_garbage_source_bytes_are_internal_error() {
    let source = MockImageSource::new().with_image("broken.jpg", vec![0x00, 0x01, 0x02]);
    let router = build_router(source);

    let response = router
        .oneshot(get_request("/iiif/v3/broken.jpg/full/max/0/default.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "InternalServerError");
}

// =============================================================================
// Auxiliary Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = demo_router();

    let response = router.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert!(body["time"].as_str().is_some());
}

#[tokio::test]
async fn test_status_endpoint() {
    let router = demo_router();

    let response = router.oneshot(get_request("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["iiif_version"], "v3");
    assert_eq!(body["max_pixels"], 10_000_000);
    assert!(body["uptime_seconds"].as_u64().is_some());
    // No source cache in local mode, so no occupancy field.
    assert!(body.get("sentinel_count").is_none());
}

#[tokio::test]
async fn test_landing_page() {
    let router = demo_router();

    let response = router.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("IIIF Image Server"));
    assert!(html.contains("/iiif/v3/"));
}

// =============================================================================
// CORS
// =============================================================================

fn preflight_request(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_preflight_returns_204() {
    let router = demo_router();

    let response = router
        .oneshot(preflight_request(
            "/iiif/v3/demo.jpg/full/max/0/default.jpg",
            "https://viewer.example",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("GET"), "methods were {}", methods);
}

#[tokio::test]
async fn test_cors_headers_on_actual_request() {
    let router = demo_router();

    let request = Request::builder()
        .uri("/iiif/v3/demo.jpg/info.json")
        .header(header::ORIGIN, "https://viewer.example")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_configured_origins_and_credentials() {
    let mut config = RouterConfig::new("v3")
        .with_cors_origins(vec!["https://viewer.example".to_string()])
        .with_tracing(false);
    config.cors_allow_credentials = true;

    let source = MockImageSource::new().with_image("demo.jpg", create_test_jpeg(400, 200));
    let router = build_router_with(source, config, None);

    // The configured origin is echoed back with credentials allowed.
    let response = router
        .clone()
        .oneshot(preflight_request("/iiif/v3/demo.jpg/info.json", "https://viewer.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://viewer.example"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );

    // An unlisted origin gets no allow-origin header.
    let response = router
        .oneshot(preflight_request("/iiif/v3/demo.jpg/info.json", "https://evil.example"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
