//! Integration tests for the info.json descriptor.

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{body_json, build_router, create_test_jpeg, get_request, MockImageSource};

#[tokio::test]
async fn test_info_json_success() {
    let source = MockImageSource::new().with_image("demo.jpg", create_test_jpeg(2000, 1000));
    let router = build_router(source);

    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/info.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let info = body_json(response).await;

    assert_eq!(info["@context"], "http://iiif.io/api/image/3/context.json");
    assert_eq!(info["id"], "http://localhost:3000/iiif/v3/demo.jpg");
    assert_eq!(info["type"], "sc:Manifest");
    assert_eq!(info["protocol"], "http://iiif.io/api/image");
    assert_eq!(info["width"], 2000);
    assert_eq!(info["height"], 1000);

    // Full, half and quarter sizes.
    let sizes = info["sizes"].as_array().unwrap();
    assert_eq!(sizes.len(), 3);
    assert_eq!(sizes[0]["width"], 2000);
    assert_eq!(sizes[0]["height"], 1000);
    assert_eq!(sizes[1]["width"], 1000);
    assert_eq!(sizes[1]["height"], 500);
    assert_eq!(sizes[2]["width"], 500);
    assert_eq!(sizes[2]["height"], 250);

    assert_eq!(info["profile"].as_array().unwrap().len(), 2);
    assert_eq!(info["tiles"][0]["width"], 512);
    assert_eq!(
        info["tiles"][0]["scaleFactors"],
        serde_json::json!([1, 2, 4, 8])
    );
    assert_eq!(
        info["extraQualities"],
        serde_json::json!(["default", "color", "gray", "bitonal"])
    );
    assert_eq!(
        info["extraFormats"],
        serde_json::json!(["jpg", "png", "webp", "gif"])
    );
}

#[tokio::test]
async fn test_info_json_nested_identifier() {
    let source =
        MockImageSource::new().with_image("folder/demo.jpg", create_test_jpeg(400, 200));
    let router = build_router(source);

    let response = router
        .oneshot(get_request("/iiif/v3/folder/demo.jpg/info.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let info = body_json(response).await;
    assert_eq!(info["id"], "http://localhost:3000/iiif/v3/folder/demo.jpg");
    assert_eq!(info["width"], 400);
    assert_eq!(info["height"], 200);
}

#[tokio::test]
async fn test_info_json_missing_identifier_is_404() {
    let router = build_router(MockImageSource::new());

    let response = router
        .oneshot(get_request("/iiif/v3/missing.jpg/info.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "NotFound");
}

#[tokio::test]
async fn test_info_json_without_identifier_rejected() {
    let router = build_router(MockImageSource::new());

    let response = router
        .oneshot(get_request("/iiif/v3/info.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error"]["code"], "InvalidRequest");
}
