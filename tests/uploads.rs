mod support;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn uploads_need_a_session() {
    let app = support::spawn().await;

    let reply = app.upload("images", "image/png", b"png bytes", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"], json!("ログインが必要です"));
}

#[tokio::test]
async fn only_images_into_known_buckets() {
    let app = support::spawn().await;
    let member = app.sign_up("digger@example.com", "掘る人").await;

    let html = app.upload("images", "text/html", b"<script></script>", Some(&member)).await;
    assert_eq!(html.status, StatusCode::BAD_REQUEST);
    assert_eq!(html.json(), json!({ "error": "画像ファイルを選択してください" }));

    let private = app.upload("private", "image/png", b"png bytes", Some(&member)).await;
    assert_eq!(private.status, StatusCode::NOT_FOUND);
    assert_eq!(private.json(), json!({ "error": "保存先が見つかりません" }));
}

#[tokio::test]
async fn uploaded_images_are_served_back() {
    let app = support::spawn().await;
    let member = app.sign_up("digger@example.com", "掘る人").await;

    let reply = app.upload("avatars", "image/png", b"png bytes", Some(&member)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["success"], json!(true));

    let url = body["url"].as_str().expect("url").to_owned();
    assert!(url.starts_with("/uploads/avatars/") && url.ends_with(".png"), "{url}");

    let served = app.get(&url, None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.text, "png bytes");
}
