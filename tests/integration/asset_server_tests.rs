//! Viewer asset server start, serve, and stop behavior.

use agent_duet::viewer::server::AssetServer;
use agent_duet::AppError;

#[tokio::test]
async fn serves_health_and_viewer_page() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("playground.html"), "<html>duet</html>").expect("write page");

    let mut server = AssetServer::start(temp.path(), 0).await.expect("server starts");
    let base = server.base_url();

    let health = reqwest::get(format!("{base}health"))
        .await
        .expect("health request")
        .text()
        .await
        .expect("health body");
    assert_eq!(health, "ok");

    let page = reqwest::get(format!("{base}playground.html?roomUrl=x&token=y"))
        .await
        .expect("page request");
    assert!(page.status().is_success());
    assert_eq!(page.text().await.expect("page body"), "<html>duet</html>");

    server.stop().await;
    assert!(server.is_stopped());
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut server = AssetServer::start(temp.path(), 0).await.expect("server starts");

    let response = reqwest::get(format!("{}missing.html", server.base_url()))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);

    server.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent_and_releases_port() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut server = AssetServer::start(temp.path(), 0).await.expect("server starts");
    let addr = server.local_addr();

    server.stop().await;
    server.stop().await;
    assert!(server.is_stopped());

    let result = reqwest::get(format!("http://{addr}/health")).await;
    assert!(result.is_err(), "server still answering after stop");
}

#[tokio::test]
async fn occupied_port_fails_fast() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind blocker");
    let port = blocker.local_addr().expect("addr").port();

    let err = AssetServer::start(temp.path(), port)
        .await
        .expect_err("port in use");
    assert!(matches!(err, AppError::Server(_)));
}

#[tokio::test]
async fn missing_root_is_config_error() {
    let err = AssetServer::start(std::path::Path::new("/definitely/not/a/dir"), 0)
        .await
        .expect_err("missing root");
    assert!(matches!(err, AppError::Config(_)));
}
