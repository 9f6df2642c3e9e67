use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use simpeg_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::{Claims, SESSION_COOKIE},
    config::Env,
    models::{RestoreSummary, STAFF_COLUMNS},
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

fn test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config: AppConfig::default(),
    }
}

fn production_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config: AppConfig {
            env: Env::Production,
            ..AppConfig::default()
        },
    }
}

/// A session token signed with the default configuration's secret.
fn session_token(sub: &str, roles: &[&str]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: sub.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        iat: now,
        exp: now + 3600,
    };
    let key = EncodingKey::from_secret(AppConfig::default().session_secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn staff_csv(rows: &[(&str, &str)]) -> String {
    let mut csv = format!("{}\n", STAFF_COLUMNS.join(","));
    for (nama, nip) in rows {
        csv.push_str(&format!(
            "{nama},{nip}{}\n",
            ",".repeat(STAFF_COLUMNS.len() - 2)
        ));
    }
    csv
}

/// Sends one request through a fresh router and decodes the JSON body.
async fn send_json(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn spawn_app() -> TestApp {
    spawn_app_with(test_state()).await
}

async fn spawn_app_with(state: AppState) -> TestApp {
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are part of the contract under test, so never follow them.
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_anonymous_backup_redirects_to_login() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/backup", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "login.php");
}

#[tokio::test]
async fn test_non_admin_backup_redirects_to_access_denied() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/backup.php", app.address))
        .header("x-user-id", "budi")
        .header("x-user-roles", "Supervisor")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/unauthorized");

    let denied = app
        .client
        .get(format!("{}/unauthorized", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::OK);
    assert!(denied.text().await.unwrap().contains("Akses Ditolak"));
}

#[tokio::test]
async fn test_admin_backup_lifecycle() {
    let app = spawn_app().await;

    let restore = app
        .client
        .post(format!("{}/api/restore", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .json(&json!({
            "columns": &STAFF_COLUMNS[..],
            "records": [{ "NAMA": "Siti", "NIP": "1987" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(restore.status(), StatusCode::OK);
    let summary: RestoreSummary = restore.json().await.unwrap();
    assert_eq!(summary.restored, 1);

    let page = app
        .client
        .get(format!("{}/backup", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("Jumlah data pegawai: 1"));

    let wipe = app
        .client
        .post(format!("{}/api/wipe", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(wipe.status(), StatusCode::OK);

    let backup = app
        .client
        .get(format!("{}/api/backup", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(backup.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_without_session_is_401_json() {
    let response = create_router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/backup")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_me_reports_roles() {
    let response = create_router(test_state())
        .oneshot(
            Request::builder()
                .uri("/me")
                .header("x-user-id", "siti")
                .header("x-user-roles", "Admin,Supervisor")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "id": "siti", "roles": ["admin", "supervisor"] }));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = create_router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// --- Role Guard over HTTP ---

#[tokio::test]
async fn test_backup_page_honours_json_accept_for_anonymous() {
    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .uri("/backup")
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_backup_page_honours_json_accept_for_non_admin() {
    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .uri("/backup.php")
            .header(header::ACCEPT, "application/json")
            .header("x-user-id", "budi")
            .header("x-user-roles", "Supervisor")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "requires one of the roles: admin");
}

#[tokio::test]
async fn test_restore_api_rejects_non_admin_and_anonymous() {
    let document = json!({ "columns": &STAFF_COLUMNS[..], "records": [] }).to_string();

    let (status, _) = send_json(
        test_state(),
        Request::builder()
            .method("POST")
            .uri("/api/restore")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "budi")
            .header("x-user-roles", "supervisor,user")
            .body(Body::from(document.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .method("POST")
            .uri("/api/restore")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(document))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_non_admin_is_refused_before_the_body_is_read() {
    // Malformed JSON without a content type: only the role check can answer.
    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .method("POST")
            .uri("/api/wipe")
            .header("x-user-id", "budi")
            .header("x-user-roles", "Supervisor")
            .body(Body::from("{ not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "requires one of the roles: admin");
}

#[tokio::test]
async fn test_admin_bad_body_gets_json_error() {
    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .method("POST")
            .uri("/api/wipe")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "admin")
            .header("x-user-roles", "admin")
            .body(Body::from("{ not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .method("POST")
            .uri("/api/restore")
            .header("x-user-id", "admin")
            .header("x-user-roles", "admin")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_backup_page_with_session_cookie() {
    let app = spawn_app_with(production_state()).await;

    let admin = app
        .client
        .get(format!("{}/backup", app.address))
        .header(
            header::COOKIE,
            format!("{SESSION_COOKIE}={}", session_token("siti", &["Admin"])),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    assert!(
        admin
            .text()
            .await
            .unwrap()
            .contains("Login sebagai: siti (admin)")
    );

    let supervisor = app
        .client
        .get(format!("{}/backup", app.address))
        .header(
            header::COOKIE,
            format!("{SESSION_COOKIE}={}", session_token("budi", &["Supervisor"])),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(supervisor.status(), StatusCode::SEE_OTHER);
    assert_eq!(supervisor.headers()[header::LOCATION], "/unauthorized");
}

// --- Page forms ---

#[tokio::test]
async fn test_restore_and_wipe_forms() {
    let app = spawn_app().await;

    let upload = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(staff_csv(&[("Siti", "1987"), ("Budi", "1990")]).into_bytes())
            .file_name("data_pegawai.csv"),
    );
    let restored = app
        .client
        .post(format!("{}/backup/restore", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .multipart(upload)
        .send()
        .await
        .unwrap();
    assert_eq!(restored.status(), StatusCode::OK);
    let html = restored.text().await.unwrap();
    assert!(html.contains("Data pegawai berhasil diimpor!"));
    assert!(html.contains("Jumlah data pegawai: 2"));

    let unconfirmed = app
        .client
        .post(format!("{}/backup/wipe", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .form(&[("other", "x")])
        .send()
        .await
        .unwrap();
    assert_eq!(unconfirmed.status(), StatusCode::BAD_REQUEST);
    assert!(unconfirmed.text().await.unwrap().contains("Jumlah data pegawai: 2"));

    let wiped = app
        .client
        .post(format!("{}/backup/wipe", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .form(&[("confirm", "on")])
        .send()
        .await
        .unwrap();
    assert_eq!(wiped.status(), StatusCode::OK);
    assert!(
        wiped
            .text()
            .await
            .unwrap()
            .contains("Semua data pegawai berhasil dihapus!")
    );
}

#[tokio::test]
async fn test_restore_form_reports_missing_columns() {
    let app = spawn_app().await;

    let upload = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"NAMA,NIP\nSiti,1987\n".to_vec()).file_name("data.csv"),
    );
    let response = app
        .client
        .post(format!("{}/backup/restore", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .multipart(upload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text().await.unwrap();
    assert!(html.contains("missing columns: GELAR DEPAN"));
    assert!(html.contains("Tidak ada data pegawai untuk dibackup."));
}

#[tokio::test]
async fn test_non_admin_restore_form_is_redirected() {
    let app = spawn_app().await;

    let upload = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(staff_csv(&[("Siti", "1987")]).into_bytes())
            .file_name("data.csv"),
    );
    let response = app
        .client
        .post(format!("{}/backup/restore", app.address))
        .header("x-user-id", "budi")
        .header("x-user-roles", "supervisor")
        .multipart(upload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/unauthorized");
}

// --- CSV ---

#[tokio::test]
async fn test_csv_restore_then_export() {
    let app = spawn_app().await;

    let restore = app
        .client
        .post(format!("{}/api/restore.csv", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(staff_csv(&[("Siti", "1987")]))
        .send()
        .await
        .unwrap();
    assert_eq!(restore.status(), StatusCode::OK);
    let summary: RestoreSummary = restore.json().await.unwrap();
    assert_eq!(summary.restored, 1);

    let export = app
        .client
        .get(format!("{}/api/backup.csv", app.address))
        .header("x-user-id", "admin")
        .header("x-user-roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(
        export.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(export.text().await.unwrap(), staff_csv(&[("Siti", "1987")]));
}

#[tokio::test]
async fn test_csv_export_is_404_when_empty() {
    let (status, body) = send_json(
        test_state(),
        Request::builder()
            .uri("/api/backup.csv")
            .header("x-user-id", "admin")
            .header("x-user-roles", "admin")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no staff data to back up");
}
