use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use course_ingest::config::ServerConfig;
use course_ingest::server::build_router;
use course_ingest::ValidationMode;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "course-ingest-test-boundary";

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    body: &'a [u8],
}

fn csv_part<'a>(filename: &'a str, body: &'a str) -> Part<'a> {
    Part {
        name: "file",
        filename: Some(filename),
        content_type: Some("text/csv"),
        body: body.as_bytes(),
    }
}

fn multipart(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for p in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match p.filename {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{f}\"\r\n",
                p.name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", p.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(ct) = p.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(p.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn app(dir: &TempDir) -> Router {
    build_router(ServerConfig {
        upload_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn valid_upload_returns_cleaned_rows_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "Course Title,Total Registrations,Completion Rate\n\
               101 Intro,\"1,234\",  87  \n\
               Data Science,42,N/A\n\
               \"Rust, Advanced\",\" 9,000 \",12.5\n";
    let (status, body) = send(app(&dir), multipart(&[csv_part("Courses.CSV", csv)])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "Course Title": "101 Intro", "Total Registrations": 1234, "Completion Rate": 87 },
            { "Course Title": "Data Science", "Total Registrations": 42, "Completion Rate": "N/A" },
            { "Course Title": "Rust, Advanced", "Total Registrations": 9000, "Completion Rate": 12 }
        ])
    );
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn missing_required_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("Course Title,Registrations\n");
    for i in 0..50 {
        csv.push_str(&format!("Course {i},{i}\n"));
    }
    let (status, body) = send(app(&dir), multipart(&[csv_part("a.csv", &csv)])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid CSV format: missing required columns" }));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn header_only_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(&dir),
        multipart(&[csv_part("a.csv", "Course Title,Total Registrations\n")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "CSV file is empty" }));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn wrong_extension_is_rejected_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(&dir),
        multipart(&[csv_part("data.txt", "Course Title,Total Registrations\nA,1\n")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Please upload a CSV file" }));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let parts = [
        Part {
            name: "document",
            filename: Some("a.csv"),
            content_type: Some("text/csv"),
            body: b"Course Title,Total Registrations\nA,1\n",
        },
        Part {
            name: "file",
            filename: None,
            content_type: None,
            body: b"not a file",
        },
    ];
    let (status, body) = send(app(&dir), multipart(&parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "No file uploaded" }));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn non_multipart_body_has_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("Course Title,Total Registrations\n"))
        .unwrap();
    let (status, body) = send(app(&dir), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "No file uploaded" }));
}

#[tokio::test]
async fn undecodable_bytes_are_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let part = Part {
        name: "file",
        filename: Some("a.csv"),
        content_type: Some("text/csv"),
        body: b"Course Title,Total Registrations\nA,1\n\xff\xfe\xfd,2\n",
    };
    let (status, body) = send(app(&dir), multipart(&[part])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Error processing CSV file: "), "{message}");
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn declared_charset_is_transcoded() {
    let dir = tempfile::tempdir().unwrap();
    let part = Part {
        name: "file",
        filename: Some("a.csv"),
        content_type: Some("text/csv; charset=windows-1252"),
        body: b"Course Title,Total Registrations\nFran\xe7ais,\"2,000\"\n",
    };
    let (status, body) = send(app(&dir), multipart(&[part])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "Course Title": "Français", "Total Registrations": 2000 }]));
}

#[tokio::test]
async fn strict_mode_rejects_short_later_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "Course Title,Total Registrations\nA,1\nB\n";

    let (status, body) = send(app(&dir), multipart(&[csv_part("a.csv", csv)])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([
        { "Course Title": "A", "Total Registrations": 1 },
        { "Course Title": "B" }
    ]));

    let mut config = ServerConfig {
        upload_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config.ingest.validation = ValidationMode::EveryRow;
    let (status, _) = send(build_router(config), multipart(&[csv_part("a.csv", csv)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn oversized_upload_is_refused_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(ServerConfig {
        upload_dir: dir.path().to_path_buf(),
        max_upload_bytes: Some(256),
        ..Default::default()
    });
    let mut csv = String::from("Course Title,Total Registrations\n");
    for i in 0..200 {
        csv.push_str(&format!("Course {i},{i}\n"));
    }
    let (status, _) = send(router, multipart(&[csv_part("a.csv", &csv)])).await;

    assert!(status.is_client_error(), "{status}");
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let dir = tempfile::tempdir().unwrap();
    let mut req = multipart(&[csv_part("a.csv", "Course Title,Total Registrations\nA,1\n")]);
    req.headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());
    let resp = app(&dir).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&dir), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
