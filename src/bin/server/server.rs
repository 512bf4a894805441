//! HTTP server for OCR processing.

use crate::config::ServerConfig;
use crate::ocr::{
    OcrEngine, OcrError, OcrErrorResponse, OcrSuccessResponse, SharedOcrEngine, file_extension,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Maximum accepted upload size (50 MB).
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const PDF_EXTENSIONS: &[&str] = &["pdf"];
const AUTO_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Upload route, determining the accepted extensions and the reported
/// file type.
#[derive(Clone, Copy)]
enum OcrRoute {
    Image,
    Pdf,
    Auto,
}

impl OcrRoute {
    fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            OcrRoute::Image => IMAGE_EXTENSIONS,
            OcrRoute::Pdf => PDF_EXTENSIONS,
            OcrRoute::Auto => AUTO_EXTENSIONS,
        }
    }

    fn file_type(self, extension: &str) -> String {
        match self {
            OcrRoute::Image => "image".to_string(),
            OcrRoute::Pdf => "pdf".to_string(),
            OcrRoute::Auto => extension.to_string(),
        }
    }

    fn run(self, engine: &OcrEngine, path: &Path) -> Result<String, OcrError> {
        match self {
            OcrRoute::Image => engine.process_image_file(path),
            OcrRoute::Pdf => engine.process_pdf_file(path),
            OcrRoute::Auto => engine.process_file(path),
        }
    }
}

/// API info response for the root endpoint
#[derive(Serialize)]
struct ApiInfoResponse {
    message: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Run the HTTP server
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize OCR engine before binding; a failure here is fatal
    info!("Initializing OCR engine...");
    let engine: SharedOcrEngine = Arc::new(OcrEngine::new(&config.ocr)?);
    info!("OCR engine initialized successfully");

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ocr/image", post(ocr_image_handler))
        .route("/ocr/pdf", post(ocr_pdf_handler))
        .route("/ocr/auto", post(ocr_auto_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(engine);

    // Parse address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {e}"))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /          - API info");
    info!("  GET  /health    - Health check");
    info!("  POST /ocr/image - OCR for images (.png, .jpg, .jpeg)");
    info!("  POST /ocr/pdf   - OCR for PDF documents");
    info!("  POST /ocr/auto  - OCR with extension-based dispatch");

    // Create listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// API info endpoint
async fn root_handler() -> Json<ApiInfoResponse> {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("/ocr/image", "OCR for image files (.png, .jpg, .jpeg)");
    endpoints.insert("/ocr/pdf", "OCR for PDF files");
    endpoints.insert(
        "/ocr/auto",
        "OCR with the file type detected from the extension",
    );

    Json(ApiInfoResponse {
        message: "Vietnamese OCR API",
        endpoints,
    })
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
    })
}

/// OCR endpoint for image uploads
async fn ocr_image_handler(
    State(engine): State<SharedOcrEngine>,
    multipart: Multipart,
) -> Response {
    process_upload(engine, OcrRoute::Image, multipart).await
}

/// OCR endpoint for PDF uploads
async fn ocr_pdf_handler(State(engine): State<SharedOcrEngine>, multipart: Multipart) -> Response {
    process_upload(engine, OcrRoute::Pdf, multipart).await
}

/// OCR endpoint dispatching on the uploaded file's extension
async fn ocr_auto_handler(State(engine): State<SharedOcrEngine>, multipart: Multipart) -> Response {
    process_upload(engine, OcrRoute::Auto, multipart).await
}

/// Upload that passed validation: the original filename, its lowercased
/// extension, and the file bytes.
struct AcceptedUpload {
    filename: String,
    extension: String,
    bytes: Bytes,
}

/// Reads the upload and checks its extension against the route's whitelist.
///
/// Returns the ready-to-send 400 response when the `file` field is missing,
/// the body is malformed, or the extension is not accepted.
async fn accept_upload(
    route: OcrRoute,
    multipart: &mut Multipart,
    request_id: uuid::Uuid,
) -> Result<AcceptedUpload, Response> {
    let (filename, bytes) = match read_file_field(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            return Err(
                (StatusCode::BAD_REQUEST, Json(OcrErrorResponse::new(message))).into_response(),
            );
        }
    };

    info!(
        request_id = %request_id,
        filename = %filename,
        size = bytes.len(),
        "Received upload"
    );

    let extension = file_extension(Path::new(&filename));
    if !route.allowed_extensions().contains(&extension.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(OcrErrorResponse::new(extension_error_message(
                route.allowed_extensions(),
            ))),
        )
            .into_response());
    }

    Ok(AcceptedUpload {
        filename,
        extension,
        bytes,
    })
}

/// Shared upload handling for all OCR routes
async fn process_upload(
    engine: SharedOcrEngine,
    route: OcrRoute,
    mut multipart: Multipart,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let start = Instant::now();

    let upload = match accept_upload(route, &mut multipart, request_id).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let mut temp_file = match tempfile::Builder::new()
        .suffix(&format!(".{}", upload.extension))
        .tempfile()
    {
        Ok(file) => file,
        Err(err) => {
            error!(request_id = %request_id, error = %err, "Failed to create temporary file");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OcrErrorResponse::new(format!(
                    "Failed to store upload: {err}"
                ))),
            )
                .into_response();
        }
    };
    if let Err(err) = temp_file.write_all(&upload.bytes) {
        error!(request_id = %request_id, error = %err, "Failed to write upload to temporary file");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OcrErrorResponse::new(format!(
                "Failed to store upload: {err}"
            ))),
        )
            .into_response();
    }

    // OCR is CPU-bound; run it on the blocking pool. The temp file moves
    // into the task and is deleted when it drops.
    let ocr_start = Instant::now();
    let joined = tokio::task::spawn_blocking(move || route.run(&engine, temp_file.path())).await;

    let result = match joined {
        Ok(result) => result,
        Err(err) => {
            error!(request_id = %request_id, error = %err, "OCR task failed to run");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OcrErrorResponse::new(format!(
                    "OCR task failed to run: {err}"
                ))),
            )
                .into_response();
        }
    };

    match result {
        Ok(text) => {
            let response =
                OcrSuccessResponse::new(upload.filename, route.file_type(&upload.extension), text);
            info!(
                request_id = %request_id,
                text_length = response.text_length,
                ocr_ms = ocr_start.elapsed().as_secs_f64() * 1000.0,
                total_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OCR completed"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!(request_id = %request_id, error = %err, "OCR processing failed");
            (
                status_for(&err),
                Json(OcrErrorResponse::new(format!(
                    "OCR processing failed: {err}"
                ))),
            )
                .into_response()
        }
    }
}

/// Reads the `file` field of a multipart upload
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| format!("Invalid multipart body: {err}"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| format!("Failed to read upload: {err}"))?;
        return Ok((filename, bytes));
    }

    Err("Missing multipart field 'file'".to_string())
}

fn extension_error_message(allowed: &[&str]) -> String {
    let list = allowed
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("File must have one of the following extensions: {list}")
}

fn status_for(error: &OcrError) -> StatusCode {
    match error {
        OcrError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::extract::FromRequest;
    use axum::http::Request;
    use serde_json::Value;

    #[test]
    fn test_allowed_extensions_per_route() {
        for ext in ["png", "jpg", "jpeg"] {
            assert!(OcrRoute::Image.allowed_extensions().contains(&ext));
        }
        assert!(!OcrRoute::Image.allowed_extensions().contains(&"pdf"));

        assert_eq!(OcrRoute::Pdf.allowed_extensions(), ["pdf"]);

        for ext in OcrRoute::Image.allowed_extensions() {
            assert!(OcrRoute::Auto.allowed_extensions().contains(ext));
        }
        assert!(OcrRoute::Auto.allowed_extensions().contains(&"pdf"));
    }

    #[test]
    fn test_file_type_labels() {
        assert_eq!(OcrRoute::Image.file_type("png"), "image");
        assert_eq!(OcrRoute::Pdf.file_type("pdf"), "pdf");
        assert_eq!(OcrRoute::Auto.file_type("jpeg"), "jpeg");
    }

    #[test]
    fn test_extension_error_message_lists_exact_extensions() {
        let message = extension_error_message(OcrRoute::Image.allowed_extensions());
        assert!(message.contains(".png"));
        assert!(message.contains(".jpg"));
        assert!(message.contains(".jpeg"));
        assert!(!message.contains(".pdf"));

        let message = extension_error_message(OcrRoute::Pdf.allowed_extensions());
        assert!(message.contains(".pdf"));
        assert!(!message.contains(".png"));
    }

    #[test]
    fn test_status_for_maps_invalid_input_to_bad_request() {
        assert_eq!(
            status_for(&OcrError::InvalidInput("bad extension".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&OcrError::Processing("inference failed".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_root_lists_all_ocr_routes() {
        let Json(info) = root_handler().await;
        assert_eq!(info.message, "Vietnamese OCR API");
        for route in ["/ocr/image", "/ocr/pdf", "/ocr/auto"] {
            assert!(info.endpoints.contains_key(route));
        }
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(health) = health_handler().await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "viet-ocr");
    }

    const BOUNDARY: &str = "upload-test-boundary";

    fn file_part(filename: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; \
             name=\"file\"; filename=\"{filename}\"\r\n\r\n{content}\r\n"
        )
    }

    fn text_part(name: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
    }

    async fn multipart_with(parts: &[String]) -> Multipart {
        let mut body = parts.concat();
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let request = Request::builder()
            .method("POST")
            .uri("/ocr/auto")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_read_file_field_returns_filename_and_bytes() {
        let mut multipart = multipart_with(&[file_part("scan.png", "fake image bytes")]).await;
        let (filename, bytes) = read_file_field(&mut multipart).await.unwrap();
        assert_eq!(filename, "scan.png");
        assert_eq!(bytes.as_ref(), b"fake image bytes");
    }

    #[tokio::test]
    async fn test_read_file_field_skips_unrelated_fields() {
        let mut multipart = multipart_with(&[
            text_part("language", "vi"),
            file_part("page.pdf", "%PDF-1.4"),
        ])
        .await;
        let (filename, _) = read_file_field(&mut multipart).await.unwrap();
        assert_eq!(filename, "page.pdf");
    }

    #[tokio::test]
    async fn test_read_file_field_requires_file_field() {
        let mut multipart = multipart_with(&[text_part("language", "vi")]).await;
        let err = read_file_field(&mut multipart).await.unwrap_err();
        assert_eq!(err, "Missing multipart field 'file'");
    }

    #[tokio::test]
    async fn test_accept_upload_passes_valid_file_through() {
        let mut multipart = multipart_with(&[file_part("Scan.PNG", "fake image bytes")]).await;
        let upload = match accept_upload(OcrRoute::Image, &mut multipart, uuid::Uuid::new_v4())
            .await
        {
            Ok(upload) => upload,
            Err(_) => panic!("png upload should be accepted"),
        };
        assert_eq!(upload.filename, "Scan.PNG");
        assert_eq!(upload.extension, "png");
        assert_eq!(upload.bytes.as_ref(), b"fake image bytes");
    }

    #[tokio::test]
    async fn test_accept_upload_rejects_unsupported_extension() {
        let mut multipart = multipart_with(&[file_part("animation.gif", "GIF89a")]).await;
        let response = match accept_upload(OcrRoute::Image, &mut multipart, uuid::Uuid::new_v4())
            .await
        {
            Ok(_) => panic!("gif upload should be rejected"),
            Err(response) => response,
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "File must have one of the following extensions: .png, .jpg, .jpeg"
        );
    }

    #[tokio::test]
    async fn test_accept_upload_reports_missing_file_field() {
        let mut multipart = multipart_with(&[text_part("language", "vi")]).await;
        let response = match accept_upload(OcrRoute::Auto, &mut multipart, uuid::Uuid::new_v4())
            .await
        {
            Ok(_) => panic!("upload without a file field should be rejected"),
            Err(response) => response,
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing multipart field 'file'");
    }
}
