use crate::prelude::{eprintln, *};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dentdoc_core::document::DocumentRequest;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::browser::ChromePrinter;
use crate::config::Settings;
use crate::orchestrator::{GeneratedPdf, Orchestrator};

pub mod cli;

/// Request bodies carry whole HTML documents and inline logos.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub async fn run(options: cli::ServeOptions, global: crate::Global) -> Result<()> {
    let settings = Arc::new(Settings::from_options(&options));
    let printer = ChromePrinter::shared(settings.chrome_path.clone(), settings.render_timeout);
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&settings), printer));

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Listening on http://{}", addr);
    if global.verbose {
        eprintln!("dentdoc listening on http://{}", addr);
        eprintln!("Templates: certificate, prescription, anamnesis");
        eprintln!("POST /generate-pdf accepts {{ template, data }} or {{ html }}");
    }

    axum::serve(listener, router(orchestrator))
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = cors(&orchestrator.settings().allowed_origins);

    Router::new()
        .route("/generate-pdf", post(generate_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(orchestrator)
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin `{}`", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn generate_handler(State(orchestrator): State<Arc<Orchestrator>>, body: Bytes) -> Response {
    log::info!("POST /generate-pdf ({} bytes)", body.len());
    let production = orchestrator.settings().production;

    let request = match DocumentRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => {
            log::info!("Rejected request: {}", e);
            return ApiError::from(e).to_response(production);
        }
    };

    match orchestrator.generate(request).await {
        Ok(pdf) => pdf_response(pdf),
        Err(e) => {
            log::error!("Failed to generate PDF: {}", e.stack());
            e.to_response(production)
        }
    }
}

fn pdf_response(pdf: GeneratedPdf) -> Response {
    let length = pdf.bytes.len().to_string();
    let disposition = content_disposition(&pdf.filename);
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, length),
        ],
        pdf.bytes,
    )
        .into_response()
}

/// An ASCII `filename` for old clients plus the UTF-8 `filename*` form.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "message": "Servidor rodando" }))
}

async fn not_found_handler(uri: Uri) -> Response {
    log::debug!("No route for {}", uri);
    ApiError::RouteNotFound.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{page_sizes, write_background, StubPrinter, A4};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn app(dir: &std::path::Path, printer: StubPrinter) -> Router {
        let settings = Arc::new(Settings::for_dir(dir));
        router(Arc::new(Orchestrator::new(settings, Arc::new(printer))))
    }

    fn post_json(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate-pdf")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), StubPrinter::pages(1))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), StubPrinter::pages(1))
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("/generate-pdf"));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let printer = StubPrinter::pages(1);
        let response = app(dir.path(), printer.clone())
            .oneshot(post_json(json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("html"));
        assert!(message.contains("template"));
        assert_eq!(printer.calls(), 0);
    }

    #[tokio::test]
    async fn prescription_overlay_html_with_letterhead() {
        let dir = tempfile::tempdir().unwrap();
        write_background(dir.path(), "letterhead.pdf", &[A4]);
        let response = app(dir.path(), StubPrinter::pages(2))
            .oneshot(post_json(json!({
                "template": "prescription",
                "data": {
                    "patientName": "João",
                    "medications": [{ "name": "Amoxicilina", "dosage": "500mg" }]
                },
                "filename": "receita"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"receita.pdf\"; filename*=UTF-8''receita.pdf"
        );
        let bytes = body_bytes(response).await;
        assert_eq!(headers[header::CONTENT_LENGTH], bytes.len().to_string().as_str());
        assert_eq!(page_sizes(&bytes), vec![A4, A4]);
    }

    #[tokio::test]
    async fn certificate_background_text_with_override() {
        let dir = tempfile::tempdir().unwrap();
        write_background(dir.path(), "certificate.pdf", &[A4]);
        let printer = StubPrinter::pages(1);
        let response = app(dir.path(), printer.clone())
            .oneshot(post_json(json!({
                "template": "certificate",
                "data": { "patientName": "Maria", "doctorName": "Dra. Ana" },
                "layoutMode": "background-text",
                "coords": { "certificate": { "doctorName": { "x": 0.28, "y": 0.80 } } }
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(page_sizes(&body_bytes(response).await), vec![A4]);
        assert_eq!(printer.calls(), 0);
    }

    #[tokio::test]
    async fn background_text_without_layout_is_4xx() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), StubPrinter::pages(1))
            .oneshot(post_json(json!({
                "template": "anamnesis",
                "data": {},
                "layoutMode": "background-text"
            })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Layout"));
    }

    #[tokio::test]
    async fn raw_html_without_background() {
        let dir = tempfile::tempdir().unwrap();
        let printer = StubPrinter::pages(1);
        let response = app(dir.path(), printer.clone())
            .oneshot(post_json(json!({ "html": "<h1>Olá</h1>" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"document.pdf\"; filename*=UTF-8''document.pdf"
        );
        assert_eq!(body_bytes(response).await, printer.output());
    }

    #[test]
    fn non_ascii_filename_gets_an_encoded_form() {
        assert_eq!(
            content_disposition("receita_joão.pdf"),
            "attachment; filename=\"receita_jo_o.pdf\"; filename*=UTF-8''receita_jo%C3%A3o.pdf"
        );
    }

    #[tokio::test]
    async fn render_failure_includes_stack_outside_production() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), StubPrinter::failing())
            .oneshot(post_json(json!({ "html": "<p/>" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Chromium"));
        assert!(body["stack"].is_string());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let html = "a".repeat(BODY_LIMIT + 1);
        let response = app(dir.path(), StubPrinter::pages(1))
            .oneshot(post_json(json!({ "html": html })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
