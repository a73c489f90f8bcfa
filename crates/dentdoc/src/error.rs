use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dentdoc_core::document::{DocumentType, RequestError};
use dentdoc_core::template::TemplateError;
use dentdoc_pdf::PdfError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Erro ao renderizar template: {0}")]
    Template(#[from] TemplateError),

    #[error("Layout não encontrado: {0}")]
    LayoutNotFound(String),

    #[error("Chromium não encontrado. Instale o Google Chrome ou defina CHROME_PATH.")]
    BrowserNotFound,

    #[error("Falha ao renderizar o PDF: {0}")]
    Render(String),

    #[error("Renderização excedeu o tempo limite de {0}s")]
    Timeout(u64),

    #[error("Falha ao montar o PDF: {0}")]
    Pdf(#[from] PdfError),

    #[error("Endpoint não encontrado. Use POST /generate-pdf para gerar PDFs.")]
    RouteNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl ApiError {
    pub fn layout_not_found(document: Option<DocumentType>) -> Self {
        let name = document.map(|d| d.as_str()).unwrap_or("letterhead");
        ApiError::LayoutNotFound(format!("nenhum fundo PDF para `{name}`"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Request(_) | ApiError::LayoutNotFound(_) => StatusCode::BAD_REQUEST,
            ApiError::Template(TemplateError::Read { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Template(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::BrowserNotFound
            | ApiError::Render(_)
            | ApiError::Timeout(_)
            | ApiError::Pdf(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error followed by its source chain, one cause per line.
    pub fn stack(&self) -> String {
        let mut stack = format!("{self:?}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            stack.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        stack
    }

    /// JSON error response. `stack` is only included outside production.
    pub fn to_response(&self, production: bool) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            stack: (!production).then(|| self.stack()),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response(true)
    }
}
