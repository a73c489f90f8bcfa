//! Per-request strategy selection.
//!
//! A validated [`DocumentRequest`] goes down one of two paths:
//!
//! - background-text: fields are drawn straight onto the background page.
//! - overlay-html: the template is rendered, printed by the browser and,
//!   unless the caller opts out, merged over the background.

use std::sync::Arc;

use dentdoc_core::document::{
    BackgroundPolicy, DocumentRequest, DocumentSource, DocumentType, PatientData, RenderMode,
};
use dentdoc_core::layout::ResolvedLayout;
use dentdoc_core::logo::to_data_url;
use dentdoc_core::page::PageOptions;
use dentdoc_core::template::{template_data, TemplateRenderer};
use dentdoc_pdf::{merge, overlay, OverlayOptions};

use crate::assets::AssetStore;
use crate::browser::HtmlPrinter;
use crate::config::Settings;
use crate::error::ApiError;

/// Date format injected as `currentDate`.
const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub filename: String,
}

pub struct Orchestrator {
    settings: Arc<Settings>,
    assets: AssetStore,
    renderer: TemplateRenderer,
    printer: Arc<dyn HtmlPrinter>,
}

impl Orchestrator {
    pub fn new(settings: Arc<Settings>, printer: Arc<dyn HtmlPrinter>) -> Self {
        let assets = AssetStore::new(&settings);
        let renderer = TemplateRenderer::new(assets.templates());
        Orchestrator {
            settings,
            assets,
            renderer,
            printer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn generate(&self, request: DocumentRequest) -> Result<GeneratedPdf, ApiError> {
        let bytes = match (&request.source, request.render_mode) {
            (
                DocumentSource::Template {
                    document_type,
                    patient_data,
                },
                RenderMode::BackgroundText,
            ) => {
                log::info!("Generating {} with background-text", document_type);
                self.background_text(&request, *document_type, patient_data)
                    .await?
            }
            (source, mode) => {
                if mode == RenderMode::BackgroundText {
                    log::info!("background-text needs a template, rendering raw HTML instead");
                }
                let name = source.document_type().map_or("html", |d| d.as_str());
                log::info!("Generating {} with overlay-html", name);
                self.overlay_html(&request).await?
            }
        };

        Ok(GeneratedPdf {
            bytes,
            filename: request.filename,
        })
    }

    async fn background_text(
        &self,
        request: &DocumentRequest,
        document: DocumentType,
        data: &PatientData,
    ) -> Result<Vec<u8>, ApiError> {
        let background = self
            .assets
            .background(Some(document))
            .await
            .ok_or_else(|| ApiError::layout_not_found(Some(document)))?;
        let logo = self.assets.logo(request.logo.as_ref()).await;

        let layout = ResolvedLayout::new(&self.settings.layout, Some(&request.coordinate_overrides));
        let options = OverlayOptions {
            logo: logo.as_ref().map(|l| l.bytes.as_slice()),
            debug_grid: request.debug_grid,
        };
        Ok(overlay(&background, document, data, &layout, options)?)
    }

    async fn overlay_html(&self, request: &DocumentRequest) -> Result<Vec<u8>, ApiError> {
        let document = request.document_type();
        let background = match request.background {
            BackgroundPolicy::Skip => None,
            BackgroundPolicy::Auto => self.assets.background(document).await,
            BackgroundPolicy::Force => Some(
                self.assets
                    .background(document)
                    .await
                    .ok_or_else(|| ApiError::layout_not_found(document))?,
            ),
        };

        let html = match &request.source {
            DocumentSource::Template {
                document_type,
                patient_data,
            } => {
                let logo = self.assets.logo(request.logo.as_ref()).await;
                let logo_url = logo.map(|l| to_data_url(&l.bytes, l.format.mime()));
                let today = chrono::Local::now().format(DATE_FORMAT).to_string();
                let data = template_data(patient_data, &today, logo_url.as_deref());
                self.renderer.render(document_type.as_str(), &data)?
            }
            DocumentSource::Html(html) => html.clone(),
        };

        let content = self.print(html, request.page).await?;

        let Some(background) = background else {
            return Ok(content);
        };
        match merge(&content, Some(&background), self.settings.merge_fit) {
            Ok(merged) => Ok(merged),
            Err(warning) => {
                log::warn!("{}", warning);
                Ok(warning.content)
            }
        }
    }

    /// Print on a blocking thread, bounded by the render timeout.
    async fn print(&self, html: String, page: PageOptions) -> Result<Vec<u8>, ApiError> {
        let printer = Arc::clone(&self.printer);
        let timeout = self.settings.render_timeout;
        let task = tokio::task::spawn_blocking(move || printer.print_pdf(&html, &page));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ApiError::Internal(format!("render task failed: {e}"))),
            Err(_) => Err(ApiError::Timeout(timeout.as_secs())),
        }
    }
}
