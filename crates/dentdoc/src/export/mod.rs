use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use dentdoc_core::document::PatientData;
use dentdoc_core::fallback::fallback_html;
use dentdoc_core::page::PaperSize;
use dentdoc_pdf::raster::{paginate_image, MM};

use crate::browser::ChromePrinter;

pub mod cli;

/// Margin around the captured image on every page.
const MARGIN_MM: f32 = 10.0;

/// What is being exported.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportInput {
    Template { name: String, data: PatientData },
    Html(String),
}

impl ExportInput {
    /// Read the data or HTML file named by the options.
    pub fn load(options: &cli::ExportOptions) -> Result<Self> {
        if let Some(path) = &options.html {
            let html = std::fs::read_to_string(path)
                .wrap_err_with(|| f!("failed to read {}", path.display()))?;
            return Ok(ExportInput::Html(html));
        }

        let name = options
            .template
            .clone()
            .ok_or_eyre("pass --html or --template")?;
        let data = match &options.data {
            Some(path) => read_data(path)?,
            None => PatientData::new(),
        };
        Ok(ExportInput::Template { name, data })
    }

    /// The `/generate-pdf` body.
    pub fn request_body(&self, options: &cli::ExportOptions) -> serde_json::Value {
        let page = serde_json::json!({
            "format": options.format,
            "landscape": options.landscape,
        });
        match self {
            ExportInput::Template { name, data } => serde_json::json!({
                "template": name,
                "data": data,
                "options": page,
            }),
            ExportInput::Html(html) => serde_json::json!({
                "html": html,
                "options": page,
            }),
        }
    }

    /// The approximate document rendered when the server is unavailable.
    pub fn local_html(&self) -> String {
        match self {
            ExportInput::Template { name, data } => fallback_html(name, data),
            ExportInput::Html(html) => html.clone(),
        }
    }
}

fn read_data(path: &Path) -> Result<PatientData> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("failed to read {}", path.display()))?;
    match serde_json::from_str(&text)
        .wrap_err_with(|| f!("{} is not valid JSON", path.display()))?
    {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(eyre!("{} must contain a JSON object", path.display())),
    }
}

/// Paper size in inches for a format name and orientation.
pub fn paper(format: &str, landscape: bool) -> Result<PaperSize> {
    PaperSize::from_name(format)
        .map(|p| p.oriented(landscape))
        .ok_or_else(|| eyre!("unknown format `{format}`"))
}

pub async fn run(options: cli::ExportOptions, global: crate::Global) -> Result<()> {
    let paper = paper(&options.format, options.landscape)?;
    let input = ExportInput::load(&options)?;
    let timeout = Duration::from_secs(options.timeout.max(1));

    let bytes = match request_server(&options.server, &input.request_body(&options), timeout).await
    {
        Ok(bytes) => {
            if global.verbose {
                eprintln!("{} PDF generated by {}", "✓".green(), options.server);
            }
            bytes
        }
        Err(e) => {
            log::warn!("Server export failed: {:#}", e);
            eprintln!(
                "{} Server unavailable ({}), rendering locally",
                "!".yellow(),
                e
            );
            render_locally(&input, paper, options.chrome_path.clone(), timeout).await?
        }
    };

    tokio::fs::write(&options.output, &bytes)
        .await
        .wrap_err_with(|| f!("failed to write {}", options.output.display()))?;
    println!(
        "{} {} ({} bytes)",
        "Saved".green().bold(),
        options.output.display(),
        bytes.len()
    );
    Ok(())
}

/// POST the body and return the PDF. Non-2xx answers are errors.
pub async fn request_server(
    url: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.post(url).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(eyre!("server answered {}: {}", status, text));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Capture the HTML as one tall image and cut it into pages.
async fn render_locally(
    input: &ExportInput,
    paper: PaperSize,
    chrome_path: Option<std::path::PathBuf>,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let html = input.local_html();
    let width = (paper.width_in * 96.0).round() as u32;
    let printer = ChromePrinter::new(chrome_path, timeout);

    let capture = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || printer.capture_png(&html, width)),
    )
    .await
    .map_err(|_| eyre!("local rendering timed out after {}s", timeout.as_secs()))???;

    Ok(paginate_image(&capture, paper.points(), MARGIN_MM * MM)?)
}
