use std::path::PathBuf;

#[derive(Debug, Clone, clap::Args)]
pub struct ExportOptions {
    /// PDF endpoint of a running dentdoc server
    #[arg(
        long,
        env = "DENTDOC_SERVER",
        default_value = "http://localhost:3000/generate-pdf"
    )]
    pub server: String,

    /// Template name (certificate, prescription, anamnesis)
    #[arg(short, long)]
    pub template: Option<String>,

    /// JSON file with the template data
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// HTML file to export instead of a template
    #[arg(long, conflicts_with = "template")]
    pub html: Option<PathBuf>,

    /// Paper format (A4, Letter)
    #[arg(long, default_value = "A4")]
    pub format: String,

    /// Landscape orientation
    #[arg(long)]
    pub landscape: bool,

    /// Where to write the PDF
    #[arg(short, long, default_value = "document.pdf")]
    pub output: PathBuf,

    /// Timeout in seconds for the server call and for local rendering
    #[arg(long, env = "DENTDOC_EXPORT_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// Chrome or Chromium executable used for local rendering
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,
}
