use std::path::PathBuf;

use dentdoc_pdf::FitMode;

#[derive(Debug, Clone, clap::Args)]
pub struct ServeOptions {
    /// Port to listen on
    #[arg(short, long, env = "DENTDOC_PORT", default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "DENTDOC_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding the default logo and named logo files
    #[arg(long, env = "DENTDOC_ASSETS_DIR", default_value = "assets")]
    pub assets_dir: PathBuf,

    /// Directory holding background PDFs (`<type>.pdf`, `letterhead.pdf`)
    #[arg(long, env = "DENTDOC_LAYOUTS_DIR", default_value = "assets/layouts")]
    pub layouts_dir: PathBuf,

    /// Directory of `.html` templates consulted before the built-in ones
    #[arg(long, env = "DENTDOC_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// JSON file with field position overrides
    #[arg(long, env = "DENTDOC_LAYOUT_FILE")]
    pub layout_file: Option<PathBuf>,

    /// Chrome or Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Seconds allowed for launching the browser and printing
    #[arg(long, env = "DENTDOC_RENDER_TIMEOUT", default_value = "60")]
    pub render_timeout: u64,

    /// Hide error stacks in responses
    #[arg(long, env = "DENTDOC_PRODUCTION")]
    pub production: bool,

    /// How rendered pages are fitted onto the background (contain, stretch)
    #[arg(long, env = "DENTDOC_MERGE_FIT", default_value = "contain")]
    pub merge_fit: FitMode,

    /// Origins allowed by CORS, comma separated
    #[arg(
        long,
        env = "DENTDOC_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://localhost:5173,http://localhost:5174,http://127.0.0.1:5173,http://127.0.0.1:5174"
    )]
    pub allowed_origins: Vec<String>,
}
