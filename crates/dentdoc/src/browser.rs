use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dentdoc_core::page::PageOptions;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};

use crate::error::ApiError;

/// Width of an A4 page at 96 dpi.
pub const A4_WIDTH_PX: u32 = 794;
const A4_HEIGHT_PX: u32 = 1123;

const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
];

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Turns an HTML document into PDF bytes. Implementations block.
pub trait HtmlPrinter: Send + Sync {
    fn print_pdf(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>, ApiError>;
}

/// Find a Chrome or Chromium executable: the explicit path, `CHROME_PATH`,
/// well-known install locations, `PATH`, then headless_chrome's own lookup.
pub fn locate_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
    let from_env = std::env::var_os("CHROME_PATH").map(PathBuf::from);
    let configured = explicit.map(Path::to_path_buf).into_iter().chain(from_env);
    let well_known = WELL_KNOWN_PATHS.iter().map(PathBuf::from);

    for path in configured.chain(well_known) {
        if path.is_file() {
            return Some(path);
        }
        log::trace!("No browser at {}", path.display());
    }

    PATH_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| headless_chrome::browser::default_executable().ok())
}

/// Print options for Chrome, lengths in inches.
pub fn pdf_options(page: &PageOptions) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(page.landscape),
        print_background: Some(page.print_background),
        scale: Some(page.scale),
        paper_width: Some(page.paper.width_in),
        paper_height: Some(page.paper.height_in),
        margin_top: Some(page.margins.top),
        margin_bottom: Some(page.margins.bottom),
        margin_left: Some(page.margins.left),
        margin_right: Some(page.margins.right),
        prefer_css_page_size: Some(page.prefer_css_page_size),
        ..Default::default()
    }
}

/// One browser process per call, closed when the call returns.
#[derive(Debug, Clone)]
pub struct ChromePrinter {
    chrome_path: Option<PathBuf>,
    timeout: Duration,
}

impl ChromePrinter {
    pub fn new(chrome_path: Option<PathBuf>, timeout: Duration) -> Self {
        ChromePrinter {
            chrome_path,
            timeout,
        }
    }

    pub fn shared(chrome_path: Option<PathBuf>, timeout: Duration) -> Arc<dyn HtmlPrinter> {
        Arc::new(ChromePrinter::new(chrome_path, timeout))
    }

    fn launch(&self, window: (u32, u32)) -> Result<Browser, ApiError> {
        let path = locate_chrome(self.chrome_path.as_deref()).ok_or(ApiError::BrowserNotFound)?;
        log::debug!("Launching {}", path.display());

        let options = LaunchOptionsBuilder::default()
            .headless(true)
            .sandbox(false)
            .path(Some(path))
            .window_size(Some(window))
            .idle_browser_timeout(self.timeout)
            .args(vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--hide-scrollbars"),
            ])
            .build()
            .map_err(|e| ApiError::Render(format!("invalid launch options: {e}")))?;

        Browser::new(options).map_err(|e| ApiError::Render(format!("failed to launch browser: {e}")))
    }

    /// Open a tab showing `html` and wait for it to finish loading.
    fn load(&self, browser: &Browser, html: &str) -> Result<Arc<Tab>, ApiError> {
        let tab = browser
            .new_tab()
            .map_err(|e| ApiError::Render(format!("failed to create tab: {e}")))?;
        tab.set_default_timeout(self.timeout);

        let markup = serde_json::to_string(html).map_err(|e| ApiError::Internal(e.to_string()))?;
        tab.evaluate(
            &format!("document.open(); document.write({markup}); document.close();"),
            false,
        )
        .map_err(|e| ApiError::Render(format!("failed to load HTML: {e}")))?;
        tab.evaluate(
            "new Promise(resolve => {
                const done = () => document.fonts.ready.then(() => resolve(true));
                if (document.readyState === 'complete') { done(); }
                else { window.addEventListener('load', done, { once: true }); }
            })",
            true,
        )
        .map_err(|e| ApiError::Render(format!("page did not finish loading: {e}")))?;

        Ok(tab)
    }

    /// Screenshot of the whole document at twice the CSS pixel density,
    /// `width` CSS pixels wide.
    pub fn capture_png(&self, html: &str, width: u32) -> Result<Vec<u8>, ApiError> {
        let browser = self.launch((width, A4_HEIGHT_PX))?;
        let tab = self.load(&browser, html)?;

        let height = tab
            .evaluate("document.documentElement.scrollHeight", false)
            .map_err(|e| ApiError::Render(e.to_string()))?
            .value
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::from(A4_HEIGHT_PX));

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(width),
            height,
            scale: 2.0,
        };
        tab.capture_screenshot(
            Page::CaptureScreenshotFormatOption::Png,
            None,
            Some(clip),
            true,
        )
        .map_err(|e| ApiError::Render(format!("failed to capture page: {e}")))
    }
}

impl HtmlPrinter for ChromePrinter {
    fn print_pdf(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>, ApiError> {
        let browser = self.launch((A4_WIDTH_PX, A4_HEIGHT_PX))?;
        let tab = self.load(&browser, html)?;
        let bytes = tab
            .print_to_pdf(Some(pdf_options(page)))
            .map_err(|e| ApiError::Render(format!("failed to print PDF: {e}")))?;
        log::debug!("Browser produced {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dentdoc_core::page::{PageOptionsInput, PaperSize};

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(locate_chrome(Some(&fake)), Some(fake.clone()));
    }

    #[test]
    fn default_print_options() {
        let options = pdf_options(&PageOptions::default());
        assert_eq!(options.print_background, Some(true));
        assert_eq!(options.paper_width, Some(PaperSize::A4.width_in));
        assert_eq!(options.landscape, Some(false));
        let margin = options.margin_top.unwrap();
        assert!((margin - 0.5 / 2.54).abs() < 1e-9);
    }

    #[test]
    fn landscape_letter() {
        let input = PageOptionsInput {
            format: Some("Letter".to_string()),
            landscape: Some(true),
            ..Default::default()
        };
        let page = PageOptions::from_input(Some(&input)).unwrap();
        let options = pdf_options(&page);
        assert_eq!(options.paper_width, Some(8.5));
        assert_eq!(options.landscape, Some(true));
    }
}
