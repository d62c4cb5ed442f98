//! HTML to PDF conversion through a headless Chrome session.
//!
//! Every render opens its own browser session and closes it before returning,
//! whether the render succeeded, failed, or panicked. A semaphore bounds how many
//! sessions may be open at once.

use anyhow::{anyhow, bail, Context, Result};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

const MM_PER_INCH: f64 = 25.4;

/// Page parameters handed to the browser's print-to-PDF call.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    /// A4 with a 10mm top, 20mm bottom and 1mm side margin.
    fn default() -> Self {
        Self {
            paper_width_in: 8.27,
            paper_height_in: 11.69,
            margin_top_mm: 10.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 1.0,
            margin_right_mm: 1.0,
            print_background: true,
            prefer_css_page_size: false,
        }
    }
}

impl PdfOptions {
    fn to_chrome(&self) -> PrintToPdfOptions {
        PrintToPdfOptions {
            print_background: Some(self.print_background),
            paper_width: Some(self.paper_width_in),
            paper_height: Some(self.paper_height_in),
            margin_top: Some(self.margin_top_mm / MM_PER_INCH),
            margin_bottom: Some(self.margin_bottom_mm / MM_PER_INCH),
            margin_left: Some(self.margin_left_mm / MM_PER_INCH),
            margin_right: Some(self.margin_right_mm / MM_PER_INCH),
            prefer_css_page_size: Some(self.prefer_css_page_size),
            ..Default::default()
        }
    }
}

/// Starts browser sessions. Implementations block; call them off the async runtime.
pub trait BrowserLauncher: Send + Sync + 'static {
    fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// An open headless browser. `close` must be idempotent.
pub trait BrowserSession: Send {
    fn print_to_pdf(&mut self, html: &str, options: &PdfOptions) -> Result<Vec<u8>>;

    fn close(&mut self);
}

/// Closes the wrapped session when dropped.
struct SessionGuard {
    session: Box<dyn BrowserSession>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self { session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        debug!("Browser session released");
    }
}

/// Launches a local Chrome/Chromium binary via the DevTools protocol.
pub struct ChromeLauncher {
    chrome_path: Option<PathBuf>,
    timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(chrome_path: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            chrome_path,
            timeout,
        }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.chrome_path.clone())
            .idle_browser_timeout(self.timeout)
            .build()
            .map_err(|e| anyhow!("Invalid browser launch options: {}", e))?;

        let browser = Browser::new(options).context("Failed to launch headless browser")?;

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            timeout: self.timeout,
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    timeout: Duration,
}

impl BrowserSession for ChromeSession {
    fn print_to_pdf(&mut self, html: &str, options: &PdfOptions) -> Result<Vec<u8>> {
        let browser = self
            .browser
            .as_ref()
            .context("Browser session already closed")?;

        // Staged on disk so large documents avoid data-URL length limits.
        let mut page = tempfile::Builder::new()
            .prefix("render-")
            .suffix(".html")
            .tempfile()
            .context("Failed to create staging file")?;
        page.write_all(html.as_bytes())
            .and_then(|_| page.flush())
            .context("Failed to write staging file")?;
        let url = format!("file://{}", page.path().display());

        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(self.timeout);
        tab.navigate_to(&url)
            .context("Failed to load document")?
            .wait_until_navigated()
            .context("Document did not finish loading")?;

        let pdf = tab
            .print_to_pdf(Some(options.to_chrome()))
            .context("PDF generation failed")?;

        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab cleanly: {}", e);
        }

        Ok(pdf)
    }

    fn close(&mut self) {
        // Dropping the handle terminates the browser process.
        if self.browser.take().is_some() {
            debug!("Chrome process closed");
        }
    }
}

/// Async facade over a [`BrowserLauncher`] with a concurrency cap and a render deadline.
pub struct HtmlToPdfConverter {
    launcher: Arc<dyn BrowserLauncher>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    options: PdfOptions,
}

impl HtmlToPdfConverter {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, max_sessions: usize, timeout: Duration) -> Self {
        Self {
            launcher,
            permits: Arc::new(Semaphore::new(max_sessions)),
            timeout,
            options: PdfOptions::default(),
        }
    }

    /// Number of sessions that could be opened right now without waiting.
    pub fn available_sessions(&self) -> usize {
        self.permits.available_permits()
    }

    /// Renders a complete HTML document to PDF bytes.
    ///
    /// The semaphore permit travels with the blocking task, so a render that
    /// outlives its deadline keeps counting against the limit until its browser
    /// has actually been closed.
    pub async fn convert(&self, html: String) -> Result<Vec<u8>> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("Render limiter closed")?;

        let launcher = self.launcher.clone();
        let options = self.options.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            render_blocking(launcher.as_ref(), &html, &options)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(anyhow!("Render task aborted: {}", join_error)),
            Err(_) => bail!("PDF render timed out after {}ms", self.timeout.as_millis()),
        }
    }
}

/// Opens a session, prints `html`, and closes the session on every exit path.
pub fn render_blocking(
    launcher: &dyn BrowserLauncher,
    html: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>> {
    info!("Launching browser session: html_bytes={}", html.len());

    let mut guard = SessionGuard::new(launcher.launch()?);
    let pdf = guard.session.print_to_pdf(html, options)?;

    if pdf.is_empty() {
        bail!("Browser produced an empty PDF");
    }

    info!("PDF render complete: {} bytes", pdf.len());
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Slow(Duration),
    }

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        closed: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    struct FakeLauncher {
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    impl FakeLauncher {
        fn new(behavior: Behavior) -> (Arc<Self>, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let launcher = Arc::new(Self {
                behavior,
                counters: counters.clone(),
            });
            (launcher, counters)
        }
    }

    impl BrowserLauncher for FakeLauncher {
        fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(active, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                behavior: self.behavior,
                counters: self.counters.clone(),
                open: true,
            }))
        }
    }

    struct FakeSession {
        behavior: Behavior,
        counters: Arc<Counters>,
        open: bool,
    }

    impl BrowserSession for FakeSession {
        fn print_to_pdf(&mut self, html: &str, _options: &PdfOptions) -> Result<Vec<u8>> {
            match self.behavior {
                Behavior::Succeed => Ok(format!("%PDF-fake {}", html).into_bytes()),
                Behavior::Fail => bail!("page crashed"),
                Behavior::Panic => panic!("renderer panicked"),
                Behavior::Slow(delay) => {
                    std::thread::sleep(delay);
                    Ok(b"%PDF-slow".to_vec())
                }
            }
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                self.counters.active.fetch_sub(1, Ordering::SeqCst);
                self.counters.closed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct FailingLauncher;

    impl BrowserLauncher for FailingLauncher {
        fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            bail!("chrome binary not found")
        }
    }

    fn converter(launcher: Arc<dyn BrowserLauncher>, max: usize, timeout_ms: u64) -> HtmlToPdfConverter {
        HtmlToPdfConverter::new(launcher, max, Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_successful_render_closes_session() {
        let (launcher, counters) = FakeLauncher::new(Behavior::Succeed);
        let converter = converter(launcher, 2, 5_000);

        let pdf = converter.convert("<p>hi</p>".to_string()).await.unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_renders_never_leak_sessions() {
        let (launcher, counters) = FakeLauncher::new(Behavior::Fail);
        let converter = converter(launcher, 2, 5_000);

        for _ in 0..5 {
            let err = converter.convert("<p>x</p>".to_string()).await.unwrap_err();
            assert!(format!("{:#}", err).contains("page crashed"));
        }

        assert_eq!(counters.launched.load(Ordering::SeqCst), 5);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 5);
        assert_eq!(counters.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_render_still_closes_session() {
        let (launcher, counters) = FakeLauncher::new(Behavior::Panic);
        let converter = converter(launcher, 1, 5_000);

        let err = converter.convert("<p>x</p>".to_string()).await.unwrap_err();

        assert!(err.to_string().contains("Render task aborted"));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(converter.available_sessions(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let converter = converter(Arc::new(FailingLauncher), 1, 5_000);
        let err = converter.convert("<p>x</p>".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("chrome binary not found"));
        assert_eq!(converter.available_sessions(), 1);
    }

    #[tokio::test]
    async fn test_timeout_releases_session_when_render_finishes() {
        let (launcher, counters) = FakeLauncher::new(Behavior::Slow(Duration::from_millis(200)));
        let converter = converter(launcher, 1, 20);

        let err = converter.convert("<p>x</p>".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(converter.available_sessions(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_bounded() {
        let (launcher, counters) = FakeLauncher::new(Behavior::Slow(Duration::from_millis(50)));
        let converter = Arc::new(converter(launcher, 2, 5_000));

        let mut handles = Vec::new();
        for i in 0..6 {
            let converter = converter.clone();
            handles.push(tokio::spawn(async move {
                converter.convert(format!("<p>{}</p>", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(counters.launched.load(Ordering::SeqCst), 6);
        assert!(counters.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_empty_pdf_is_an_error() {
        struct EmptyLauncher;
        struct EmptySession;
        impl BrowserLauncher for EmptyLauncher {
            fn launch(&self) -> Result<Box<dyn BrowserSession>> {
                Ok(Box::new(EmptySession))
            }
        }
        impl BrowserSession for EmptySession {
            fn print_to_pdf(&mut self, _html: &str, _options: &PdfOptions) -> Result<Vec<u8>> {
                Ok(Vec::new())
            }
            fn close(&mut self) {}
        }

        let result = render_blocking(&EmptyLauncher, "<p>x</p>", &PdfOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_default_options_are_a4_with_margins() {
        let chrome = PdfOptions::default().to_chrome();
        assert_eq!(chrome.paper_width, Some(8.27));
        assert_eq!(chrome.paper_height, Some(11.69));
        assert_eq!(chrome.print_background, Some(true));
        let top = chrome.margin_top.unwrap();
        assert!((top - 10.0 / 25.4).abs() < 1e-9);
        let bottom = chrome.margin_bottom.unwrap();
        assert!((bottom - 20.0 / 25.4).abs() < 1e-9);
    }

    /// Requires a local Chrome/Chromium install.
    #[test]
    #[ignore]
    fn test_chrome_renders_pdf() {
        let launcher = ChromeLauncher::new(None, Duration::from_secs(30));
        let pdf = render_blocking(&launcher, "<h1>Hello</h1>", &PdfOptions::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
