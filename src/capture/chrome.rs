use super::cdp::{CdpConnection, CdpEvent};
use super::traits::{Browser, RenderingContext, Viewport};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use url::Url;

/// How long the browser gets to print its DevTools endpoint.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Grace period for `Browser.close` and process exit during teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);
/// Chromium refuses to rasterize much taller surfaces in one capture.
const MAX_CAPTURE_HEIGHT: f64 = 16_384.0;

/// Environment passed through to the browser process. Everything else,
/// including provider credentials, is cleared.
const SAFE_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "LANG",
    "LC_ALL",
    "TMPDIR",
    "FONTCONFIG_PATH",
];

const BINARY_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Headless Chromium driven over the DevTools protocol.
pub struct ChromeBrowser {
    binary: Option<String>,
    disable_sandbox: bool,
    network_idle_budget: Duration,
}

impl ChromeBrowser {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            binary: config.browser_binary.clone(),
            disable_sandbox: config.disable_sandbox,
            network_idle_budget: Duration::from_millis(config.network_idle_budget_ms),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, CaptureError> {
        if let Some(binary) = self.binary.as_deref() {
            return find_executable(binary).ok_or_else(|| {
                CaptureError::RenderingContextError(format!("browser binary not found: {binary}"))
            });
        }

        BINARY_CANDIDATES
            .iter()
            .find_map(|candidate| find_executable(candidate))
            .ok_or_else(|| {
                CaptureError::RenderingContextError(
                    "no Chromium-compatible browser found; set [capture].browser_binary \
                     or DESIGNLENS_BROWSER"
                        .into(),
                )
            })
    }

    fn command_args(&self, profile_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "--headless=new".to_string(),
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--mute-audio".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-extensions".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.disable_sandbox {
            args.push("--no-sandbox".to_string());
        }
        args.push("about:blank".to_string());
        args
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn launch(&self) -> Result<Box<dyn RenderingContext>, CaptureError> {
        let binary = self.resolve_binary()?;
        let profile = tempfile::Builder::new()
            .prefix("designlens-profile-")
            .tempdir()
            .map_err(|e| {
                CaptureError::RenderingContextError(format!("failed to create profile dir: {e}"))
            })?;

        let mut cmd = Command::new(&binary);
        cmd.args(self.command_args(profile.path()))
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in SAFE_ENV_VARS {
            if let Ok(val) = std::env::var(var) {
                cmd.env(var, val);
            }
        }

        tracing::debug!(binary = %binary.display(), "Launching headless browser");
        let mut child = cmd.spawn().map_err(|e| {
            CaptureError::RenderingContextError(format!(
                "failed to launch {}: {e}",
                binary.display()
            ))
        })?;

        let Some(stderr) = child.stderr.take() else {
            return Err(CaptureError::RenderingContextError(
                "browser stderr was not captured".into(),
            ));
        };

        let mut context = ChromeContext {
            child,
            profile: Some(profile),
            cdp: None,
            session_id: String::new(),
            network_idle_budget: self.network_idle_budget,
        };

        match context.attach(stderr).await {
            Ok(()) => Ok(Box::new(context)),
            Err(e) => {
                context.shutdown().await;
                Err(CaptureError::RenderingContextError(format!("{e:#}")))
            }
        }
    }
}

/// One browser process with one attached page.
///
/// Dropping the context without `close` still kills the process
/// (`kill_on_drop`) and removes the profile directory.
struct ChromeContext {
    child: Child,
    profile: Option<TempDir>,
    cdp: Option<CdpConnection>,
    session_id: String,
    network_idle_budget: Duration,
}

impl ChromeContext {
    async fn attach(&mut self, stderr: ChildStderr) -> anyhow::Result<()> {
        let mut lines = BufReader::new(stderr).lines();
        let ws_url = tokio::time::timeout(LAUNCH_TIMEOUT, read_devtools_url(&mut lines))
            .await
            .map_err(|_| anyhow::anyhow!("browser did not expose DevTools within {LAUNCH_TIMEOUT:?}"))??;

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::trace!(target: "designlens::browser", "{line}");
            }
        });

        let mut cdp = CdpConnection::connect(&ws_url).await?;

        let target = cdp
            .call("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = target
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Target.createTarget returned no targetId"))?;

        let attached = cdp
            .call(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Target.attachToTarget returned no sessionId"))?
            .to_string();

        cdp.call("Page.enable", json!({}), Some(&session_id)).await?;
        cdp.call(
            "Page.setLifecycleEventsEnabled",
            json!({ "enabled": true }),
            Some(&session_id),
        )
        .await?;

        self.session_id = session_id;
        self.cdp = Some(cdp);
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Some(mut cdp) = self.cdp.take() {
            let _ = tokio::time::timeout(
                SHUTDOWN_GRACE,
                cdp.call("Browser.close", json!({}), None),
            )
            .await;
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, cdp.close()).await;
        }

        if let Err(e) = self.child.start_kill() {
            tracing::debug!("browser already exited: {e}");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait())
            .await
            .is_err()
        {
            tracing::warn!("browser process did not exit within {SHUTDOWN_GRACE:?}");
        }

        if let Some(profile) = self.profile.take()
            && let Err(e) = profile.close()
        {
            tracing::warn!("failed to remove browser profile: {e}");
        }
    }
}

#[async_trait]
impl RenderingContext for ChromeContext {
    async fn navigate_and_capture(
        &mut self,
        url: &Url,
        viewport: Viewport,
    ) -> Result<Vec<u8>, CaptureError> {
        let Self {
            cdp,
            session_id,
            network_idle_budget,
            ..
        } = self;
        let cdp = cdp.as_mut().ok_or_else(|| {
            CaptureError::RenderingContextError("page is not attached".into())
        })?;
        let session_id = session_id.as_str();
        let network_idle_budget = *network_idle_budget;
        let session = Some(session_id);
        let rendering = |e: anyhow::Error| CaptureError::RenderingContextError(format!("{e:#}"));
        let navigation = |e: anyhow::Error| CaptureError::NavigationError(format!("{e:#}"));

        cdp.call(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "deviceScaleFactor": 1,
                "mobile": false,
            }),
            session,
        )
        .await
        .map_err(rendering)?;

        cdp.clear_events();
        let nav = cdp
            .call("Page.navigate", json!({ "url": url.as_str() }), session)
            .await
            .map_err(navigation)?;

        if let Some(error_text) = nav
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            return Err(CaptureError::NavigationError(error_text.to_string()));
        }

        let frame_id = nav
            .get("frameId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let loader_id = nav
            .get("loaderId")
            .and_then(Value::as_str)
            .map(str::to_string);

        cdp.wait_for_event(|e| {
            is_lifecycle(e, session_id, &frame_id, loader_id.as_deref(), "load")
        })
        .await
        .map_err(navigation)?;

        match tokio::time::timeout(
            network_idle_budget,
            cdp.wait_for_event(|e| {
                is_lifecycle(e, session_id, &frame_id, loader_id.as_deref(), "networkIdle")
            }),
        )
        .await
        {
            Ok(Ok(_)) => tracing::debug!(url = %url, "Network idle"),
            Ok(Err(e)) => return Err(navigation(e)),
            Err(_) => tracing::debug!(
                url = %url,
                budget = ?network_idle_budget,
                "Network never went idle, capturing anyway"
            ),
        }

        let metrics = cdp
            .call("Page.getLayoutMetrics", json!({}), session)
            .await
            .map_err(rendering)?;
        let height = full_page_height(&metrics, viewport);

        let shot = cdp
            .call(
                "Page.captureScreenshot",
                json!({
                    "format": "png",
                    "captureBeyondViewport": true,
                    "fromSurface": true,
                    "clip": {
                        "x": 0,
                        "y": 0,
                        "width": viewport.width,
                        "height": height,
                        "scale": 1,
                    },
                }),
                session,
            )
            .await
            .map_err(rendering)?;

        let data = shot.get("data").and_then(Value::as_str).ok_or_else(|| {
            CaptureError::RenderingContextError("captureScreenshot returned no data".into())
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| CaptureError::RenderingContextError(format!("invalid PNG payload: {e}")))
    }

    async fn close(self: Box<Self>) {
        let mut context = self;
        context.shutdown().await;
    }
}

fn is_lifecycle(
    event: &CdpEvent,
    session_id: &str,
    frame_id: &str,
    loader_id: Option<&str>,
    name: &str,
) -> bool {
    event.method == "Page.lifecycleEvent"
        && event.session_id.as_deref() == Some(session_id)
        && event.param_str("name") == Some(name)
        && event.param_str("frameId") == Some(frame_id)
        && loader_id.is_none_or(|id| event.param_str("loaderId") == Some(id))
}

/// Document height in CSS pixels, never shorter than the viewport.
fn full_page_height(metrics: &Value, viewport: Viewport) -> f64 {
    let content = metrics
        .get("cssContentSize")
        .or_else(|| metrics.get("contentSize"))
        .and_then(|size| size.get("height"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    content
        .ceil()
        .max(f64::from(viewport.height))
        .min(MAX_CAPTURE_HEIGHT)
}

/// Extract the browser WebSocket endpoint from a Chromium stderr line.
fn parse_devtools_line(line: &str) -> Option<&str> {
    let rest = line.split_once("DevTools listening on ")?.1;
    let url = rest.trim();
    url.starts_with("ws://").then_some(url)
}

async fn read_devtools_url(lines: &mut Lines<BufReader<ChildStderr>>) -> anyhow::Result<String> {
    while let Some(line) = lines.next_line().await? {
        if let Some(url) = parse_devtools_line(&line) {
            return Ok(url.to_string());
        }
        tracing::trace!(target: "designlens::browser", "{line}");
    }
    anyhow::bail!("browser exited before exposing DevTools")
}

/// Resolve a binary name against `PATH`, or accept an existing path as-is.
fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|full| full.is_file())
}
