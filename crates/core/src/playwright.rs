//! Playwright browser automation
//!
//! Each session runs one Node.js driver process that owns a Playwright
//! browser and page. Requests go to the driver as JSON lines on stdin and
//! replies come back as JSON lines on stdout, so page state (emulated media,
//! removed elements, scroll position) survives between queries.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CheckError, CheckResult};
use crate::page::{BrowserLauncher, BrowserOptions, BrowserSession, ColorScheme, Page};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for the Playwright launcher
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Node.js executable
    pub node_binary: PathBuf,

    /// Exported as `NODE_PATH` so the driver can `require('playwright')`
    pub node_path: Option<PathBuf>,

    pub browser: Browser,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            node_path: None,
            browser: Browser::Chromium,
        }
    }
}

/// Launches Playwright-driven browser sessions
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check if Node.js is available
    async fn check_node_installed(&self) -> CheckResult<()> {
        let status = Command::new(&self.config.node_binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(CheckError::DriverNotFound),
        }
    }

    /// Build the JSON argument handed to the driver script
    fn driver_config(&self, url: &str, options: &BrowserOptions) -> Value {
        json!({
            "url": url,
            "browser": self.config.browser.as_str(),
            "headless": options.headless,
            "args": options.args,
            "viewport": {
                "width": options.viewport.width,
                "height": options.viewport.height,
            },
        })
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, url: &str, options: &BrowserOptions) -> CheckResult<Box<dyn BrowserSession>> {
        self.check_node_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let config = self.driver_config(url, options);
        debug!("Launching driver {} with {}", script_path.display(), config);

        let mut cmd = Command::new(&self.config.node_binary);
        cmd.arg(&script_path)
            .arg(config.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(node_path) = &self.config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| CheckError::Launch(format!("failed to spawn driver: {}", e)))?;

        let mut io = DriverIo::attach(&mut child)?;
        let ready = io.read_message().await?;
        if !ready.get("ready").and_then(Value::as_bool).unwrap_or(false) {
            let reason = ready
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("driver did not report ready")
                .to_string();
            let _ = child.kill().await;
            return Err(CheckError::Launch(reason));
        }

        info!("Opened {} session at {}", self.config.browser.as_str(), url);

        Ok(Box::new(PlaywrightSession {
            page: PlaywrightPage {
                io: Mutex::new(Some(io)),
            },
            child: Mutex::new(child),
            _script_dir: script_dir,
        }))
    }
}

/// A running driver process and its page
pub struct PlaywrightSession {
    page: PlaywrightPage,
    child: Mutex<Child>,
    _script_dir: TempDir,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    fn page(&self) -> &dyn Page {
        &self.page
    }

    async fn close(&mut self) -> CheckResult<()> {
        let Some(mut io) = self.page.io.get_mut().take() else {
            return Ok(());
        };
        let child = self.child.get_mut();

        if let Err(e) = io.request("close", json!({})).await {
            warn!("Driver close failed, killing process: {}", e);
            if let Err(kill) = child.kill().await {
                warn!("Failed to kill driver: {}", kill);
            }
            return Err(e);
        }

        drop(io);
        let status = child.wait().await?;
        debug!("Driver exited with {}", status);
        Ok(())
    }
}

/// Page handle backed by the driver pipe
pub struct PlaywrightPage {
    io: Mutex<Option<DriverIo>>,
}

impl PlaywrightPage {
    async fn call(&self, op: &str, params: Value) -> CheckResult<Value> {
        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(CheckError::SessionClosed)?;
        io.request(op, params).await
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn has_element(&self, selector: &str) -> CheckResult<bool> {
        let value = self.call("hasElement", json!({ "selector": selector })).await?;
        value
            .as_bool()
            .ok_or_else(|| CheckError::Protocol(format!("hasElement returned {}", value)))
    }

    async fn computed_style(&self, selector: &str, properties: &[&str]) -> CheckResult<Vec<String>> {
        let value = self
            .call("getStyle", json!({ "selector": selector, "properties": properties }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn viewport_gap(&self, selector: &str) -> CheckResult<i64> {
        let value = self.call("viewportGap", json!({ "selector": selector })).await?;
        value
            .as_i64()
            .ok_or_else(|| CheckError::Protocol(format!("viewportGap returned {}", value)))
    }

    async fn emulate_color_scheme(&self, scheme: ColorScheme) -> CheckResult<()> {
        self.call("emulateColorScheme", json!({ "scheme": scheme.as_str() }))
            .await?;
        Ok(())
    }

    async fn remove_elements(&self, selector: &str) -> CheckResult<usize> {
        let value = self.call("removeElements", json!({ "selector": selector })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn scroll_to_end(&self) -> CheckResult<()> {
        self.call("scrollToEnd", json!({})).await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> CheckResult<()> {
        self.call(
            "screenshot",
            json!({ "path": path.to_string_lossy(), "fullPage": full_page }),
        )
        .await?;
        debug!("Captured screenshot {}", path.display());
        Ok(())
    }
}

/// Request/response plumbing over the driver's stdio
struct DriverIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl DriverIo {
    fn attach(child: &mut Child) -> CheckResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CheckError::Launch("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CheckError::Launch("driver stdout unavailable".to_string()))?;

        Ok(Self {
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 0,
        })
    }

    async fn request(&mut self, op: &str, params: Value) -> CheckResult<Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut request = params;
        request["id"] = json!(id);
        request["op"] = json!(op);

        let mut line = request.to_string();
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply: DriverReply = serde_json::from_value(self.read_message().await?)?;
        if reply.id != id {
            return Err(CheckError::Protocol(format!(
                "reply id {} does not match request id {}",
                reply.id, id
            )));
        }

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(CheckError::PageOperation {
                op: op.to_string(),
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    async fn read_message(&mut self) -> CheckResult<Value> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| CheckError::Protocol("driver exited unexpectedly".to_string()))?;
        Ok(serde_json::from_str(&line)?)
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

const DRIVER_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const config = JSON.parse(process.argv[2]);
const reply = (message) => process.stdout.write(JSON.stringify(message) + '\n');

(async () => {
  const browser = await playwright[config.browser].launch({
    headless: config.headless,
    args: config.args,
  });
  const context = await browser.newContext({ viewport: config.viewport });
  const page = await context.newPage();

  try {
    await page.goto(config.url);
  } catch (error) {
    reply({ ready: false, error: error.message });
    await browser.close();
    process.exit(1);
  }
  reply({ ready: true });

  const ops = {
    hasElement: async ({ selector }) => (await page.$(selector)) !== null,
    getStyle: async ({ selector, properties }) => {
      const element = await page.$(selector);
      if (element === null) {
        return [];
      }
      return element.evaluate((el, props) => {
        const style = window.getComputedStyle(el);
        return props.map((prop) => style.getPropertyValue(prop));
      }, properties);
    },
    viewportGap: async ({ selector }) => page.$eval(
      selector,
      (el) => window.innerHeight - el.clientHeight,
    ),
    emulateColorScheme: async ({ scheme }) => {
      await page.emulateMedia({ colorScheme: scheme });
      return null;
    },
    removeElements: async ({ selector }) => page.$$eval(selector, (els) => {
      els.forEach((el) => el.remove());
      return els.length;
    }),
    scrollToEnd: async () => page.evaluate(() => {
      window.scrollTo(0, Number.MAX_SAFE_INTEGER);
      return null;
    }),
    screenshot: async ({ path, fullPage }) => {
      await page.screenshot({ path, fullPage });
      return path;
    },
    close: async () => {
      await browser.close();
      return null;
    },
  };

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    const request = JSON.parse(line);
    const op = ops[request.op];
    try {
      if (op === undefined) {
        throw new Error(`unknown op ${request.op}`);
      }
      reply({ id: request.id, ok: true, value: await op(request) });
    } catch (error) {
      reply({ id: request.id, ok: false, error: error.message });
    }
    if (request.op === 'close') {
      break;
    }
  }
  await browser.close().catch(() => {});
  process.exit(0);
})().catch((error) => {
  reply({ ready: false, error: error.message });
  process.exit(1);
});
"#;
