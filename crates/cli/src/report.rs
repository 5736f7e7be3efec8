use cortex_qc_outline::PathSymbolRef;
use cortex_qc_protocol::{OperationCall, ToolCallResult};
use serde::Serialize;
use std::io::{self, Write};

const BANNER_WIDTH: usize = 72;

pub fn render_banner(title: &str) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("\n{rule}\n{title}\n{rule}\n")
}

/// Status tag plus at most `max_lines` lines of the payload.
pub fn render_preview(result: &ToolCallResult, max_lines: usize) -> String {
    let status = if result.is_error { "ERROR" } else { "OK" };
    let mut out = format!("[{status}]\n");
    let lines: Vec<&str> = result.text.lines().collect();
    for line in lines.iter().take(max_lines) {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    if lines.len() > max_lines {
        out.push_str(&format!("  ... ({} more lines)\n", lines.len() - max_lines));
    }
    out
}

/// Human-facing output. Writes to stdout normally, stderr in `--json` mode.
pub struct Console {
    out: Box<dyn Write + Send>,
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    pub fn silent() -> Self {
        Self::new(Box::new(io::sink()))
    }

    pub fn header(&mut self, title: &str) {
        self.emit(&render_banner(title));
    }

    pub fn show(&mut self, result: &ToolCallResult, max_lines: usize) {
        self.emit(&render_preview(result, max_lines));
    }

    pub fn line(&mut self, text: &str) {
        self.emit(text);
        self.emit("\n");
    }

    fn emit(&mut self, text: &str) {
        // A closed pipe (`cortex-qc | head`) must not abort the sweep.
        if let Err(err) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            if err.kind() != io::ErrorKind::BrokenPipe {
                log::warn!("console write failed: {err}");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub ok: bool,
    pub fatal: bool,
    pub lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepRecord {
    pub fn from_call(
        title: &str,
        call: &OperationCall,
        result: &ToolCallResult,
        fatal: bool,
    ) -> Self {
        Self {
            title: title.to_string(),
            tool: Some(call.tool_name().to_string()),
            action: call.operation.action().map(str::to_string),
            ok: !result.is_error,
            fatal,
            lines: result.line_count(),
            note: None,
        }
    }

    /// A local check (capability list, discovery) rather than a tool call.
    pub fn check(title: &str, ok: bool, fatal: bool, note: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            tool: None,
            action: None,
            ok,
            fatal,
            lines: 0,
            note: Some(note.into()),
        }
    }
}

/// Everything one sweep observed, in step order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked: Option<PathSymbolRef>,
    pub exit_code: u8,
}

impl SweepReport {
    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} step(s), {} ok, {} error(s), exit code {}",
            self.steps.len(),
            self.steps.len() - self.failures(),
            self.failures(),
            self.exit_code
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
