//! The QC sweep: a fixed sequence of tool calls with per-step fatal policy.

use crate::channel::Transport;
use crate::error::Result;
use crate::invoker::ToolInvoker;
use crate::report::{Console, StepRecord, SweepReport};
use cortex_qc_outline::{
    extract_symbol, first_file, first_symbol, qualify_under_target, PathSymbolRef,
};
use cortex_qc_protocol::{OperationCall, ToolCallResult, ToolGroup};
use serde::Serialize;
use std::ops::ControlFlow;
use std::time::{SystemTime, UNIX_EPOCH};

/// Token budget for the slice used to discover a symbol.
pub const DISCOVERY_BUDGET_TOKENS: u32 = 32_000;
/// Token budget for the regular slice check.
pub const SLICE_BUDGET_TOKENS: u32 = 8_000;
/// Scope handed to the usage/impact analyses.
pub const ANALYSIS_SCOPE: &str = ".";
/// Tag that no sweep ever saves, for the negative compare.
pub const BOGUS_TAG: &str = "definitely-not-a-real-tag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepExit {
    Completed,
    BinaryNotFound,
    MissingTool,
    OverviewFailed,
    NoFilePath,
    SliceFailed,
    NoSymbol,
}

impl SweepExit {
    pub const fn code(self) -> u8 {
        match self {
            SweepExit::Completed => 0,
            SweepExit::BinaryNotFound => 2,
            SweepExit::MissingTool => 3,
            SweepExit::OverviewFailed => 4,
            SweepExit::NoFilePath => 5,
            SweepExit::SliceFailed => 6,
            SweepExit::NoSymbol => 7,
        }
    }
}

impl From<SweepExit> for std::process::ExitCode {
    fn from(exit: SweepExit) -> Self {
        std::process::ExitCode::from(exit.code())
    }
}

/// What a failed step does to the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Fatal(SweepExit),
    BestEffort,
}

impl StepPolicy {
    pub fn verdict(self, result: &ToolCallResult) -> Option<SweepExit> {
        match self {
            StepPolicy::Fatal(exit) if result.is_error => Some(exit),
            StepPolicy::Fatal(_) | StepPolicy::BestEffort => None,
        }
    }
}

/// The two checkpoint tags one sweep creates and deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTags {
    pub a: String,
    pub b: String,
}

impl CheckpointTags {
    pub fn generate() -> Self {
        Self::at(SystemTime::now(), std::process::id())
    }

    /// Second-resolution timestamp plus pid, so concurrent sweeps on one
    /// host do not collide.
    pub fn at(now: SystemTime, pid: u32) -> Self {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            a: format!("qc-a-{secs}-{pid}"),
            b: format!("qc-b-{secs}-{pid}"),
        }
    }
}

/// Repository and directory the sweep points the server at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTarget {
    pub repo: String,
    pub target_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Picked {
    path: String,
    symbol: String,
}

struct StepOutcome {
    result: ToolCallResult,
    abort: Option<SweepExit>,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub exit: SweepExit,
    pub report: SweepReport,
}

pub struct ScenarioRunner<T> {
    invoker: ToolInvoker<T>,
    target: SweepTarget,
    console: Console,
    tags: CheckpointTags,
    report: SweepReport,
}

impl<T: Transport> ScenarioRunner<T> {
    pub fn new(invoker: ToolInvoker<T>, target: SweepTarget, console: Console) -> Self {
        Self {
            invoker,
            target,
            console,
            tags: CheckpointTags::generate(),
            report: SweepReport::default(),
        }
    }

    pub fn with_tags(mut self, tags: CheckpointTags) -> Self {
        self.tags = tags;
        self
    }

    /// Runs every step in order. `Err` means the transport failed and the
    /// sweep was cut short; fatal gates come back as a non-zero [`SweepExit`].
    pub async fn run(mut self) -> Result<SweepOutcome> {
        let exit = self.sweep().await?;
        self.report.exit_code = exit.code();
        log::info!("sweep finished: {}", self.report.summary_line());
        Ok(SweepOutcome {
            exit,
            report: self.report,
        })
    }

    async fn sweep(&mut self) -> Result<SweepExit> {
        if let Some(exit) = self.check_capabilities().await? {
            return Ok(exit);
        }

        let call = OperationCall::map_overview(&self.target.repo, &self.target.target_dir);
        let title = format!("{} - {}", call.operation.label(), self.target.target_dir);
        let overview = self
            .step(&title, call, 60, StepPolicy::Fatal(SweepExit::OverviewFailed))
            .await?;
        if let Some(exit) = overview.abort {
            self.console.line("Cannot continue QC without a repo map.");
            return Ok(exit);
        }

        let picked = match self.discover(&overview.result.text).await? {
            ControlFlow::Continue(picked) => picked,
            ControlFlow::Break(exit) => return Ok(exit),
        };
        self.console.line(&format!(
            "\nPicked symbol for QC: symbol_name='{}' in path='{}'",
            picked.symbol, picked.path
        ));
        self.report.picked = PathSymbolRef::with_symbol(picked.path.clone(), &picked.symbol);

        self.exercise(&picked).await?;

        self.console.line("\nQC sweep complete.");
        Ok(SweepExit::Completed)
    }

    async fn check_capabilities(&mut self) -> Result<Option<SweepExit>> {
        self.console.header("TOOLS/LIST (schema sanity)");
        let names = self.invoker.list_tools().await?;
        self.console.line(&format!("Tools: {}", names.join(", ")));

        match ToolGroup::first_missing(&names) {
            Some(group) => {
                let note = format!("missing tool in tools/list: {}", group.name());
                self.console.line(&format!("ERROR: {note}"));
                self.report
                    .record(StepRecord::check("tools/list", false, true, note));
                Ok(Some(SweepExit::MissingTool))
            }
            None => {
                self.report.record(StepRecord::check(
                    "tools/list",
                    true,
                    false,
                    format!("{} tools advertised", names.len()),
                ));
                Ok(None)
            }
        }
    }

    /// Deep layout first; otherwise rebuild a file path, slice it, and read a
    /// declaration out of the skeleton.
    async fn discover(&mut self, overview: &str) -> Result<ControlFlow<SweepExit, Picked>> {
        if let Some(found) = first_symbol(overview) {
            if let Some(symbol) = found.symbol {
                let path = qualify_under_target(&found.path, &self.target.target_dir);
                self.report.record(StepRecord::check(
                    "symbol discovery",
                    true,
                    false,
                    "symbol listed in overview",
                ));
                return Ok(ControlFlow::Continue(Picked { path, symbol }));
            }
        }

        let Some(rel) = first_file(overview) else {
            self.console
                .line("ERROR: could not extract a file path from map_overview output");
            self.report.record(StepRecord::check(
                "symbol discovery",
                false,
                true,
                "no file path in overview",
            ));
            return Ok(ControlFlow::Break(SweepExit::NoFilePath));
        };
        let path = qualify_under_target(&rel, &self.target.target_dir);
        log::info!("overview lists no symbols; falling back to a slice of {path}");

        let call = OperationCall::deep_slice(&self.target.repo, &path, DISCOVERY_BUDGET_TOKENS);
        let slice = self
            .step(
                "Fallback: deep_slice picked file to discover a real symbol",
                call,
                40,
                StepPolicy::Fatal(SweepExit::SliceFailed),
            )
            .await?;
        if let Some(exit) = slice.abort {
            self.console
                .line("ERROR: deep_slice failed; cannot auto-discover symbol");
            return Ok(ControlFlow::Break(exit));
        }

        let Some(symbol) = extract_symbol(&slice.result.text, &path) else {
            self.console
                .line("ERROR: could not extract a symbol name from deep_slice output");
            self.report.record(StepRecord::check(
                "symbol discovery",
                false,
                true,
                format!("no declaration found in slice of {path}"),
            ));
            return Ok(ControlFlow::Break(SweepExit::NoSymbol));
        };
        self.report.record(StepRecord::check(
            "symbol discovery",
            true,
            false,
            "symbol read from slice",
        ));
        Ok(ControlFlow::Continue(Picked { path, symbol }))
    }

    /// Every remaining operation. Failures are shown and recorded only.
    async fn exercise(&mut self, picked: &Picked) -> Result<()> {
        let repo = self.target.repo.clone();
        let path = picked.path.as_str();
        let symbol = picked.symbol.as_str();
        let tags = self.tags.clone();

        self.best_effort(
            "cortex_code_explorer(action=deep_slice) - slice the picked file",
            OperationCall::deep_slice(&repo, path, SLICE_BUDGET_TOKENS),
            40,
        )
        .await?;

        self.best_effort(
            "cortex_symbol_analyzer(action=read_source) - picked symbol",
            OperationCall::read_source(&repo, path, symbol),
            60,
        )
        .await?;
        self.best_effort(
            "cortex_symbol_analyzer(action=read_source) - batch mode symbol_names",
            OperationCall::read_source_batch(&repo, path, &[symbol]),
            40,
        )
        .await?;
        self.best_effort(
            "cortex_symbol_analyzer(action=find_usages) - picked symbol",
            OperationCall::find_usages(&repo, ANALYSIS_SCOPE, symbol),
            60,
        )
        .await?;
        self.best_effort(
            "cortex_symbol_analyzer(action=blast_radius) - picked symbol",
            OperationCall::blast_radius(&repo, ANALYSIS_SCOPE, symbol),
            60,
        )
        .await?;
        self.best_effort(
            "cortex_symbol_analyzer(action=propagation_checklist) - picked symbol",
            OperationCall::propagation_checklist(&repo, ANALYSIS_SCOPE, symbol),
            60,
        )
        .await?;

        self.best_effort(
            "cortex_chronos(action=save_checkpoint) - tag A",
            OperationCall::save_checkpoint(&repo, path, symbol, &tags.a),
            20,
        )
        .await?;
        self.best_effort(
            "cortex_chronos(action=save_checkpoint) - tag B",
            OperationCall::save_checkpoint(&repo, path, symbol, &tags.b),
            20,
        )
        .await?;
        self.best_effort(
            "cortex_chronos(action=list_checkpoints)",
            OperationCall::list_checkpoints(&repo),
            80,
        )
        .await?;
        self.best_effort(
            "cortex_chronos(action=compare_checkpoint) - tag A vs tag B",
            OperationCall::compare_checkpoint(&repo, symbol, &tags.a, &tags.b, path),
            80,
        )
        .await?;
        let negative = self
            .best_effort(
                "cortex_chronos(action=compare_checkpoint) - NEGATIVE TEST (wrong tag)",
                OperationCall::compare_checkpoint(&repo, symbol, BOGUS_TAG, &tags.b, path),
                40,
            )
            .await?;
        if !negative.is_error {
            log::warn!("compare against `{BOGUS_TAG}` did not report an error");
        }

        // Cleanup runs whatever the compares returned.
        self.best_effort(
            "cortex_chronos(action=delete_checkpoint) - cleanup tag A",
            OperationCall::delete_checkpoint(&repo, symbol, &tags.a),
            20,
        )
        .await?;
        self.best_effort(
            "cortex_chronos(action=delete_checkpoint) - cleanup tag B",
            OperationCall::delete_checkpoint(&repo, symbol, &tags.b),
            20,
        )
        .await?;

        self.best_effort(
            "run_diagnostics - repo root (may return compile errors depending on repo state)",
            OperationCall::run_diagnostics(&repo),
            60,
        )
        .await?;
        Ok(())
    }

    async fn best_effort(
        &mut self,
        title: &str,
        call: OperationCall,
        preview: usize,
    ) -> Result<ToolCallResult> {
        let outcome = self.step(title, call, preview, StepPolicy::BestEffort).await?;
        Ok(outcome.result)
    }

    async fn step(
        &mut self,
        title: &str,
        call: OperationCall,
        preview: usize,
        policy: StepPolicy,
    ) -> Result<StepOutcome> {
        self.console.header(title);
        let result = self.invoker.invoke(&call).await?;
        self.console.show(&result, preview);

        let abort = policy.verdict(&result);
        if result.is_error {
            log::warn!("{}: tool reported an error", call.operation.label());
        }
        self.report
            .record(StepRecord::from_call(title, &call, &result, abort.is_some()));
        Ok(StepOutcome { result, abort })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use crate::test_support::FakeServer;
    use async_trait::async_trait;
    use cortex_qc_protocol::{Message, Reply};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn target() -> SweepTarget {
        SweepTarget {
            repo: "/work/dataset-mixer".to_string(),
            target_dir: "apps/desktop/src".to_string(),
        }
    }

    fn tags() -> CheckpointTags {
        CheckpointTags {
            a: "qc-a-test".to_string(),
            b: "qc-b-test".to_string(),
        }
    }

    async fn sweep(server: &FakeServer) -> SweepOutcome {
        ScenarioRunner::new(ToolInvoker::new(server), target(), Console::silent())
            .with_tags(tags())
            .run()
            .await
            .unwrap()
    }

    const DEEP_OVERVIEW: &str = "\
src/   (2 files)
  main.tsx
    [function] bootstrap

components/
  button.ts
    [class   ] Button
";

    const FULL_SEQUENCE: [&str; 14] = [
        "map_overview",
        "deep_slice",
        "read_source",
        "read_source",
        "find_usages",
        "blast_radius",
        "propagation_checklist",
        "save_checkpoint",
        "save_checkpoint",
        "list_checkpoints",
        "compare_checkpoint",
        "compare_checkpoint",
        "delete_checkpoint",
        "delete_checkpoint",
    ];

    #[tokio::test]
    async fn deep_overview_runs_every_step() {
        let server = FakeServer::new().with_overview(DEEP_OVERVIEW);
        let outcome = sweep(&server).await;

        assert_eq!(outcome.exit, SweepExit::Completed);
        assert_eq!(
            outcome.report.picked,
            PathSymbolRef::with_symbol("apps/desktop/src/main.tsx", "bootstrap")
        );

        let mut expected: Vec<&str> = FULL_SEQUENCE.to_vec();
        expected.push("run_diagnostics");
        assert_eq!(server.actions(), expected);
        assert_eq!(server.list_calls(), 1);

        let calls = server.calls();
        assert_eq!(calls[1].1["budget_tokens"], SLICE_BUDGET_TOKENS);
        assert_eq!(calls[3].1["symbol_names"], serde_json::json!(["bootstrap"]));
        assert_eq!(calls[4].1["target_dir"], ANALYSIS_SCOPE);
    }

    #[tokio::test]
    async fn checkpoint_round_trip_and_cleanup() {
        let server = FakeServer::new().with_overview(DEEP_OVERVIEW);
        let outcome = sweep(&server).await;

        let compares: Vec<&StepRecord> = outcome
            .report
            .steps
            .iter()
            .filter(|s| s.action.as_deref() == Some("compare_checkpoint"))
            .collect();
        assert_eq!(compares.len(), 2);
        assert!(compares[0].ok, "A vs B should compare cleanly");
        assert!(!compares[1].ok, "bogus tag should be reported");
        assert!(!compares[1].fatal);

        assert!(server.saved_tags().is_empty(), "both tags deleted");
        assert_eq!(outcome.exit, SweepExit::Completed);
    }

    #[tokio::test]
    async fn summary_overview_falls_back_to_slice() {
        let server = FakeServer::new()
            .with_overview("  components/\n    button.ts\n")
            .with_slice("export function Button(props: ButtonProps) {\n  return null;\n}\n");
        let outcome = sweep(&server).await;

        assert_eq!(outcome.exit, SweepExit::Completed);
        assert_eq!(
            outcome.report.picked,
            PathSymbolRef::with_symbol("apps/desktop/src/components/button.ts", "Button")
        );

        let calls = server.calls();
        assert_eq!(calls[1].1["action"], "deep_slice");
        assert_eq!(calls[1].1["target"], "apps/desktop/src/components/button.ts");
        assert_eq!(calls[1].1["budget_tokens"], DISCOVERY_BUDGET_TOKENS);
        assert_eq!(calls[2].1["budget_tokens"], SLICE_BUDGET_TOKENS);
        assert_eq!(calls[3].1["symbol_name"], "Button");
        assert_eq!(server.actions().len(), FULL_SEQUENCE.len() + 2);
    }

    #[tokio::test]
    async fn missing_tool_stops_before_any_call() {
        let server = FakeServer::new().with_tools(&[
            "cortex_code_explorer",
            "cortex_symbol_analyzer",
            "cortex_chronos",
        ]);
        let outcome = sweep(&server).await;

        assert_eq!(outcome.exit, SweepExit::MissingTool);
        assert_eq!(outcome.exit.code(), 3);
        assert!(server.calls().is_empty());
        assert_eq!(server.list_calls(), 1);
        assert_eq!(outcome.report.exit_code, 3);
    }

    #[tokio::test]
    async fn overview_error_is_fatal() {
        let server = FakeServer::new().failing("map_overview");
        let outcome = sweep(&server).await;
        assert_eq!(outcome.exit, SweepExit::OverviewFailed);
        assert_eq!(server.actions(), vec!["map_overview"]);
        assert!(outcome.report.steps[1].fatal);
    }

    #[tokio::test]
    async fn overview_without_files_is_fatal() {
        let server = FakeServer::new().with_overview("src/   (0 files)\n");
        let outcome = sweep(&server).await;
        assert_eq!(outcome.exit, SweepExit::NoFilePath);
        assert_eq!(server.actions(), vec!["map_overview"]);
    }

    #[tokio::test]
    async fn fallback_slice_error_is_fatal() {
        let server = FakeServer::new()
            .with_overview("  lib/\n    util.py\n")
            .failing("deep_slice");
        let outcome = sweep(&server).await;
        assert_eq!(outcome.exit, SweepExit::SliceFailed);
        assert_eq!(server.actions(), vec!["map_overview", "deep_slice"]);
    }

    #[tokio::test]
    async fn slice_without_declarations_is_fatal() {
        let server = FakeServer::new()
            .with_overview("  lib/\n    util.py\n")
            .with_slice("# nothing but comments\n");
        let outcome = sweep(&server).await;
        assert_eq!(outcome.exit, SweepExit::NoSymbol);
        assert_eq!(outcome.exit.code(), 7);
    }

    #[tokio::test]
    async fn best_effort_failures_do_not_stop_the_sweep() {
        let server = FakeServer::new()
            .with_overview(DEEP_OVERVIEW)
            .failing("find_usages")
            .failing("blast_radius")
            .failing("list_checkpoints");
        let outcome = sweep(&server).await;

        assert_eq!(outcome.exit, SweepExit::Completed);
        assert_eq!(server.actions().last().copied(), Some("run_diagnostics"));
        // three forced failures plus the negative compare
        assert_eq!(outcome.report.failures(), 4);
        assert!(outcome.report.steps.iter().all(|s| !s.fatal));
    }

    #[tokio::test]
    async fn cleanup_of_unknown_tags_is_not_fatal() {
        let server = FakeServer::new()
            .with_overview(DEEP_OVERVIEW)
            .forgetting_saves();
        let outcome = sweep(&server).await;

        assert_eq!(outcome.exit, SweepExit::Completed);
        let deletes: Vec<&StepRecord> = outcome
            .report
            .steps
            .iter()
            .filter(|s| s.action.as_deref() == Some("delete_checkpoint"))
            .collect();
        assert_eq!(deletes.len(), 2);
        assert!(deletes.iter().all(|s| !s.ok && !s.fatal));
    }

    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn exchange(&self, _batch: &[Message]) -> Result<Vec<Reply>> {
            Err(ChannelError::Timeout {
                after: Duration::from_secs(120),
            })
        }
    }

    #[tokio::test]
    async fn transport_timeout_ends_the_run() {
        let runner = ScenarioRunner::new(ToolInvoker::new(Stalled), target(), Console::silent());
        let err = runner.run().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn tags_embed_timestamp_and_pid() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let tags = CheckpointTags::at(now, 4242);
        assert_eq!(tags.a, "qc-a-1700000000-4242");
        assert_eq!(tags.b, "qc-b-1700000000-4242");
        assert_ne!(tags.a, tags.b);
    }

    #[test]
    fn only_fatal_policy_aborts() {
        let failed = ToolCallResult {
            is_error: true,
            text: String::new(),
            raw: serde_json::Value::Null,
        };
        let passed = ToolCallResult {
            is_error: false,
            ..failed.clone()
        };
        assert_eq!(
            StepPolicy::Fatal(SweepExit::SliceFailed).verdict(&failed),
            Some(SweepExit::SliceFailed)
        );
        assert_eq!(StepPolicy::Fatal(SweepExit::SliceFailed).verdict(&passed), None);
        assert_eq!(StepPolicy::BestEffort.verdict(&failed), None);
    }

    #[test]
    fn exit_codes_are_stable() {
        let codes: Vec<u8> = [
            SweepExit::Completed,
            SweepExit::BinaryNotFound,
            SweepExit::MissingTool,
            SweepExit::OverviewFailed,
            SweepExit::NoFilePath,
            SweepExit::SliceFailed,
            SweepExit::NoSymbol,
        ]
        .into_iter()
        .map(SweepExit::code)
        .collect();
        assert_eq!(codes, vec![0, 2, 3, 4, 5, 6, 7]);
    }
}
