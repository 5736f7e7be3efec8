//! Fixed catalogue of tool-server operations exercised by the sweep.

use serde_json::{json, Map, Value};

/// Tool groups the server must advertise in `tools/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    CodeExplorer,
    SymbolAnalyzer,
    Chronos,
    Diagnostics,
}

impl ToolGroup {
    pub const REQUIRED: [ToolGroup; 4] = [
        ToolGroup::CodeExplorer,
        ToolGroup::SymbolAnalyzer,
        ToolGroup::Chronos,
        ToolGroup::Diagnostics,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ToolGroup::CodeExplorer => "cortex_code_explorer",
            ToolGroup::SymbolAnalyzer => "cortex_symbol_analyzer",
            ToolGroup::Chronos => "cortex_chronos",
            ToolGroup::Diagnostics => "run_diagnostics",
        }
    }

    /// First required group absent from `advertised`, in catalogue order.
    pub fn first_missing<S: AsRef<str>>(advertised: &[S]) -> Option<ToolGroup> {
        Self::REQUIRED
            .into_iter()
            .find(|group| !advertised.iter().any(|name| name.as_ref() == group.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MapOverview,
    DeepSlice,
    ReadSource,
    FindUsages,
    BlastRadius,
    PropagationChecklist,
    SaveCheckpoint,
    ListCheckpoints,
    CompareCheckpoint,
    DeleteCheckpoint,
    RunDiagnostics,
}

impl Operation {
    pub const fn group(self) -> ToolGroup {
        match self {
            Operation::MapOverview | Operation::DeepSlice => ToolGroup::CodeExplorer,
            Operation::ReadSource
            | Operation::FindUsages
            | Operation::BlastRadius
            | Operation::PropagationChecklist => ToolGroup::SymbolAnalyzer,
            Operation::SaveCheckpoint
            | Operation::ListCheckpoints
            | Operation::CompareCheckpoint
            | Operation::DeleteCheckpoint => ToolGroup::Chronos,
            Operation::RunDiagnostics => ToolGroup::Diagnostics,
        }
    }

    /// `action` argument value; `run_diagnostics` is a standalone tool and takes none.
    pub const fn action(self) -> Option<&'static str> {
        match self {
            Operation::MapOverview => Some("map_overview"),
            Operation::DeepSlice => Some("deep_slice"),
            Operation::ReadSource => Some("read_source"),
            Operation::FindUsages => Some("find_usages"),
            Operation::BlastRadius => Some("blast_radius"),
            Operation::PropagationChecklist => Some("propagation_checklist"),
            Operation::SaveCheckpoint => Some("save_checkpoint"),
            Operation::ListCheckpoints => Some("list_checkpoints"),
            Operation::CompareCheckpoint => Some("compare_checkpoint"),
            Operation::DeleteCheckpoint => Some("delete_checkpoint"),
            Operation::RunDiagnostics => None,
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        const ALL: [Operation; 10] = [
            Operation::MapOverview,
            Operation::DeepSlice,
            Operation::ReadSource,
            Operation::FindUsages,
            Operation::BlastRadius,
            Operation::PropagationChecklist,
            Operation::SaveCheckpoint,
            Operation::ListCheckpoints,
            Operation::CompareCheckpoint,
            Operation::DeleteCheckpoint,
        ];
        ALL.into_iter().find(|op| op.action() == Some(action))
    }

    pub fn label(self) -> String {
        match self.action() {
            Some(action) => format!("{}(action={action})", self.group().name()),
            None => self.group().name().to_string(),
        }
    }
}

/// A fully-argumented `tools/call` ready to hand to the invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCall {
    pub operation: Operation,
    pub arguments: Value,
}

impl OperationCall {
    fn build(operation: Operation, repo: &str, extra: Value) -> Self {
        let mut args = Map::new();
        args.insert("repoPath".to_string(), Value::String(repo.to_string()));
        if let Some(action) = operation.action() {
            args.insert("action".to_string(), Value::String(action.to_string()));
        }
        if let Value::Object(extra) = extra {
            args.extend(extra);
        }
        Self {
            operation,
            arguments: Value::Object(args),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        self.operation.group().name()
    }

    pub fn map_overview(repo: &str, target_dir: &str) -> Self {
        Self::build(Operation::MapOverview, repo, json!({ "target_dir": target_dir }))
    }

    pub fn deep_slice(repo: &str, target: &str, budget_tokens: u32) -> Self {
        Self::build(
            Operation::DeepSlice,
            repo,
            json!({ "target": target, "budget_tokens": budget_tokens }),
        )
    }

    pub fn read_source(repo: &str, path: &str, symbol: &str) -> Self {
        Self::build(
            Operation::ReadSource,
            repo,
            json!({ "path": path, "symbol_name": symbol }),
        )
    }

    pub fn read_source_batch(repo: &str, path: &str, symbols: &[&str]) -> Self {
        Self::build(
            Operation::ReadSource,
            repo,
            json!({ "path": path, "symbol_names": symbols }),
        )
    }

    pub fn find_usages(repo: &str, target_dir: &str, symbol: &str) -> Self {
        Self::symbol_report(Operation::FindUsages, repo, target_dir, symbol)
    }

    pub fn blast_radius(repo: &str, target_dir: &str, symbol: &str) -> Self {
        Self::symbol_report(Operation::BlastRadius, repo, target_dir, symbol)
    }

    pub fn propagation_checklist(repo: &str, target_dir: &str, symbol: &str) -> Self {
        Self::symbol_report(Operation::PropagationChecklist, repo, target_dir, symbol)
    }

    fn symbol_report(op: Operation, repo: &str, target_dir: &str, symbol: &str) -> Self {
        Self::build(
            op,
            repo,
            json!({ "target_dir": target_dir, "symbol_name": symbol }),
        )
    }

    pub fn save_checkpoint(repo: &str, path: &str, symbol: &str, tag: &str) -> Self {
        Self::build(
            Operation::SaveCheckpoint,
            repo,
            json!({ "path": path, "symbol_name": symbol, "semantic_tag": tag }),
        )
    }

    pub fn list_checkpoints(repo: &str) -> Self {
        Self::build(Operation::ListCheckpoints, repo, Value::Null)
    }

    pub fn compare_checkpoint(
        repo: &str,
        symbol: &str,
        tag_a: &str,
        tag_b: &str,
        path: &str,
    ) -> Self {
        Self::build(
            Operation::CompareCheckpoint,
            repo,
            json!({ "symbol_name": symbol, "tag_a": tag_a, "tag_b": tag_b, "path": path }),
        )
    }

    pub fn delete_checkpoint(repo: &str, symbol: &str, tag: &str) -> Self {
        Self::build(
            Operation::DeleteCheckpoint,
            repo,
            json!({ "symbol_name": symbol, "semantic_tag": tag }),
        )
    }

    pub fn run_diagnostics(repo: &str) -> Self {
        Self::build(Operation::RunDiagnostics, repo, Value::Null)
    }
}
