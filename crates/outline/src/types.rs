use serde::Serialize;

/// A file recovered from an overview report, optionally paired with a symbol.
///
/// `path` is posix-style and relative to whatever root the report was produced
/// for. A present `symbol` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSymbolRef {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl PathSymbolRef {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbol: None,
        }
    }

    /// Pairs `path` with a trimmed symbol; `None` when the symbol is blank.
    pub fn with_symbol(path: impl Into<String>, symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }
        Some(Self {
            path: path.into(),
            symbol: Some(symbol.to_string()),
        })
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }
}
