use std::path::Path;

/// File suffixes the overview report is scanned for.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "ts", "tsx", "js", "jsx", "go", "java", "kt", "cs",
];

/// Source dialect, used to pick a symbol-extraction rule list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Rust,
    Python,
    Go,
    Java,
    Kotlin,
    CSharp,
    /// TypeScript, JavaScript and everything without a dedicated list
    Generic,
}

impl Dialect {
    pub const ALL: [Dialect; 7] = [
        Dialect::Rust,
        Dialect::Python,
        Dialect::Go,
        Dialect::Java,
        Dialect::Kotlin,
        Dialect::CSharp,
        Dialect::Generic,
    ];

    /// Detect dialect from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Dialect::Rust,
            "py" | "pyw" => Dialect::Python,
            "go" => Dialect::Go,
            "java" => Dialect::Java,
            "kt" | "kts" => Dialect::Kotlin,
            "cs" => Dialect::CSharp,
            _ => Dialect::Generic,
        }
    }

    /// Detect dialect from a (posix or native) file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Dialect::Generic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Rust => "rust",
            Dialect::Python => "python",
            Dialect::Go => "go",
            Dialect::Java => "java",
            Dialect::Kotlin => "kotlin",
            Dialect::CSharp => "csharp",
            Dialect::Generic => "generic",
        }
    }
}

/// True when `name` ends in one of [`SOURCE_EXTENSIONS`].
pub fn has_source_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && SOURCE_EXTENSIONS.contains(&ext))
}
