use crate::dialect::Dialect;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Declaration form an extraction rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Struct,
    Enum,
    Trait,
    Impl,
    Class,
    Interface,
    Record,
    Object,
    TypeAlias,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Trait => "trait",
            DeclKind::Impl => "impl",
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Record => "record",
            DeclKind::Object => "object",
            DeclKind::TypeAlias => "type",
        }
    }
}

/// One textual pattern; capture group 1 is the declared name.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRule {
    pub kind: DeclKind,
    pub pattern: &'static str,
}

const fn rule(kind: DeclKind, pattern: &'static str) -> ExtractionRule {
    ExtractionRule { kind, pattern }
}

const RUST_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Function, r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Struct, r"\bstruct\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Enum, r"\benum\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Trait, r"\btrait\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Impl, r"\bimpl\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

const PYTHON_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Function, r"\bdef\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Class, r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

const GO_RULES: &[ExtractionRule] = &[
    rule(
        DeclKind::Function,
        r"\bfunc\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\b",
    ),
    rule(DeclKind::Struct, r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)\s+struct\b"),
    rule(
        DeclKind::Interface,
        r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)\s+interface\b",
    ),
    rule(DeclKind::TypeAlias, r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

const JAVA_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Class, r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Interface, r"\binterface\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Enum, r"\benum\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Record, r"\brecord\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

const KOTLIN_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Function, r"\bfun\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Class, r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Interface, r"\binterface\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Object, r"\bobject\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

const CSHARP_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Class, r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Interface, r"\binterface\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Struct, r"\bstruct\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Enum, r"\benum\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(
        DeclKind::Record,
        r"\brecord\s+(?:class\s+|struct\s+)?([A-Za-z_][A-Za-z0-9_]*)\b",
    ),
];

const GENERIC_RULES: &[ExtractionRule] = &[
    rule(DeclKind::Function, r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Class, r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::Interface, r"\binterface\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
    rule(DeclKind::TypeAlias, r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)\b"),
];

/// Ordered rule list for a dialect. Earlier rules win.
pub fn rules_for(dialect: Dialect) -> &'static [ExtractionRule] {
    match dialect {
        Dialect::Rust => RUST_RULES,
        Dialect::Python => PYTHON_RULES,
        Dialect::Go => GO_RULES,
        Dialect::Java => JAVA_RULES,
        Dialect::Kotlin => KOTLIN_RULES,
        Dialect::CSharp => CSHARP_RULES,
        Dialect::Generic => GENERIC_RULES,
    }
}

type CompiledRules = Vec<(DeclKind, Regex)>;

fn compiled_rules(dialect: Dialect) -> &'static [(DeclKind, Regex)] {
    static TABLE: OnceLock<HashMap<Dialect, CompiledRules>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        Dialect::ALL
            .into_iter()
            .map(|d| {
                let compiled: CompiledRules = rules_for(d)
                    .iter()
                    .map(|r| (r.kind, Regex::new(r.pattern).expect("extraction rule pattern")))
                    .collect();
                (d, compiled)
            })
            .collect()
    });
    table.get(&dialect).map(Vec::as_slice).unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
}

/// Finds one representative declaration in a skeleton excerpt of `path`.
pub fn extract_declaration(text: &str, path: &str) -> Option<Declaration> {
    let dialect = Dialect::from_path(path);
    for (kind, re) in compiled_rules(dialect) {
        let name = re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty());
        if let Some(name) = name {
            log::debug!(
                "{} skeleton for {path}: {} `{name}`",
                dialect.as_str(),
                kind.as_str()
            );
            return Some(Declaration {
                kind: *kind,
                name: name.to_string(),
            });
        }
    }
    None
}

/// Name of the declaration [`extract_declaration`] picks, if any.
pub fn extract_symbol(text: &str, path: &str) -> Option<String> {
    extract_declaration(text, path).map(|decl| decl.name)
}
