//! # Overview outline recovery
//!
//! Recovers machine-usable file paths and symbol names from the indented,
//! human-oriented reports an analysis server prints.
//!
//! ```text
//! overview report
//!     │
//!     ├──> tree::first_symbol      (deep layout: file + first symbol)
//!     │
//!     └──> tree::first_file        (summary layout: path only)
//!              │
//!              └──> skeleton::extract_symbol   (per-dialect rule cascade
//!                                               over a sliced excerpt)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cortex_qc_outline::{extract_symbol, first_file, qualify_under_target};
//!
//! let report = "  components/\n    button.ts\n";
//! let rel = first_file(report).unwrap();
//! let path = qualify_under_target(&rel, "apps/desktop/src");
//! assert_eq!(path, "apps/desktop/src/components/button.ts");
//!
//! let skeleton = "export function Button(props) {}";
//! assert_eq!(extract_symbol(skeleton, &path).as_deref(), Some("Button"));
//! ```

mod dialect;
mod skeleton;
mod tree;
mod types;

pub use dialect::{has_source_extension, Dialect, SOURCE_EXTENSIONS};
pub use skeleton::{
    extract_declaration, extract_symbol, rules_for, DeclKind, Declaration, ExtractionRule,
};
pub use tree::{
    file_candidates, first_file, first_symbol, pick_candidate, qualify_under_target, DepthStack,
    ENTRYPOINT_SUFFIXES, INDENT_UNIT,
};
pub use types::PathSymbolRef;
