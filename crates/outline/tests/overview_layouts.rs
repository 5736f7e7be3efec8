use cortex_qc_outline::{
    extract_symbol, file_candidates, first_file, first_symbol, qualify_under_target,
    PathSymbolRef,
};
use pretty_assertions::assert_eq;

fn nested_report(depth: usize, file: &str) -> String {
    let mut report = String::new();
    for level in 0..depth {
        report.push_str(&" ".repeat(level * 2));
        report.push_str(&format!("d{level}/   ({} files)\n", depth - level));
    }
    report.push_str(&" ".repeat(depth * 2));
    report.push_str(file);
    report.push('\n');
    report
}

#[test]
fn file_path_uses_exactly_depth_stack_entries() {
    for depth in 1..=8 {
        let report = nested_report(depth, "leaf.rs");
        let expected = (0..depth)
            .map(|level| format!("d{level}"))
            .chain(std::iter::once("leaf.rs".to_string()))
            .collect::<Vec<_>>()
            .join("/");
        assert_eq!(file_candidates(&report), vec![expected], "depth {depth}");
    }
}

#[test]
fn sibling_directories_replace_deeper_entries() {
    let report = "\
src/   (5 files)
  api/
    routes/
      users.ts
    handlers.ts
  ui/
    view.tsx
  index.ts
";
    assert_eq!(
        file_candidates(report),
        vec![
            "src/api/routes/users.ts".to_string(),
            "src/api/handlers.ts".to_string(),
            "src/ui/view.tsx".to_string(),
            "src/index.ts".to_string(),
        ]
    );
}

#[test]
fn deep_layout_headers_rebuild_paths() {
    let report = "\
src/   (3 files)
  main.rs
    [function] main

commands/
  run.rs
    [function] execute
  mod.rs
";
    assert_eq!(
        file_candidates(report),
        vec![
            "src/main.rs".to_string(),
            "commands/run.rs".to_string(),
            "commands/mod.rs".to_string(),
        ]
    );
    assert_eq!(first_file(report).as_deref(), Some("src/main.rs"));
}

#[test]
fn echoed_root_segment_is_never_doubled() {
    let target = "apps/desktop/src";
    let report = "\
src/   (2 files)
  components/
    button.ts
  src/
    nested.ts
";
    for rel in file_candidates(report) {
        let path = qualify_under_target(&rel, target);
        assert!(path.starts_with("apps/desktop/src/"), "{path}");
        assert!(!path.contains("src/src/components"), "{path}");
        assert!(!path.starts_with("apps/desktop/src/src/components"), "{path}");
    }
    assert_eq!(
        qualify_under_target("src/src/nested.ts", target),
        "apps/desktop/src/src/nested.ts"
    );
}

#[test]
fn summary_layout_falls_back_to_slice_extraction() {
    let report = "  components/\n    button.ts\n";
    assert_eq!(first_symbol(report), None);

    let rel = first_file(report).unwrap();
    let path = qualify_under_target(&rel, "apps/desktop/src");
    assert_eq!(path, "apps/desktop/src/components/button.ts");

    let slice = "<file path=\"button.ts\">\nexport function Button(props: ButtonProps) {}\n</file>";
    assert_eq!(extract_symbol(slice, &path).as_deref(), Some("Button"));
}

#[test]
fn deep_layout_yields_path_and_symbol() {
    let report = "\
src/   (2 files)
  README.md
  lib.rs
    [struct  ] Engine
    [function] start
";
    assert_eq!(
        first_symbol(report),
        PathSymbolRef::with_symbol("src/lib.rs", "Engine")
    );
}

#[test]
fn extraction_is_deterministic() {
    let samples = [
        ("fn a() {}\nstruct B;", "x.rs"),
        ("class K:\n  pass", "k.py"),
        ("interface Props {}\nclass View {}", "view.tsx"),
        ("nothing to see", "n.go"),
    ];
    for (text, path) in samples {
        assert_eq!(extract_symbol(text, path), extract_symbol(text, path));
    }
}
