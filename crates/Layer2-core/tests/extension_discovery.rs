//! 확장 발견 → 레지스트리 등록 통합 테스트

use loom_core::{ExtensionDiscovery, ResolvedAction, ToolRegistry};
use loom_foundation::{Action, SecurityLevel, ToolSource};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_extension(root: &Path, dir: &str, tag: &str, tools: &[(&str, &str)]) {
    let ext_dir = root.join(dir);
    fs::create_dir_all(&ext_dir).unwrap();

    let files: Vec<String> = tools.iter().map(|(file, _)| format!("\"{}\"", file)).collect();
    fs::write(
        ext_dir.join("manifest.json"),
        format!(
            r#"{{"metadata": {{"tag": "{}", "description": "test pack"}}, "tools": [{}]}}"#,
            tag,
            files.join(", ")
        ),
    )
    .unwrap();

    for (file, body) in tools {
        fs::write(ext_dir.join(file), body).unwrap();
    }
}

#[tokio::test]
async fn test_discovers_and_registers_namespaced_tools() {
    let temp = TempDir::new().unwrap();
    let ext_root = temp.path().join("exts");
    write_extension(
        &ext_root,
        "search",
        "search",
        &[
            (
                "code.json",
                r#"{"name": "search_code", "label": "Search Code", "description": "Find code",
                    "security_level": "safe", "primary_param": "query", "command": ["cat"]}"#,
            ),
            (
                "wipe.json",
                r#"{"name": "wipe_index", "description": "Drop the index",
                    "security_level": "unsafe", "command": ["true"]}"#,
            ),
            ("broken.json", "{ not json"),
            (
                "clash.json",
                r#"{"name": "run_command", "description": "shadow", "command": ["true"]}"#,
            ),
        ],
    );

    let discovery = ExtensionDiscovery::with_paths(vec![ext_root]);
    let mut registry = ToolRegistry::with_builtins();
    let reports = discovery.load_into(&mut registry, false).await;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.namespace, "search");
    assert_eq!(report.registered, vec!["search_code".to_string()]);
    assert_eq!(report.skipped_unsafe, vec!["wipe_index".to_string()]);
    assert_eq!(report.failed, vec!["run_command".to_string()]);

    assert!(registry.contains("search_code"));
    assert!(!registry.contains("wipe_index"));
    assert_eq!(
        registry.source("search_code"),
        Some(&ToolSource::Extension {
            namespace: "search".into()
        })
    );
    assert_eq!(
        registry.meta("run_command").map(|m| m.security_level),
        Some(SecurityLevel::Approval)
    );

    let section = registry.generate_prompt_section();
    assert!(section.contains("search_code"));

    let action = Action::new("search_code").with_param("query", "x");
    assert!(matches!(
        registry.resolve(&action).unwrap(),
        ResolvedAction::Tool { .. }
    ));
}

#[tokio::test]
async fn test_unsafe_tools_registered_in_unsafe_mode() {
    let temp = TempDir::new().unwrap();
    write_extension(
        temp.path(),
        "ops",
        "ops",
        &[(
            "wipe.json",
            r#"{"name": "wipe_index", "security_level": "unsafe", "command": ["true"]}"#,
        )],
    );

    let discovery = ExtensionDiscovery::with_paths(vec![temp.path().to_path_buf()]);
    let mut registry = ToolRegistry::new();
    discovery.load_into(&mut registry, true).await;

    assert_eq!(
        registry.meta("wipe_index").map(|m| m.security_level),
        Some(SecurityLevel::Unsafe)
    );
}

#[tokio::test]
async fn test_conflicting_namespaces_keep_first() {
    let temp = TempDir::new().unwrap();
    let tool = r#"{"name": "lookup", "command": ["true"]}"#;
    write_extension(temp.path(), "a_pack", "alpha", &[("t.json", tool)]);
    write_extension(temp.path(), "b_pack", "beta", &[("t.json", tool)]);

    let discovery = ExtensionDiscovery::with_paths(vec![temp.path().to_path_buf()]);
    let mut registry = ToolRegistry::new();
    let reports = discovery.load_into(&mut registry, false).await;

    assert_eq!(reports[0].registered, vec!["lookup".to_string()]);
    assert_eq!(reports[1].failed, vec!["lookup".to_string()]);
    assert_eq!(registry.namespace_tools("alpha"), &["lookup".to_string()]);
}

#[tokio::test]
async fn test_missing_directories_are_ignored() {
    let temp = TempDir::new().unwrap();
    let discovery = ExtensionDiscovery::with_paths(vec![temp.path().join("nope")]);
    assert!(discovery.discover().await.is_empty());
}
