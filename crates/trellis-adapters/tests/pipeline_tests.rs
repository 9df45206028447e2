//! Built-in plugins and adapters driven through the orchestrator.

use pretty_assertions::assert_eq;
use trellis_adapters::{
    InMemoryFetcher, JsonSchemaValidator, MemoryFilesystem, ScriptedPrompter,
    ShellCommandRunner, SimpleRenderer, builtin_registry,
};
use trellis_core::application::ApplicationError;
use trellis_core::prelude::*;

const BASE: &str = r#"{
    "name": "rust-base",
    "prompts": [{"id": "crate", "message": "Crate name?", "default": "demo"}],
    "tasks": [
        {"id": "manifest", "type": "write",
         "config": {"path": "{{crate}}/Cargo.toml",
                    "content": "[package]\nname = \"placeholder\"\n"}},
        {"id": "main", "type": "write", "dependencies": ["manifest"],
         "config": {"path": "{{crate}}/src/main.rs", "templateFile": "main.rs.tpl"}}
    ]
}"#;

const APP: &str = r#"{
    "name": "cli-app",
    "extends": "base/trellis.json",
    "tasks": [
        {"id": "rename", "type": "regex-replace", "dependencies": ["manifest"],
         "config": {"path": "{{crate}}/Cargo.toml",
                    "pattern": "placeholder", "replacement": "{{crate}}"}},
        {"id": "ignore", "type": "append", "dependencies": ["manifest"],
         "config": {"path": "{{crate}}/.gitignore", "content": "target/\n"}}
    ]
}"#;

fn fetcher() -> InMemoryFetcher {
    InMemoryFetcher::new()
        .with("base/trellis.json", BASE)
        .with("base/main.rs.tpl", "fn main() { println!(\"{{crate}}\"); }\n")
        .with("app.json", APP)
}

fn orchestrator(fs: &MemoryFilesystem, prompter: ScriptedPrompter) -> Orchestrator {
    let ports = Ports {
        fetcher: Box::new(fetcher()),
        filesystem: Box::new(fs.clone()),
        runner: Box::new(ShellCommandRunner::default()),
        renderer: Box::new(SimpleRenderer::new()),
        prompter: Box::new(prompter),
        schema: Some(Box::new(JsonSchemaValidator::builtin().unwrap())),
    };
    Orchestrator::new(ports, builtin_registry())
}

#[test]
fn test_scaffolds_a_crate_from_layered_documents() {
    let fs = MemoryFilesystem::new();
    let report = orchestrator(&fs, ScriptedPrompter::default().with("crate", "hello"))
        .run_document(&"app.json".into(), RunOptions::default().with_cwd("/out"))
        .unwrap();

    assert_eq!(report.execution_order, vec!["manifest", "main", "rename", "ignore"]);
    assert_eq!(
        fs.contents("/out/hello/Cargo.toml").as_deref(),
        Some("[package]\nname = \"hello\"\n")
    );
    assert_eq!(
        fs.contents("/out/hello/src/main.rs").as_deref(),
        Some("fn main() { println!(\"hello\"); }\n")
    );
    assert_eq!(fs.contents("/out/hello/.gitignore").as_deref(), Some("target/\n"));
}

#[test]
fn test_dry_run_reports_diffs_without_writing() {
    let fs = MemoryFilesystem::new();
    let report = orchestrator(&fs, ScriptedPrompter::default())
        .run_document(&"base/trellis.json".into(), RunOptions::default().dry_run().with_cwd("/out"))
        .unwrap();

    assert!(fs.list_files().is_empty());
    assert_eq!(report.diffs.len(), 2);
    let main = &report.diffs[1];
    assert_eq!(main.id, "main");
    assert!(main.diff.as_deref().unwrap().contains("+fn main() { println!(\"demo\"); }"));
}

#[test]
fn test_schema_violations_abort_before_anything_runs() {
    let fs = MemoryFilesystem::new();
    let broken = InMemoryFetcher::new().with(
        "broken.json",
        r#"{"tasks": [{"id": "x", "type": "teleport"}]}"#,
    );
    let ports = Ports {
        fetcher: Box::new(broken),
        filesystem: Box::new(fs.clone()),
        runner: Box::new(ShellCommandRunner::default()),
        renderer: Box::new(SimpleRenderer::new()),
        prompter: Box::new(ScriptedPrompter::default()),
        schema: Some(Box::new(JsonSchemaValidator::builtin().unwrap())),
    };

    let err = Orchestrator::new(ports, builtin_registry())
        .run_document(&"broken.json".into(), RunOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        TrellisError::Application(ApplicationError::SchemaValidation { .. })
    ));
    assert!(fs.list_files().is_empty());
}

#[test]
fn test_invalid_plugin_config_fails_validation() {
    let fs = MemoryFilesystem::new();
    let doc = r#"{"tasks": [{"id": "w", "type": "write",
                  "config": {"path": "a", "content": "x", "template": "y"}}]}"#;
    let ports = Ports {
        fetcher: Box::new(InMemoryFetcher::new().with("w.json", doc)),
        filesystem: Box::new(fs.clone()),
        runner: Box::new(ShellCommandRunner::default()),
        renderer: Box::new(SimpleRenderer::new()),
        prompter: Box::new(ScriptedPrompter::default()),
        schema: None,
    };

    let err = Orchestrator::new(ports, builtin_registry())
        .run_document(&"w.json".into(), RunOptions::default())
        .unwrap_err();

    assert!(err.to_string().contains("mutually exclusive"));
}
