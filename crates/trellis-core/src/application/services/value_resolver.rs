//! Turning [`ValueSpec`]s into values.
//!
//! Resolution never fails loudly: a command that cannot run, a script that
//! cannot be fetched or a condition that does not parse all yield `None`
//! ("unresolved") and a warning. Callers decide whether that matters.
//!
//! `exec` commands run verbatim; only `exec-file` arguments are
//! interpolated, so context values never reach a shell command line.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::ports::{
    CommandOutput, CommandRunner, ConditionEvaluator, DocumentFetcher, ScriptSource,
};
use crate::domain::{
    DocumentLocation, ExecFileSpec, ResolutionContext, ValueSpec, interpolate, stringify,
};

pub struct ValueResolver<'a> {
    evaluator: &'a dyn ConditionEvaluator,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn DocumentFetcher,
    cwd: Option<&'a Path>,
}

impl<'a> ValueResolver<'a> {
    pub fn new(
        evaluator: &'a dyn ConditionEvaluator,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn DocumentFetcher,
    ) -> Self {
        Self {
            evaluator,
            runner,
            fetcher,
            cwd: None,
        }
    }

    /// Directory `exec` and `exec-file` values run in.
    pub fn with_cwd(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn evaluator(&self) -> &'a dyn ConditionEvaluator {
        self.evaluator
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    /// Resolve `spec`. `origin` is the defining document, used to locate
    /// relative `exec-file` scripts.
    pub fn resolve(
        &self,
        spec: &ValueSpec,
        ctx: Option<&ResolutionContext>,
        origin: Option<&DocumentLocation>,
    ) -> Option<Value> {
        match spec {
            ValueSpec::Static(value) => Some(value.clone()),

            ValueSpec::Interpolate(template) => Some(Value::String(match ctx {
                Some(ctx) => interpolate(template, ctx),
                None => template.clone(),
            })),

            ValueSpec::Conditional {
                condition,
                if_true,
                if_false,
            } => {
                let empty = ResolutionContext::new();
                let holds = match self.evaluator.evaluate(condition, ctx.unwrap_or(&empty)) {
                    Ok(holds) => holds,
                    Err(e) => {
                        warn!(%condition, error = %e, "Condition unavailable");
                        return None;
                    }
                };
                debug!(%condition, holds, "Evaluated conditional value");
                match (holds, if_false) {
                    (true, _) => self.resolve(if_true, ctx, origin),
                    (false, Some(branch)) => self.resolve(branch, ctx, origin),
                    (false, None) => None,
                }
            }

            ValueSpec::Exec(command) => {
                let output = self.runner.run_shell(command, self.cwd);
                captured(command, output)
            }

            ValueSpec::ExecFile(spec) => self.exec_file(spec, ctx, origin),
        }
    }

    fn exec_file(
        &self,
        spec: &ExecFileSpec,
        ctx: Option<&ResolutionContext>,
        origin: Option<&DocumentLocation>,
    ) -> Option<Value> {
        let render = |text: &str| match ctx {
            Some(ctx) => interpolate(text, ctx),
            None => text.to_string(),
        };

        let target = match origin {
            Some(origin) => origin.join(&render(&spec.file)),
            None => DocumentLocation::parse(&render(&spec.file)),
        };

        let script = match &target {
            DocumentLocation::Local(path) => ScriptSource::Path(path.clone()),
            DocumentLocation::Remote(_) => match self.fetcher.fetch(&target) {
                Ok(contents) => ScriptSource::Inline {
                    contents,
                    extension: target.extension(),
                },
                Err(e) => {
                    warn!(script = %target, error = %e, "Could not fetch script");
                    return None;
                }
            },
        };

        let mut args: Vec<String> = spec.args.iter().map(|arg| render(arg)).collect();
        for (key, value) in &spec.parameters {
            args.push(format!("--{key}"));
            args.push(render(&stringify(value)));
        }

        let output = self.runner.run_script(&script, &args, self.cwd);
        captured(&target.to_string(), output)
    }
}

fn captured(
    what: &str,
    output: crate::error::TrellisResult<CommandOutput>,
) -> Option<Value> {
    match output {
        Ok(output) if output.success() => Some(sniff(&output.stdout)),
        Ok(output) => {
            warn!(
                command = %what,
                status = ?output.status,
                stderr = %output.stderr.trim(),
                "Command exited unsuccessfully; value unresolved"
            );
            None
        }
        Err(e) => {
            warn!(command = %what, error = %e, "Command failed; value unresolved");
            None
        }
    }
}

/// Type-sniff trimmed command output: JSON, then boolean, then number,
/// then plain string.
pub fn sniff(output: &str) -> Value {
    let trimmed = output.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(number) {
            return Value::Number(number);
        }
    }
    Value::String(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeRunner, StaticFetcher};
    use crate::domain::RestrictedEvaluator;
    use serde_json::json;

    fn with_resolver<R>(runner: &FakeRunner, f: impl FnOnce(&ValueResolver<'_>) -> R) -> R {
        let fetcher = StaticFetcher::new().with("https://h/s/name.sh", "echo remote");
        let evaluator = RestrictedEvaluator;
        let resolver = ValueResolver::new(&evaluator, runner, &fetcher);
        f(&resolver)
    }

    #[test]
    fn interpolates_against_context() {
        let runner = FakeRunner::new();
        let ctx = ResolutionContext::new().with("name", "World");
        let spec = ValueSpec::interpolate("Hello {{name}}!");

        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&spec, Some(&ctx), None), Some(json!("Hello World!")));
            assert_eq!(r.resolve(&spec, None, None), Some(json!("Hello {{name}}!")));
        });
    }

    #[test]
    fn conditional_picks_branch() {
        let runner = FakeRunner::new();
        let spec = ValueSpec::conditional(
            "x===1",
            ValueSpec::literal("A"),
            Some(ValueSpec::literal("B")),
        );
        let one = ResolutionContext::new().with("x", 1);
        let two = ResolutionContext::new().with("x", 2);

        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&spec, Some(&one), None), Some(json!("A")));
            assert_eq!(r.resolve(&spec, Some(&two), None), Some(json!("B")));
        });
    }

    #[test]
    fn nested_conditional_branches_resolve_recursively() {
        let runner = FakeRunner::new();
        let spec = ValueSpec::conditional(
            "ts",
            ValueSpec::interpolate("{{name}}.ts"),
            Some(ValueSpec::interpolate("{{name}}.js")),
        );
        let ctx = ResolutionContext::new().with("ts", false).with("name", "index");

        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&spec, Some(&ctx), None), Some(json!("index.js")));
        });
    }

    #[test]
    fn invalid_condition_is_unresolved() {
        let runner = FakeRunner::new();
        let spec = ValueSpec::conditional("a(", ValueSpec::literal(1), None);
        with_resolver(&runner, |r| assert_eq!(r.resolve(&spec, None, None), None));
    }

    #[test]
    fn exec_output_is_type_sniffed() {
        let runner = FakeRunner::new()
            .stdout("echo json", "{\"a\": 1}\n")
            .stdout("echo yes", "TRUE\n")
            .stdout("echo n", " 42 \n")
            .stdout("echo s", "hello world\n");

        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&ValueSpec::exec("echo json"), None, None), Some(json!({"a": 1})));
            assert_eq!(r.resolve(&ValueSpec::exec("echo yes"), None, None), Some(json!(true)));
            assert_eq!(r.resolve(&ValueSpec::exec("echo n"), None, None), Some(json!(42)));
            assert_eq!(
                r.resolve(&ValueSpec::exec("echo s"), None, None),
                Some(json!("hello world"))
            );
        });
    }

    #[test]
    fn failing_command_is_unresolved() {
        let runner = FakeRunner::new().failing("exit 3");
        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&ValueSpec::exec("exit 3"), None, None), None);
            assert_eq!(r.resolve(&ValueSpec::exec("unknown"), None, None), None);
        });
    }

    #[test]
    fn exec_file_resolves_relative_to_document_and_passes_parameters() {
        let runner = FakeRunner::new().stdout("script:cfg/scripts/name.sh", "ada");
        let spec = ValueSpec::ExecFile(ExecFileSpec {
            file: "scripts/name.sh".into(),
            args: vec!["{{who}}".into()],
            parameters: serde_json::from_value(json!({"upper": true})).unwrap(),
        });
        let ctx = ResolutionContext::new().with("who", "me");
        let origin = DocumentLocation::parse("cfg/base.json");

        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&spec, Some(&ctx), Some(&origin)), Some(json!("ada")));
        });
        assert_eq!(
            runner.calls(),
            vec!["script:cfg/scripts/name.sh me --upper true".to_string()]
        );
    }

    #[test]
    fn remote_exec_file_is_fetched_inline() {
        let runner = FakeRunner::new().stdout("inline:sh", "remote-ok");
        let spec = ValueSpec::ExecFile(ExecFileSpec {
            file: "https://h/s/name.sh".into(),
            ..ExecFileSpec::default()
        });
        with_resolver(&runner, |r| {
            assert_eq!(r.resolve(&spec, None, None), Some(json!("remote-ok")));
        });
    }

    #[test]
    fn commands_run_in_the_given_directory() {
        let runner = FakeRunner::new()
            .stdout("pwd", "/proj")
            .stdout("script:/tools/v.sh", "1");
        let fetcher = StaticFetcher::new();
        let evaluator = RestrictedEvaluator;
        let resolver =
            ValueResolver::new(&evaluator, &runner, &fetcher).with_cwd(Path::new("/proj"));
        let script = ValueSpec::ExecFile(ExecFileSpec {
            file: "/tools/v.sh".into(),
            ..ExecFileSpec::default()
        });

        assert_eq!(resolver.resolve(&ValueSpec::exec("pwd"), None, None), Some(json!("/proj")));
        assert_eq!(resolver.resolve(&script, None, None), Some(json!(1)));
        let proj = Some(std::path::PathBuf::from("/proj"));
        assert_eq!(runner.dirs(), vec![proj.clone(), proj]);
    }

    #[test]
    fn exec_command_is_passed_through_verbatim() {
        let runner = FakeRunner::new().stdout("echo {{name}}", "raw");
        let ctx = ResolutionContext::new().with("name", "x; rm -rf /");

        with_resolver(&runner, |r| {
            assert_eq!(
                r.resolve(&ValueSpec::exec("echo {{name}}"), Some(&ctx), None),
                Some(json!("raw"))
            );
        });
        assert_eq!(runner.calls(), vec!["echo {{name}}".to_string()]);
    }
}
