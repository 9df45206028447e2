//! Variable and prompt resolution.
//!
//! Three phases per document, all writing into the shared context:
//!
//! ```text
//! 1. variables     non-conditional specs        ─┐
//! 2. prompts       defaults, then answers        │ each phase only adds
//! 3. conditionals  conditional specs, re-run     ─┘ the keys it resolves
//! ```
//!
//! Consecutive variables that shell out are resolved as one concurrent
//! batch against a snapshot, as are all prompt defaults. Results are merged
//! back in declaration order once the whole batch is done.

use std::collections::HashSet;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::enablement::Enablement;
use super::value_resolver::ValueResolver;
use crate::application::ports::PromptCollector;
use crate::domain::{
    EnabledSpec, PromptDefinition, ResolutionContext, VariableDefinition,
};
use crate::error::TrellisResult;

/// Caller-supplied inputs and cross-document bookkeeping for one run.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    /// Pre-supplied prompt answers, by prompt id.
    pub answers: Map<String, Value>,
    /// Context keys seeded by the caller; variables never overwrite them.
    pub locked: HashSet<String>,
    /// Global prompts already collected.
    pub asked_globals: HashSet<String>,
}

impl RunInputs {
    /// Seed `ctx` with caller variables and remember them as locked.
    pub fn seed(
        ctx: &mut ResolutionContext,
        variables: &Map<String, Value>,
        answers: &Map<String, Value>,
    ) -> Self {
        for (key, value) in variables {
            ctx.insert(key.clone(), value.clone());
        }
        Self {
            answers: answers.clone(),
            locked: variables.keys().cloned().collect(),
            asked_globals: HashSet::new(),
        }
    }
}

pub struct VariablePipeline<'r, 'a> {
    resolver: &'r ValueResolver<'a>,
    enablement: &'r Enablement<'a>,
    prompter: &'a dyn PromptCollector,
}

impl<'r, 'a> VariablePipeline<'r, 'a> {
    pub fn new(
        resolver: &'r ValueResolver<'a>,
        enablement: &'r Enablement<'a>,
        prompter: &'a dyn PromptCollector,
    ) -> Self {
        Self {
            resolver,
            enablement,
            prompter,
        }
    }

    /// All three phases for one document.
    pub fn run(
        &self,
        variables: &[VariableDefinition],
        prompts: &[PromptDefinition],
        ctx: &mut ResolutionContext,
        inputs: &mut RunInputs,
    ) -> TrellisResult<()> {
        self.resolve_variables(variables, ctx, inputs);
        self.collect_prompts(prompts, ctx, inputs)?;
        self.resolve_conditionals(variables, ctx, inputs);
        Ok(())
    }

    fn wanted(
        &self,
        id: &str,
        template_enabled: Option<&EnabledSpec>,
        ctx: &ResolutionContext,
    ) -> bool {
        let keep = self.enablement.lazy(template_enabled, ctx);
        if !keep {
            debug!(%id, "Skipping entity of disabled document");
        }
        keep
    }

    fn store(&self, ctx: &mut ResolutionContext, variable: &VariableDefinition, value: Option<Value>) {
        match value {
            Some(value) => {
                debug!(id = %variable.id, "Resolved variable");
                ctx.insert(variable.id.clone(), value);
            }
            None => warn!(id = %variable.id, origin = %variable.origin(), "Variable unresolved"),
        }
    }

    fn resolve_one(&self, variable: &VariableDefinition, ctx: &ResolutionContext) -> Option<Value> {
        let origin = variable.provenance.as_ref().map(|p| &p.source);
        self.resolver.resolve(&variable.value, Some(ctx), origin)
    }

    /// Phase 1: non-conditional variables.
    #[instrument(skip_all, fields(count = variables.len()))]
    pub fn resolve_variables(
        &self,
        variables: &[VariableDefinition],
        ctx: &mut ResolutionContext,
        inputs: &RunInputs,
    ) {
        let candidates: Vec<&VariableDefinition> = variables
            .iter()
            .filter(|v| !v.value.is_conditional() && !inputs.locked.contains(&v.id))
            .collect();

        let mut i = 0;
        while i < candidates.len() {
            if !candidates[i].value.is_external() {
                let variable = candidates[i];
                if self.wanted(&variable.id, variable.template_enabled.as_ref(), ctx) {
                    let value = self.resolve_one(variable, ctx);
                    self.store(ctx, variable, value);
                }
                i += 1;
                continue;
            }

            let run = candidates[i..]
                .iter()
                .take_while(|v| v.value.is_external())
                .count();
            let snapshot = ctx.snapshot();
            let batch: Vec<&VariableDefinition> = candidates[i..i + run]
                .iter()
                .copied()
                .filter(|v| self.wanted(&v.id, v.template_enabled.as_ref(), &snapshot))
                .collect();

            debug!(size = batch.len(), "Resolving external variables concurrently");
            let values: Vec<Option<Value>> = batch
                .par_iter()
                .map(|variable| self.resolve_one(variable, &snapshot))
                .collect();

            for (variable, value) in batch.into_iter().zip(values) {
                self.store(ctx, variable, value);
            }
            i += run;
        }
    }

    /// Phase 2: prompts. Defaults are computed concurrently first, then
    /// questions are asked one at a time.
    #[instrument(skip_all, fields(count = prompts.len()))]
    pub fn collect_prompts(
        &self,
        prompts: &[PromptDefinition],
        ctx: &mut ResolutionContext,
        inputs: &mut RunInputs,
    ) -> TrellisResult<()> {
        let snapshot = ctx.snapshot();
        let pending: Vec<&PromptDefinition> = prompts
            .iter()
            .filter(|p| !(p.global && inputs.asked_globals.contains(&p.id)))
            .filter(|p| self.wanted(&p.id, p.template_enabled.as_ref(), &snapshot))
            .collect();

        let defaults: Vec<Option<Value>> = pending
            .par_iter()
            .map(|prompt| {
                let origin = prompt.provenance.as_ref().map(|p| &p.source);
                prompt
                    .default
                    .as_ref()
                    .and_then(|spec| self.resolver.resolve(spec, Some(&snapshot), origin))
            })
            .collect();

        for (prompt, default) in pending.into_iter().zip(defaults) {
            let answer = match inputs.answers.get(&prompt.id) {
                Some(answer) => {
                    debug!(id = %prompt.id, "Using pre-supplied answer");
                    answer.clone()
                }
                None => self.prompter.ask(prompt, default.as_ref())?,
            };
            ctx.insert(prompt.id.clone(), answer);
            if prompt.global {
                inputs.asked_globals.insert(prompt.id.clone());
            }
        }
        Ok(())
    }

    /// Phase 3: conditional variables, now that answers exist.
    #[instrument(skip_all)]
    pub fn resolve_conditionals(
        &self,
        variables: &[VariableDefinition],
        ctx: &mut ResolutionContext,
        inputs: &RunInputs,
    ) {
        for variable in variables
            .iter()
            .filter(|v| v.value.is_conditional() && !inputs.locked.contains(&v.id))
        {
            if self.wanted(&variable.id, variable.template_enabled.as_ref(), ctx) {
                let value = self.resolve_one(variable, ctx);
                self.store(ctx, variable, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeRunner, ScriptedAnswers, StaticFetcher};
    use crate::domain::{RestrictedEvaluator, ValueSpec};
    use serde_json::json;

    struct Harness {
        runner: FakeRunner,
        prompter: ScriptedAnswers,
    }

    impl Harness {
        fn run(
            &self,
            variables: &[VariableDefinition],
            prompts: &[PromptDefinition],
            ctx: &mut ResolutionContext,
            inputs: &mut RunInputs,
        ) -> TrellisResult<()> {
            let evaluator = RestrictedEvaluator;
            let fetcher = StaticFetcher::new();
            let resolver = ValueResolver::new(&evaluator, &self.runner, &fetcher);
            let enablement = Enablement::new(&evaluator, &self.runner);
            VariablePipeline::new(&resolver, &enablement, &self.prompter)
                .run(variables, prompts, ctx, inputs)
        }
    }

    fn harness() -> Harness {
        Harness {
            runner: FakeRunner::new()
                .stdout("git config user.name", "Ada")
                .stdout("date +%Y", "2026"),
            prompter: ScriptedAnswers::new().answer("lang", json!("rust")),
        }
    }

    #[test]
    fn conditional_variables_see_prompt_answers() {
        let h = harness();
        let variables = vec![
            VariableDefinition::new(
                "ext",
                ValueSpec::conditional("lang == 'rust'", ValueSpec::literal("rs"), Some(ValueSpec::literal("txt"))),
            ),
            VariableDefinition::new("greeting", ValueSpec::interpolate("hi {{author}}")),
            VariableDefinition::new("author", ValueSpec::exec("git config user.name")),
        ];
        let prompts = vec![PromptDefinition::new("lang", "Language?")];
        let mut ctx = ResolutionContext::new();
        let mut inputs = RunInputs::default();

        h.run(&variables, &prompts, &mut ctx, &mut inputs).unwrap();

        assert_eq!(ctx.get("ext"), Some(&json!("rs")));
        assert_eq!(ctx.get("lang"), Some(&json!("rust")));
        assert_eq!(ctx.get("author"), Some(&json!("Ada")));
        // Declared before `author` resolved.
        assert_eq!(ctx.get("greeting"), Some(&json!("hi ")));
    }

    #[test]
    fn external_batch_merges_in_declaration_order() {
        let h = harness();
        let variables = vec![
            VariableDefinition::new("year", ValueSpec::exec("date +%Y")),
            VariableDefinition::new("author", ValueSpec::exec("git config user.name")),
            VariableDefinition::new("line", ValueSpec::interpolate("{{author}} {{year}}")),
        ];
        let mut ctx = ResolutionContext::new();

        h.run(&variables, &[], &mut ctx, &mut RunInputs::default()).unwrap();

        assert_eq!(ctx.get("line"), Some(&json!("Ada 2026")));
        assert_eq!(ctx.keys().cloned().collect::<Vec<_>>(), vec!["year", "author", "line"]);
    }

    #[test]
    fn pre_supplied_answers_skip_the_prompter() {
        let h = harness();
        let prompts = vec![PromptDefinition::new("name", "Name?")];
        let mut ctx = ResolutionContext::new();
        let mut inputs = RunInputs {
            answers: serde_json::from_value(json!({"name": "given"})).unwrap(),
            ..RunInputs::default()
        };

        h.run(&[], &prompts, &mut ctx, &mut inputs).unwrap();

        assert_eq!(ctx.get("name"), Some(&json!("given")));
        assert!(h.prompter.asked().is_empty());
    }

    #[test]
    fn global_prompt_is_asked_once_across_documents() {
        let h = harness();
        let prompts = vec![PromptDefinition::new("lang", "Language?").global()];
        let mut ctx = ResolutionContext::new();
        let mut inputs = RunInputs::default();

        h.run(&[], &prompts, &mut ctx, &mut inputs).unwrap();
        h.run(&[], &prompts, &mut ctx, &mut inputs).unwrap();

        assert_eq!(h.prompter.asked(), vec!["lang"]);
    }

    #[test]
    fn prompt_default_is_resolved_before_asking() {
        let h = Harness {
            runner: FakeRunner::new().stdout("git config user.name", "Ada"),
            prompter: ScriptedAnswers::new(),
        };
        let prompts = vec![
            PromptDefinition::new("author", "Author?")
                .with_default(ValueSpec::exec("git config user.name")),
        ];
        let mut ctx = ResolutionContext::new();

        h.run(&[], &prompts, &mut ctx, &mut RunInputs::default()).unwrap();
        assert_eq!(ctx.get("author"), Some(&json!("Ada")));
    }

    #[test]
    fn caller_variables_are_not_overwritten() {
        let h = harness();
        let variables = vec![VariableDefinition::new("env", ValueSpec::literal("dev"))];
        let mut ctx = ResolutionContext::new();
        let mut inputs = RunInputs::seed(
            &mut ctx,
            &serde_json::from_value(json!({"env": "prod"})).unwrap(),
            &Map::new(),
        );

        h.run(&variables, &[], &mut ctx, &mut inputs).unwrap();
        assert_eq!(ctx.get("env"), Some(&json!("prod")));
    }

    #[test]
    fn lazily_disabled_entities_are_skipped() {
        let h = harness();
        let mut variable = VariableDefinition::new("x", ValueSpec::literal(1));
        variable.template_enabled = Some(EnabledSpec::condition("mode == 'full'"));
        let mut prompt = PromptDefinition::new("lang", "?");
        prompt.template_enabled = Some(EnabledSpec::condition("mode == 'full'"));
        let mut ctx = ResolutionContext::new().with("mode", "lite");

        h.run(&[variable], &[prompt], &mut ctx, &mut RunInputs::default())
            .unwrap();

        assert!(!ctx.contains_key("x"));
        assert!(h.prompter.asked().is_empty());
    }
}
