//! Task Orchestrator - the run state machine.
//!
//! ```text
//! NotStarted ─▶ ValidatingConfig ─▶ ┌ ResolvingVariables ─▶ ResolvingPrompts ─▶ ReResolvingConditionals ┐
//!     │                             └────────────────── once per document segment ◀──────────────────┘
//!     │                                                        │
//!     │                                               CheckingEnablement ─▶ Sorting
//!     │                                                                       │
//!     │                                                     ┌─────────────────┴────────────┐
//!     │                                               DryRunPreview                   Executing
//!     │                                                     └─────────────┬────────────────┘
//!     └──(marker present)──────────────────────────────────────────▶ Completed      (any) ─▶ Failed
//! ```
//!
//! Enablement is evaluated twice: lazily right after validation to produce
//! the provisional order, and finally once the context is fully resolved.
//! Only the final result decides what runs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::config_resolver::ConfigResolver;
use super::enablement::{Enablement, Phase};
use super::merger::ConfigMerger;
use super::value_resolver::ValueResolver;
use super::variable_pipeline::{RunInputs, VariablePipeline};
use crate::application::{
    ApplicationError,
    ports::{
        CommandRunner, ConditionEvaluator, DocumentFetcher, Filesystem, HookRegistry,
        PluginRegistry, PromptCollector, SchemaValidator, TaskContext, TaskOutcome,
        TemplateRenderer,
    },
};
use crate::domain::{
    ConfigurationDocument, ConflictGroups, DocumentLocation, EnabledSpec, IdValidator,
    PromptDefinition, ResolutionContext, RestrictedEvaluator, TaskDefinition, TaskType,
    VariableDefinition, prune_dependencies, sort_tasks,
};
use crate::error::{TrellisError, TrellisResult};

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    NotStarted,
    ValidatingConfig,
    ResolvingVariables,
    ResolvingPrompts,
    ReResolvingConditionals,
    CheckingEnablement,
    Sorting,
    DryRunPreview,
    Executing,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (NotStarted, ValidatingConfig | Completed) => true,
            (ValidatingConfig, ResolvingVariables | CheckingEnablement) => true,
            (ResolvingVariables, ResolvingPrompts) => true,
            (ResolvingPrompts, ReResolvingConditionals) => true,
            (ReResolvingConditionals, ResolvingVariables | CheckingEnablement) => true,
            (CheckingEnablement, Sorting) => true,
            (Sorting, DryRunPreview | Executing) => true,
            (DryRunPreview | Executing, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Plan, options, report
// ============================================================================

/// Variables and prompts resolved together as one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSegment {
    pub label: String,
    pub variables: Vec<VariableDefinition>,
    pub prompts: Vec<PromptDefinition>,
}

/// Everything a run executes.
///
/// In merged mode there is a single segment. Sequential mode has one
/// segment per document, resolved in order against the shared context,
/// while all tasks are pooled into one sort-and-execute phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPlan {
    pub segments: Vec<PlanSegment>,
    pub tasks: Vec<TaskDefinition>,
    /// Recorded in the completion marker.
    pub config: Option<Value>,
}

impl RunPlan {
    pub fn new(
        tasks: Vec<TaskDefinition>,
        variables: Vec<VariableDefinition>,
        prompts: Vec<PromptDefinition>,
    ) -> Self {
        Self {
            segments: vec![PlanSegment {
                label: String::new(),
                variables,
                prompts,
            }],
            tasks,
            config: None,
        }
    }

    pub fn from_document(document: &ConfigurationDocument) -> Self {
        Self {
            segments: vec![PlanSegment {
                label: document.label(),
                variables: document.variables.clone(),
                prompts: document.prompts.clone(),
            }],
            tasks: document.tasks.clone(),
            config: serde_json::to_value(document).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Ignore an existing completion marker and overwrite existing files.
    pub force: bool,
    /// Directory task paths and the marker are relative to.
    pub cwd: PathBuf,
    /// Originating document, for diagnostics.
    pub source: Option<DocumentLocation>,
    /// Seeded into the context before anything resolves.
    pub variables: Map<String, Value>,
    /// Pre-supplied prompt answers.
    pub answers: Map<String, Value>,
    /// Gate applied on top of every task's own enablement.
    pub inherited_enabled: Option<EnabledSpec>,
    /// Completion marker path; `None` disables the marker.
    pub marker: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            cwd: PathBuf::from("."),
            source: None,
            variables: Map::new(),
            answers: Map::new(),
            inherited_enabled: None,
            marker: None,
        }
    }
}

impl RunOptions {
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_answer(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers.insert(key.into(), value.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    fn marker_path(&self) -> Option<PathBuf> {
        self.marker.as_ref().map(|marker| {
            if marker.is_absolute() {
                marker.clone()
            } else {
                self.cwd.join(marker)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedTask {
    pub id: String,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFailure {
    pub id: String,
    pub error: String,
}

/// One dry-run entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDiff {
    pub id: String,
    pub task_type: TaskType,
    pub summary: String,
    /// Unified diff, when the plugin can produce one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub transitions: Vec<StateTransition>,
    pub dry_run: bool,
    /// A completion marker was present and the run was skipped.
    pub already_completed: bool,
    /// Order after lazy enablement, before anything was resolved.
    pub provisional_order: Vec<String>,
    pub execution_order: Vec<String>,
    /// Tasks excluded by final enablement.
    pub disabled: Vec<String>,
    pub completed: Vec<CompletedTask>,
    /// Optional tasks that failed; the run continued past them.
    pub failed: Vec<TaskFailure>,
    pub diffs: Vec<TaskDiff>,
    pub context: ResolutionContext,
}

impl RunReport {
    fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::NotStarted,
            transitions: Vec::new(),
            dry_run,
            already_completed: false,
            provisional_order: Vec::new(),
            execution_order: Vec::new(),
            disabled: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            diffs: Vec::new(),
            context: ResolutionContext::new(),
        }
    }

    fn transition(&mut self, to: RunState) -> TrellisResult<()> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(TrellisError::Internal {
                message: format!("invalid run state transition {from} -> {to}"),
            });
        }
        info!(run_id = %self.run_id, %from, %to, "Run state changed");
        self.transitions.push(StateTransition {
            from,
            to,
            at: Utc::now(),
        });
        self.state = to;
        if to.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn completed_ids(&self) -> Vec<String> {
        self.completed.iter().map(|c| c.id.clone()).collect()
    }
}

/// Persisted after a successful real run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMarker {
    pub run_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub config: Option<Value>,
    pub completed_tasks: Vec<String>,
    pub version: String,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Adapters a run needs.
pub struct Ports {
    pub fetcher: Box<dyn DocumentFetcher>,
    pub filesystem: Box<dyn Filesystem>,
    pub runner: Box<dyn CommandRunner>,
    pub renderer: Box<dyn TemplateRenderer>,
    pub prompter: Box<dyn PromptCollector>,
    pub schema: Option<Box<dyn SchemaValidator>>,
}

pub struct Orchestrator {
    ports: Ports,
    evaluator: Box<dyn ConditionEvaluator>,
    plugins: PluginRegistry,
    hooks: HookRegistry,
    merger: ConfigMerger,
}

impl Orchestrator {
    pub fn new(ports: Ports, plugins: PluginRegistry) -> Self {
        Self {
            ports,
            evaluator: Box::new(RestrictedEvaluator),
            plugins,
            hooks: HookRegistry::new(),
            merger: ConfigMerger::builtin(),
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_conflict_groups(mut self, groups: ConflictGroups) -> Self {
        self.merger = ConfigMerger::new(groups);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn ConditionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Document resolver sharing this orchestrator's fetcher, schema and
    /// conflict groups.
    pub fn resolver(&self) -> ConfigResolver<'_> {
        ConfigResolver::new(self.ports.fetcher.as_ref())
            .with_schema(self.ports.schema.as_deref())
            .with_merger(self.merger.clone())
    }

    /// Merged mode: resolve `root`'s extends chain into one document and run it.
    #[instrument(skip_all, fields(root = %root))]
    pub fn run_document(
        &self,
        root: &DocumentLocation,
        mut options: RunOptions,
    ) -> TrellisResult<RunReport> {
        // Handed to the extends resolver; it reaches tasks as `$templateEnabled`.
        let inherited = options.inherited_enabled.take();
        let merged = self.resolver().resolve_with(root, inherited)?;
        options.source.get_or_insert_with(|| root.clone());
        self.run(RunPlan::from_document(&merged), options)
    }

    /// Sequential mode: each root gets its own variable/prompt pass, in
    /// order, before all tasks run as one pooled set.
    #[instrument(skip_all, fields(documents = roots.len()))]
    pub fn run_sequential(
        &self,
        roots: &[DocumentLocation],
        mut options: RunOptions,
    ) -> TrellisResult<RunReport> {
        let inherited = options.inherited_enabled.take();
        let documents = self.resolver().resolve_many(roots, inherited)?;

        let tasks = self
            .merger
            .pool_tasks(documents.iter().map(|doc| doc.tasks.clone()))?;
        let plan = RunPlan {
            segments: documents
                .iter()
                .map(|doc| PlanSegment {
                    label: doc.label(),
                    variables: doc.variables.clone(),
                    prompts: doc.prompts.clone(),
                })
                .collect(),
            tasks,
            config: serde_json::to_value(&documents).ok(),
        };
        if options.source.is_none() {
            options.source = roots.first().cloned();
        }
        self.run(plan, options)
    }

    /// Resolve `root` and apply the structural checks a run starts with,
    /// without resolving values or touching anything. Returns the merged
    /// document and its full dependency order.
    #[instrument(skip_all, fields(root = %root))]
    pub fn check(
        &self,
        root: &DocumentLocation,
    ) -> TrellisResult<(ConfigurationDocument, Vec<String>)> {
        let merged = self.resolver().resolve(root)?;
        let plan = RunPlan::from_document(&merged);
        self.validate(&plan)?;
        let order = ids(&sort_tasks(&plan.tasks)?);
        Ok((merged, order))
    }

    /// Run a plan through the full state machine.
    #[instrument(skip_all, fields(dry_run = options.dry_run, tasks = plan.tasks.len()))]
    pub fn run(&self, plan: RunPlan, options: RunOptions) -> TrellisResult<RunReport> {
        let mut report = RunReport::new(options.dry_run);
        if let Some(source) = &options.source {
            info!(run_id = %report.run_id, %source, "Starting run");
        }

        match self.drive(&plan, &options, &mut report) {
            Ok(()) => Ok(report),
            Err(e) => {
                if !report.state.is_terminal() {
                    report.transition(RunState::Failed)?;
                }
                error!(run_id = %report.run_id, error = %e, "Run failed");
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        plan: &RunPlan,
        options: &RunOptions,
        report: &mut RunReport,
    ) -> TrellisResult<()> {
        let evaluator = self.evaluator.as_ref();
        let runner = self.ports.runner.as_ref();
        let resolver = ValueResolver::new(evaluator, runner, self.ports.fetcher.as_ref())
            .with_cwd(&options.cwd);
        let enablement = Enablement::new(evaluator, runner).with_cwd(&options.cwd);
        let pipeline = VariablePipeline::new(&resolver, &enablement, self.ports.prompter.as_ref());

        let marker = options.marker_path();
        if let Some(path) = &marker {
            if !options.dry_run && !options.force && self.ports.filesystem.exists(path) {
                info!(marker = %path.display(), "Completion marker present; skipping run");
                report.already_completed = true;
                return report.transition(RunState::Completed);
            }
        }

        // ── validation ──────────────────────────────────────────────────────
        report.transition(RunState::ValidatingConfig)?;
        self.validate(plan)?;

        let mut ctx = ResolutionContext::new();
        let mut inputs = RunInputs::seed(&mut ctx, &options.variables, &options.answers);

        let provisional: Vec<TaskDefinition> = plan
            .tasks
            .iter()
            .filter(|task| self.gate(&enablement, Phase::Lazy, task, &ctx, options))
            .cloned()
            .collect();
        report.provisional_order = ids(&order(&plan.tasks, provisional)?);
        debug!(order = ?report.provisional_order, "Provisional order");

        // ── resolution ──────────────────────────────────────────────────────
        for segment in &plan.segments {
            if !segment.label.is_empty() {
                debug!(document = %segment.label, "Resolving document inputs");
            }
            report.transition(RunState::ResolvingVariables)?;
            pipeline.resolve_variables(&segment.variables, &mut ctx, &inputs);

            report.transition(RunState::ResolvingPrompts)?;
            pipeline.collect_prompts(&segment.prompts, &mut ctx, &mut inputs)?;

            report.transition(RunState::ReResolvingConditionals)?;
            pipeline.resolve_conditionals(&segment.variables, &mut ctx, &inputs);
        }

        // ── final enablement + sort ─────────────────────────────────────────
        report.transition(RunState::CheckingEnablement)?;
        let snapshot = ctx.snapshot();
        let (enabled, disabled): (Vec<&TaskDefinition>, Vec<&TaskDefinition>) = plan
            .tasks
            .iter()
            .partition(|task| self.gate(&enablement, Phase::Final, task, &snapshot, options));
        report.disabled = disabled.iter().map(|t| t.id.clone()).collect();
        for id in &report.disabled {
            debug!(task = %id, "Task disabled");
        }

        report.transition(RunState::Sorting)?;
        let ordered = order(&plan.tasks, enabled.into_iter().cloned().collect())?;
        report.execution_order = ids(&ordered);

        let task_ctx = TaskContext {
            context: &snapshot,
            cwd: &options.cwd,
            dry_run: options.dry_run,
            force: options.force,
            filesystem: self.ports.filesystem.as_ref(),
            renderer: self.ports.renderer.as_ref(),
            runner,
            fetcher: self.ports.fetcher.as_ref(),
        };

        if options.dry_run {
            report.transition(RunState::DryRunPreview)?;
            self.preview(&ordered, &task_ctx, report)?;
        } else {
            report.transition(RunState::Executing)?;
            self.execute(&ordered, &task_ctx, report)?;
            if let Some(path) = &marker {
                self.write_marker(path, plan, report)?;
            }
        }

        report.context = ctx;
        report.transition(RunState::Completed)
    }

    /// Structural checks; any failure aborts before resolution.
    fn validate(&self, plan: &RunPlan) -> TrellisResult<()> {
        for task in &plan.tasks {
            self.plugins.get(task.task_type)?.validate(task)?;
        }

        let probe = ConfigurationDocument {
            tasks: plan.tasks.clone(),
            variables: plan
                .segments
                .iter()
                .flat_map(|s| s.variables.iter().cloned())
                .collect(),
            prompts: plan
                .segments
                .iter()
                .flat_map(|s| s.prompts.iter().cloned())
                .collect(),
            ..ConfigurationDocument::default()
        };
        IdValidator::validate_merged(&probe)?;

        sort_tasks(&plan.tasks)?;
        Ok(())
    }

    fn gate(
        &self,
        enablement: &Enablement<'_>,
        phase: Phase,
        task: &TaskDefinition,
        ctx: &ResolutionContext,
        options: &RunOptions,
    ) -> bool {
        enablement.task(phase, task, ctx)
            && enablement.check(phase, options.inherited_enabled.as_ref(), ctx)
    }

    fn preview(
        &self,
        tasks: &[TaskDefinition],
        ctx: &TaskContext<'_>,
        report: &mut RunReport,
    ) -> TrellisResult<()> {
        for task in tasks {
            let plugin = self.plugins.get(task.task_type)?;
            let diff = match plugin.diff(task, ctx) {
                Ok(diff) => diff,
                Err(e) => {
                    warn!(task = %task.id, error = %e, "Preview unavailable");
                    None
                }
            };
            report.diffs.push(TaskDiff {
                id: task.id.clone(),
                task_type: task.task_type,
                summary: task
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("would run {} task '{}'", task.task_type, task.id)),
                diff,
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        tasks: &[TaskDefinition],
        ctx: &TaskContext<'_>,
        report: &mut RunReport,
    ) -> TrellisResult<()> {
        self.hooks.before_all(tasks, ctx.context);

        for (index, task) in tasks.iter().enumerate() {
            let plugin = self.plugins.get(task.task_type)?;
            self.hooks.before_task(task, ctx.context);
            info!(task = %task.id, task_type = %task.task_type, "Running task");

            match plugin.execute(task, ctx) {
                Ok(outcome) => {
                    debug!(task = %task.id, summary = %outcome.summary, "Task finished");
                    self.hooks.after_task(task, &outcome, ctx.context);
                    report.completed.push(CompletedTask {
                        id: task.id.clone(),
                        outcome,
                    });
                }
                Err(e) => {
                    self.hooks.on_error(task, &e, ctx.context);
                    if task.is_required() {
                        return Err(ApplicationError::RequiredTaskFailed {
                            task: task.id.clone(),
                            reason: e.to_string(),
                            completed: report.completed.len(),
                            remaining: tasks.len() - index - 1,
                        }
                        .into());
                    }
                    warn!(task = %task.id, error = %e, "Optional task failed; continuing");
                    report.failed.push(TaskFailure {
                        id: task.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.hooks.after_all(&report.completed_ids(), ctx.context);
        Ok(())
    }

    fn write_marker(&self, path: &Path, plan: &RunPlan, report: &RunReport) -> TrellisResult<()> {
        let marker = CompletionMarker {
            run_id: report.run_id,
            completed_at: Utc::now(),
            config: plan.config.clone(),
            completed_tasks: report.completed_ids(),
            version: crate::VERSION.to_string(),
        };
        let text = serde_json::to_string_pretty(&marker).map_err(|e| TrellisError::Internal {
            message: format!("completion marker serialization: {e}"),
        })?;
        self.ports.filesystem.write_file(path, &text)?;
        debug!(marker = %path.display(), "Wrote completion marker");
        Ok(())
    }
}

/// Sort `subset`, dropping edges to tasks that exist in `all` but were
/// filtered out of `subset`.
fn order(
    all: &[TaskDefinition],
    mut subset: Vec<TaskDefinition>,
) -> TrellisResult<Vec<TaskDefinition>> {
    let known: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
    let kept: Vec<String> = subset.iter().map(|t| t.id.clone()).collect();
    let kept: Vec<&str> = kept.iter().map(String::as_str).collect();
    prune_dependencies(&mut subset, &kept, &known);
    Ok(sort_tasks(&subset)?)
}

fn ids(tasks: &[TaskDefinition]) -> Vec<String> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_rejects_skipping_validation() {
        assert!(!RunState::NotStarted.can_transition_to(RunState::Executing));
        assert!(RunState::Sorting.can_transition_to(RunState::DryRunPreview));
        assert!(RunState::ReResolvingConditionals.can_transition_to(RunState::ResolvingVariables));
        assert!(!RunState::Completed.can_transition_to(RunState::Failed));
    }

    #[test]
    fn marker_path_is_relative_to_cwd() {
        let options = RunOptions::default()
            .with_cwd("/work")
            .with_marker(".trellis/completed.json");
        assert_eq!(
            options.marker_path(),
            Some(PathBuf::from("/work/.trellis/completed.json"))
        );
    }
}
