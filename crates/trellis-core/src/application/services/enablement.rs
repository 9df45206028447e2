//! Two-phase enablement.
//!
//! - **Lazy** runs before variables and prompts are resolved. Anything it
//!   cannot decide yet (a condition reading an unknown identifier, an exec
//!   check) counts as enabled, so the entity's inputs still get resolved.
//! - **Final** runs on the fully resolved context and is authoritative.
//!
//! Both read an immutable snapshot; neither writes to the context.

use std::path::Path;

use tracing::{debug, warn};

use crate::application::ports::{CommandRunner, ConditionEvaluator};
use crate::domain::{EnabledSpec, ResolutionContext, TaskDefinition, truthy};

use super::value_resolver::sniff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lazy,
    Final,
}

pub struct Enablement<'a> {
    evaluator: &'a dyn ConditionEvaluator,
    runner: &'a dyn CommandRunner,
    cwd: Option<&'a Path>,
}

impl<'a> Enablement<'a> {
    pub fn new(evaluator: &'a dyn ConditionEvaluator, runner: &'a dyn CommandRunner) -> Self {
        Self {
            evaluator,
            runner,
            cwd: None,
        }
    }

    /// Directory `exec` checks run in.
    pub fn with_cwd(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Lazy check of one spec; `None` is enabled.
    pub fn lazy(&self, spec: Option<&EnabledSpec>, ctx: &ResolutionContext) -> bool {
        self.check(Phase::Lazy, spec, ctx)
    }

    /// Final check of one spec; `None` is enabled.
    pub fn settled(&self, spec: Option<&EnabledSpec>, ctx: &ResolutionContext) -> bool {
        self.check(Phase::Final, spec, ctx)
    }

    /// A task's own spec AND the one inherited from its document.
    pub fn task(&self, phase: Phase, task: &TaskDefinition, ctx: &ResolutionContext) -> bool {
        self.check(phase, task.enabled.as_ref(), ctx)
            && self.check(phase, task.template_enabled.as_ref(), ctx)
    }

    pub fn check(&self, phase: Phase, spec: Option<&EnabledSpec>, ctx: &ResolutionContext) -> bool {
        match spec {
            None => true,
            Some(EnabledSpec::Literal(value)) => *value,
            Some(EnabledSpec::Condition(condition)) => self.condition(phase, condition, ctx),
            Some(EnabledSpec::Exec(_)) if phase == Phase::Lazy => true,
            Some(EnabledSpec::Exec(command)) => self.exec(command),
        }
    }

    fn condition(&self, phase: Phase, condition: &str, ctx: &ResolutionContext) -> bool {
        if phase == Phase::Lazy {
            match self.evaluator.references(condition) {
                Ok(refs) => {
                    if let Some(unknown) = refs.iter().find(|r| !ctx.contains_key(r)) {
                        debug!(%condition, %unknown, "Condition undecided; provisionally enabled");
                        return true;
                    }
                }
                // Reported by the final phase.
                Err(_) => return true,
            }
        }

        match self.evaluator.evaluate(condition, ctx) {
            Ok(holds) => holds,
            Err(e) => {
                warn!(%condition, error = %e, "Condition unavailable; treating as disabled");
                false
            }
        }
    }

    /// Enabled when the command succeeds and its output, if any, is truthy.
    fn exec(&self, command: &str) -> bool {
        match self.runner.run_shell(command, self.cwd) {
            Ok(output) if output.success() => {
                output.stdout.trim().is_empty() || truthy(Some(&sniff(&output.stdout)))
            }
            Ok(output) => {
                debug!(%command, status = ?output.status, "Enablement command returned non-zero");
                false
            }
            Err(e) => {
                warn!(%command, error = %e, "Enablement command failed; treating as disabled");
                false
            }
        }
    }
}
