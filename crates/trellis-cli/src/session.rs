//! Wires the production adapters into an [`Orchestrator`].

use trellis_adapters::{
    CompositeFetcher, HttpFetcherConfig, JsonSchemaValidator, LocalFilesystem, ScriptedPrompter,
    ShellCommandRunner, SimpleRenderer, builtin_registry,
};
use trellis_core::application::{HookRegistry, Orchestrator, Ports, PromptCollector};

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::progress::ProgressHooks;

/// An orchestrator that runs tasks, asking through `prompter`.
pub fn orchestrator(
    config: &AppConfig,
    prompter: Box<dyn PromptCollector>,
    show_progress: bool,
) -> CliResult<Orchestrator> {
    let mut hooks = HookRegistry::new();
    if show_progress {
        hooks.register(Box::new(ProgressHooks::stderr()));
    }
    Ok(Orchestrator::new(ports(config, prompter)?, builtin_registry()).with_hooks(hooks))
}

/// An orchestrator for commands that only load and inspect documents.
pub fn inspector(config: &AppConfig) -> CliResult<Orchestrator> {
    orchestrator(config, Box::new(ScriptedPrompter::default()), false)
}

fn ports(config: &AppConfig, prompter: Box<dyn PromptCollector>) -> CliResult<Ports> {
    let mut http = HttpFetcherConfig {
        timeout: config.fetch.timeout(),
        ..HttpFetcherConfig::default()
    };
    if let Some(agent) = &config.fetch.user_agent {
        http.user_agent = agent.clone();
    }

    Ok(Ports {
        fetcher: Box::new(CompositeFetcher::standard(http)?),
        filesystem: Box::new(LocalFilesystem::new()),
        runner: Box::new(ShellCommandRunner::new(config.execution.command_timeout())),
        renderer: Box::new(SimpleRenderer::new()),
        prompter,
        schema: Some(Box::new(JsonSchemaValidator::builtin()?)),
    })
}
