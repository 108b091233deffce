//! Request pipeline
//!
//! One entry point ties the engine together: attach file context when the
//! request asks for it, classify, route to the nature's model chain, then
//! either generate a report (explanatory/report mode) or build and execute
//! a plan. Two rules are load-bearing and enforced here:
//!
//! 1. explanatory requests and report-mode markers ALWAYS produce a report,
//! 2. a plan with no commands executes nothing (`NO_EXEC`).

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::McpConfig;
use crate::context;
use crate::llm::classify::{Classifier, RequestNature};
use crate::llm::plan::{self, ExecutionPlan, OpsReport};
use crate::llm::LlmClient;
use crate::state::StateStore;
use crate::utils::{self, run_shell_with_timeout, CommandResult};

/// Captured result of one executed command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// What handling a request produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode")]
pub enum Outcome {
    #[serde(rename = "NO_EXEC")]
    NoExec { description: String },

    #[serde(rename = "EXECUTE")]
    Execute {
        description: String,
        results: Vec<CommandOutcome>,
        #[serde(skip_serializing_if = "Option::is_none")]
        saved_to: Option<String>,
    },

    #[serde(rename = "REPORT")]
    Report { report: OpsReport },
}

/// The request-handling engine
pub struct Engine {
    config: McpConfig,
    client: LlmClient,
    store: StateStore,
    classifier: Classifier,
}

impl Engine {
    /// Build an engine from config. Fails when no credential is available.
    pub fn new(config: McpConfig) -> Result<Self> {
        let client = LlmClient::from_config(&config)?;
        let store = StateStore::new(config.service.runtime_dir());
        Ok(Self {
            config,
            client,
            store,
            classifier: Classifier::new(),
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    /// Handle one operator request end to end.
    ///
    /// `show_progress` controls the stderr spinner; front-ends that own
    /// stdout for JSON (one-shot, MCP server) still get the spinner on
    /// stderr, non-interactive callers pass false.
    pub fn handle_input(&mut self, input: &str, show_progress: bool) -> Result<Outcome> {
        let spinner = make_spinner(show_progress);

        let file_ctx = if context::should_attach_context(input) {
            context::load_file_context(
                self.store.runtime_dir(),
                self.config.limits.context_max_per_file,
                self.config.limits.context_max_total,
            )
        } else {
            BTreeMap::new()
        };

        let cls = self.classifier.classify(
            &self.client,
            &self.config.models.classifier,
            input,
            &file_ctx,
            spinner.as_ref(),
            Some(&self.store),
        );

        let mut nature = cls.nature;
        if cls.confidence < self.config.models.confidence_threshold {
            nature = RequestNature::Unknown;
        }

        let chain = self.config.models.chain_for(nature);
        let rewritten = cls.rewritten_request;

        let outcome = if nature == RequestNature::Explanatory || context::is_report_mode(input) {
            let report = plan::generate_report(
                &self.client,
                chain,
                &rewritten,
                &file_ctx,
                spinner.as_ref(),
                Some(&self.store),
            )
            .map_err(|e| self.record_chain_failure(e))?;
            Outcome::Report { report }
        } else {
            let plan = plan::build_execution_plan(
                &self.client,
                chain,
                &rewritten,
                &file_ctx,
                spinner.as_ref(),
                Some(&self.store),
            )
            .map_err(|e| self.record_chain_failure(e))?;

            if let Some(pb) = spinner.as_ref() {
                pb.set_message("executing plan");
            }
            self.execute_plan(plan)
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        self.store.touch_activity(utils::now_epoch());
        Ok(outcome)
    }

    fn record_chain_failure(&self, e: anyhow::Error) -> anyhow::Error {
        self.store
            .record_incident("model_chain", &format!("{:#}", e), utils::now_epoch());
        e
    }

    /// Execute a plan's commands sequentially.
    ///
    /// A failing command becomes an incident but does not stop the rest of
    /// the plan; the operator sees every result.
    pub fn execute_plan(&self, plan: ExecutionPlan) -> Outcome {
        if plan.commands.is_empty() {
            let description = if plan.description.is_empty() {
                "No commands to execute".to_string()
            } else {
                plan.description
            };
            return Outcome::NoExec { description };
        }

        let timeout = Duration::from_secs(self.config.limits.command_timeout_secs);
        let mut results = Vec::with_capacity(plan.commands.len());

        for command in &plan.commands {
            let outcome = match run_shell_with_timeout(command, timeout) {
                CommandResult::Success(output) | CommandResult::Failed(output) => CommandOutcome {
                    command: command.clone(),
                    returncode: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                },
                CommandResult::TimedOut => CommandOutcome {
                    command: command.clone(),
                    returncode: -1,
                    stdout: String::new(),
                    stderr: format!("timed out after {}s", timeout.as_secs()),
                },
                CommandResult::SpawnError(e) => CommandOutcome {
                    command: command.clone(),
                    returncode: -1,
                    stdout: String::new(),
                    stderr: e,
                },
            };

            if outcome.returncode != 0 {
                self.store.record_incident(
                    "command",
                    &format!("{}: {}", outcome.command, outcome.stderr),
                    utils::now_epoch(),
                );
            }

            results.push(outcome);
        }

        Outcome::Execute {
            description: plan.description,
            results,
            saved_to: plan.output_file,
        }
    }
}

fn make_spinner(show_progress: bool) -> Option<ProgressBar> {
    if !show_progress {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("spinner template is valid"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::plan::ExecutionPlan;
    use tempfile::tempdir;

    fn test_engine(runtime_dir: &std::path::Path) -> Engine {
        let mut config = McpConfig::default();
        config.service.runtime_dir = Some(runtime_dir.to_path_buf());
        config.limits.command_timeout_secs = 5;
        Engine {
            store: StateStore::new(runtime_dir),
            client: LlmClient::new(&config.cloud.host, "test-key").unwrap(),
            classifier: Classifier::new(),
            config,
        }
    }

    #[test]
    fn test_empty_plan_never_executes() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());

        let outcome = engine.execute_plan(ExecutionPlan {
            description: "unsafe request".to_string(),
            commands: vec![],
            output_file: None,
        });

        match outcome {
            Outcome::NoExec { description } => assert_eq!(description, "unsafe request"),
            other => panic!("expected NoExec, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_plan_collects_results() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());

        let outcome = engine.execute_plan(ExecutionPlan {
            description: "echoes".to_string(),
            commands: vec!["echo one".to_string(), "echo two >&2; exit 1".to_string()],
            output_file: None,
        });

        match outcome {
            Outcome::Execute { results, .. } => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].returncode, 0);
                assert_eq!(results[0].stdout, "one");
                assert_eq!(results[1].returncode, 1);
                assert_eq!(results[1].stderr, "two");
            }
            other => panic!("expected Execute, got {:?}", other),
        }

        // The failing command was recorded
        assert_eq!(engine.store().load_incidents().len(), 1);
    }

    #[test]
    fn test_outcome_serialization_modes() {
        let json = serde_json::to_value(Outcome::NoExec {
            description: "nothing".to_string(),
        })
        .unwrap();
        assert_eq!(json["mode"], "NO_EXEC");

        let json = serde_json::to_value(Outcome::Execute {
            description: "d".to_string(),
            results: vec![],
            saved_to: None,
        })
        .unwrap();
        assert_eq!(json["mode"], "EXECUTE");
        assert!(json.get("saved_to").is_none());

        let json = serde_json::to_value(Outcome::Report {
            report: OpsReport::default(),
        })
        .unwrap();
        assert_eq!(json["mode"], "REPORT");
    }
}
