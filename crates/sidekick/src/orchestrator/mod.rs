//! A coordinator agent that hands subtasks to specialist agents.
//!
//! Every specialist is a complete session of its own. The coordinator sees
//! each one as a tool taking `{ "task": ... }`; specialists have no
//! delegation tools themselves, so delegation is one level deep.

pub mod tools;

use std::time::Duration;

use crate::session::{Session, SessionBuilder};

/// Longest time a specialist may work on one delegated task.
pub const TASK_TIMEOUT: Duration = Duration::from_secs(300);

const COORDINATOR_PROMPT: &str = include_str!("../prompts/coordinator.md");

/// The specialists on the coordinator's team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Specialist {
    Research,
    Analysis,
    Code,
    Report,
}

impl Specialist {
    pub const ALL: [Specialist; 4] = [
        Specialist::Research,
        Specialist::Analysis,
        Specialist::Code,
        Specialist::Report,
    ];

    /// Name of the tool the coordinator calls to delegate.
    pub fn tool_name(self) -> &'static str {
        match self {
            Specialist::Research => "research_agent",
            Specialist::Analysis => "analysis_agent",
            Specialist::Code => "code_agent",
            Specialist::Report => "report_agent",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Specialist::Research => "Research Agent",
            Specialist::Analysis => "Analysis Agent",
            Specialist::Code => "Code Agent",
            Specialist::Report => "Report Agent",
        }
    }

    /// System prompt of the specialist, also shown to the coordinator.
    pub fn prompt(self) -> &'static str {
        match self {
            Specialist::Research => {
                "You are a research specialist. Your job is to gather information, search for data, \
                 and provide comprehensive research findings. You excel at finding relevant information \
                 and synthesizing multiple sources."
            }
            Specialist::Analysis => {
                "You are a data analysis specialist. Your job is to analyze information, identify \
                 patterns, draw insights, and make recommendations based on data. You excel at \
                 statistical analysis and finding meaningful insights."
            }
            Specialist::Code => {
                "You are a software development specialist. Your job is to write code, review existing \
                 code, suggest improvements, and solve programming challenges. You excel at multiple \
                 programming languages and best practices."
            }
            Specialist::Report => {
                "You are a documentation and reporting specialist. Your job is to create clear, \
                 well-structured reports, documentation, and presentations. You excel at organizing \
                 information and communicating clearly."
            }
        }
    }
}

/// Runs tasks through the coordinator.
pub struct Orchestrator {
    coordinator: Session,
    specialists: Vec<(Specialist, Session)>,
}

impl Orchestrator {
    /// Builds the team.
    ///
    /// `specialist` returns a builder with the model provider and tools for
    /// each specialist; prompts and labels are filled in here. The
    /// coordinator builder gets one delegation tool per specialist.
    pub fn build<F>(coordinator: SessionBuilder, specialist: F) -> Self
    where
        F: FnMut(Specialist) -> SessionBuilder,
    {
        Self::build_with_timeout(coordinator, specialist, TASK_TIMEOUT)
    }

    pub fn build_with_timeout<F>(
        coordinator: SessionBuilder,
        mut specialist: F,
        timeout: Duration,
    ) -> Self
    where
        F: FnMut(Specialist) -> SessionBuilder,
    {
        let specialists: Vec<(Specialist, Session)> = Specialist::ALL
            .into_iter()
            .map(|kind| {
                let session = specialist(kind)
                    .with_system_prompt(kind.prompt())
                    .with_label(kind.tool_name())
                    .build();
                debug!("{} ready", kind.title());
                (kind, session)
            })
            .collect();

        let coordinator = coordinator
            .with_system_prompt(COORDINATOR_PROMPT)
            .with_tools(tools::delegation_registry(&specialists, timeout))
            .with_label("task_coordinator")
            .build();
        info!("coordinator ready with {} specialists", specialists.len());
        Self {
            coordinator,
            specialists,
        }
    }

    #[inline]
    pub fn coordinator(&self) -> &Session {
        &self.coordinator
    }

    pub fn specialist(&self, kind: Specialist) -> Option<&Session> {
        self.specialists
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, session)| session)
    }

    /// Runs a task to completion. Failures are reported in the returned
    /// text.
    pub async fn execute_task(&self, task: &str) -> String {
        info!("executing task: {task}");
        match self.coordinator.query(task).await {
            Ok(answer) if answer.trim().is_empty() => "No response received.".to_owned(),
            Ok(answer) => answer,
            Err(err) => {
                error!("task failed: {err}");
                format!("Error executing task: {err}")
            }
        }
    }

    /// Starts over with every agent.
    pub fn reset(&self) {
        self.coordinator.reset();
        for (_, session) in &self.specialists {
            session.reset();
        }
    }
}
