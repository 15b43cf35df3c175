use std::fmt::Write;
use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};
use tokio::task::spawn_blocking;

use super::{
    KnowledgeBase, Priority, SupportError, TOP_K_RESULTS, TicketStatus,
    TicketStore,
};

/// Characters of each article shown in search results.
const PREVIEW_CHARS: usize = 300;
const MAX_TOP_K: usize = 10;

/// Runs blocking store operations off the async runtime.
async fn run<S, T, F>(state: Arc<S>, action: &'static str, f: F) -> Result<T, ToolError>
where
    S: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, SupportError> + Send + 'static,
{
    let result = spawn_blocking(move || f(&state)).await.map_err(|err| {
        ToolError::execution_error().with_reason(format!("could not {action}: {err}"))
    })?;
    result.map_err(|err| {
        warn!("could not {action}: {err}");
        if err.is_invalid_input() {
            ToolError::invalid_input().with_reason(err.to_string())
        } else {
            ToolError::execution_error().with_reason(format!("could not {action}: {err}"))
        }
    })
}

/// Registers the knowledge base and ticket tools.
pub fn registry(tickets: Arc<TicketStore>, knowledge: Arc<KnowledgeBase>) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(SearchKnowledgeTool::new(knowledge))
        .with_tool(CreateTicketTool::new(Arc::clone(&tickets)))
        .with_tool(GetTicketTool::new(Arc::clone(&tickets)))
        .with_tool(UpdateTicketTool::new(tickets))
}

#[derive(Deserialize, JsonSchema)]
pub struct SearchInput {
    #[schemars(description = "Search query.")]
    query: String,
    #[schemars(description = "Number of results to return (default 3).")]
    top_k: Option<usize>,
}

pub struct SearchKnowledgeTool {
    knowledge: Arc<KnowledgeBase>,
    parameter_schema: Value,
}

impl SearchKnowledgeTool {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge,
            parameter_schema: schema_for!(SearchInput).to_value(),
        }
    }
}

impl Tool for SearchKnowledgeTool {
    type Input = SearchInput;

    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "Search the knowledge base for product information, FAQs, and troubleshooting guides."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let knowledge = Arc::clone(&self.knowledge);
        let top_k = input.top_k.unwrap_or(TOP_K_RESULTS).clamp(1, MAX_TOP_K);
        async move {
            let hits = run(knowledge, "search knowledge base", move |kb| {
                kb.ensure_loaded()?;
                kb.search(&input.query, top_k)
            })
            .await?;
            if hits.is_empty() {
                return Ok(
                    "No relevant information found in knowledge base for your query."
                        .to_owned(),
                );
            }

            let mut out = format!("Found {} relevant articles:\n\n", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                let preview: String = hit.content.chars().take(PREVIEW_CHARS).collect();
                let _ = writeln!(out, "{}. {preview}...", i + 1);
                let _ = writeln!(out, "   Source: {}\n", hit.source);
            }
            Ok(out)
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct CreateTicketInput {
    #[schemars(description = "Ticket subject.")]
    subject: String,
    #[schemars(description = "Detailed description of the problem.")]
    description: String,
    #[schemars(description = "Priority level (low, medium, high, critical). Defaults to medium.")]
    priority: Option<Priority>,
    #[schemars(description = "Customer email, if known.")]
    customer_email: Option<String>,
}

pub struct CreateTicketTool {
    tickets: Arc<TicketStore>,
    parameter_schema: Value,
}

impl CreateTicketTool {
    pub fn new(tickets: Arc<TicketStore>) -> Self {
        Self {
            tickets,
            parameter_schema: schema_for!(CreateTicketInput).to_value(),
        }
    }
}

impl Tool for CreateTicketTool {
    type Input = CreateTicketInput;

    fn name(&self) -> &str {
        "create_ticket"
    }

    fn description(&self) -> &str {
        "Create a new support ticket for issues that need human review."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CreateTicketInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let tickets = Arc::clone(&self.tickets);
        let priority = input.priority.unwrap_or_default();
        async move {
            let ticket = run(tickets, "create ticket", move |store| {
                store.create(
                    &input.subject,
                    &input.description,
                    priority,
                    input.customer_email.as_deref(),
                )
            })
            .await?;
            Ok(format!(
                "Support ticket {} created successfully with {priority} priority. \
                 A team member will review it soon.",
                ticket.id
            ))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct GetTicketInput {
    #[schemars(description = "Ticket ID (format: TKT-YYYYMMDDHHMMSS).")]
    ticket_id: String,
}

pub struct GetTicketTool {
    tickets: Arc<TicketStore>,
    parameter_schema: Value,
}

impl GetTicketTool {
    pub fn new(tickets: Arc<TicketStore>) -> Self {
        Self {
            tickets,
            parameter_schema: schema_for!(GetTicketInput).to_value(),
        }
    }
}

impl Tool for GetTicketTool {
    type Input = GetTicketInput;

    fn name(&self) -> &str {
        "get_ticket"
    }

    fn description(&self) -> &str {
        "Get information about an existing support ticket."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GetTicketInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let tickets = Arc::clone(&self.tickets);
        async move {
            let ticket =
                run(tickets, "get ticket", move |store| store.get(&input.ticket_id))
                    .await?;
            Ok(ticket.to_string())
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct UpdateTicketInput {
    #[schemars(description = "Ticket ID.")]
    ticket_id: String,
    #[schemars(description = "New status: open, in_progress, resolved or closed.")]
    status: Option<TicketStatus>,
    #[schemars(description = "Note to add.")]
    note: Option<String>,
}

pub struct UpdateTicketTool {
    tickets: Arc<TicketStore>,
    parameter_schema: Value,
}

impl UpdateTicketTool {
    pub fn new(tickets: Arc<TicketStore>) -> Self {
        Self {
            tickets,
            parameter_schema: schema_for!(UpdateTicketInput).to_value(),
        }
    }
}

impl Tool for UpdateTicketTool {
    type Input = UpdateTicketInput;

    fn name(&self) -> &str {
        "update_ticket"
    }

    fn description(&self) -> &str {
        "Update a ticket's status or add a note."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: UpdateTicketInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let tickets = Arc::clone(&self.tickets);
        async move {
            let id = input.ticket_id.trim().to_owned();
            let update = {
                let id = id.clone();
                run(tickets, "update ticket", move |store| {
                    store.update(&id, input.status, input.note.as_deref())
                })
                .await?
            };
            Ok(update.describe(&id))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sidekick_core::tool::{ErrorKind, render_result};
    use sidekick_model::ToolCallRequest;

    use super::*;

    fn call(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_ticket_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let tickets = Arc::new(TicketStore::open(dir.path().join("tickets")).unwrap());
        let knowledge = Arc::new(KnowledgeBase::open_in_memory(dir.path()).unwrap());
        let registry = registry(Arc::clone(&tickets), knowledge);

        let created = registry
            .call(&call(
                "create_ticket",
                json!({"subject": "Broken", "description": "It broke", "priority": "critical"}),
            ))
            .await
            .unwrap();
        assert!(created.ends_with(
            "created successfully with critical priority. A team member will review it soon."
        ));
        let id = created
            .strip_prefix("Support ticket ")
            .and_then(|rest| rest.split(' ').next())
            .unwrap()
            .to_owned();

        let updated = registry
            .call(&call("update_ticket", json!({"ticket_id": id, "status": "resolved"})))
            .await
            .unwrap();
        assert_eq!(updated, format!("Ticket {id} updated: status changed to resolved"));

        let shown = registry
            .call(&call("get_ticket", json!({"ticket_id": id})))
            .await
            .unwrap();
        assert!(shown.contains("  Status: resolved\n  Priority: critical\n"));

        let missing = registry
            .call(&call("get_ticket", json!({"ticket_id": "TKT-19990101000000"})))
            .await;
        assert_eq!(missing.as_ref().unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(render_result(&missing), "Error: Ticket TKT-19990101000000 not found.");

        let bad_status = registry
            .call(&call("update_ticket", json!({"ticket_id": id, "status": "done"})))
            .await;
        assert_eq!(bad_status.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_knowledge_search_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faq.md"), "Reset your password from the login page.")
            .unwrap();
        let tickets = Arc::new(TicketStore::open(dir.path().join("tickets")).unwrap());
        let knowledge = Arc::new(KnowledgeBase::open_in_memory(dir.path()).unwrap());
        let registry = registry(tickets, knowledge);

        let found = registry
            .call(&call("search_knowledge_base", json!({"query": "reset password"})))
            .await
            .unwrap();
        assert_eq!(
            found,
            "Found 1 relevant articles:\n\n1. Reset your password from the login page....\n   Source: faq.md\n\n"
        );
    }
}
