use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use sidekick_model::{
    AssistantMessage, ModelMessage, ModelRequest, ToolCallResult,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::builder::{AgentBuilder, IdleFn, TranscriptFn};
use super::{AgentError, TranscriptSource};
use crate::actor::{Actor, Message};
use crate::conversation::{Conversation, Item as ConversationItem};
use crate::model_client::{
    DeltaFn, ModelClient, ModelClientResponse, ProviderError,
};
use crate::tool::{ToolRegistry, render_result};

pub type Reply = oneshot::Sender<Result<String, AgentError>>;

#[derive(Debug)]
pub struct PendingInput {
    pub text: String,
    pub reply: Option<Reply>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum AgentStage {
    #[default]
    Idle,
    ModelThinking,
    RunningTools,
}

/// Bookkeeping of the turn in progress.
struct Turn {
    reply: Option<Reply>,
    // Conversation length before the user message, restored on failure.
    rollback_len: usize,
    steps: usize,
    retries: u32,
    backoff: ExponentialBackoff,
    // One slot per tool call, in request order.
    tool_results: Vec<(String, Option<String>)>,
}

pub struct AgentState {
    model_client: ModelClient,
    tools: Arc<ToolRegistry>,
    system_prompt: Option<String>,
    conversation: Conversation,
    max_history_turns: Option<usize>,
    max_steps: usize,
    max_retries: u32,
    initial_retry_delay: Duration,

    current_stage: AgentStage,
    pending_inputs: VecDeque<PendingInput>,
    turn: Option<Turn>,
    running_tasks: HashMap<u64, JoinHandle<()>>,
    next_task_id: u64,
    // Bumped on reset. Messages from tasks of an older generation are
    // stale and ignored.
    generation: u64,

    on_idle: Option<IdleFn>,
    on_transcript: Option<TranscriptFn>,
    on_message_delta: Option<DeltaFn>,
}

impl AgentState {
    pub fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tools,
            system_prompt,
            max_history_turns,
            max_steps,
            max_retries,
            initial_retry_delay,
            label: _,
            on_idle,
            on_transcript,
            on_message_delta,
        } = builder;

        Self {
            model_client,
            tools: Arc::new(tools),
            system_prompt,
            conversation: Default::default(),
            max_history_turns,
            max_steps,
            max_retries,
            initial_retry_delay,
            current_stage: Default::default(),
            pending_inputs: Default::default(),
            turn: None,
            running_tasks: Default::default(),
            next_task_id: 1,
            generation: 0,
            on_idle,
            on_transcript,
            on_message_delta,
        }
    }

    fn enqueue_user_input(&mut self, input: PendingInput, handle: &Actor<Self>) {
        if self.current_stage != AgentStage::Idle {
            // If we are not in idle stage, just enqueue the input and
            // do nothing else.
            self.pending_inputs.push_back(input);
            return;
        }
        self.start_turn(input, handle);
    }

    fn process_next_input(&mut self, handle: &Actor<Self>) {
        if self.current_stage != AgentStage::Idle {
            // The input will be picked up when the current turn ends.
            return;
        }
        match self.pending_inputs.pop_front() {
            Some(input) => self.start_turn(input, handle),
            None => {
                if let Some(on_idle) = &self.on_idle {
                    on_idle();
                }
            }
        }
    }

    fn start_turn(&mut self, input: PendingInput, handle: &Actor<Self>) {
        if let Some(max_turns) = self.max_history_turns {
            // Leave room for the turn that starts now.
            self.conversation.keep_last_turns(max_turns - 1);
        }
        let rollback_len = self.conversation.len();

        let PendingInput { text, reply } = input;
        debug!("starting a turn ({} chars)", text.len());
        self.emit_transcript(&text, TranscriptSource::User);
        self.conversation.push(ConversationItem::new(
            ModelMessage::User(text.clone()),
            text,
        ));

        self.turn = Some(Turn {
            reply,
            rollback_len,
            steps: 0,
            retries: 0,
            backoff: self.new_backoff(),
            tool_results: vec![],
        });
        self.request_model(handle);
    }

    fn new_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_retry_delay)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Starts the next model call of the turn, counting it as a step.
    fn request_model(&mut self, handle: &Actor<Self>) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if turn.steps >= self.max_steps {
            let err = AgentError::StepLimitExceeded(self.max_steps);
            self.fail_turn(err, handle);
            return;
        }
        turn.steps += 1;
        self.dispatch_request(handle);
    }

    /// Sends the conversation as it is now. Retries come through here
    /// directly, so they do not count as steps.
    fn dispatch_request(&mut self, handle: &Actor<Self>) {
        self.current_stage = AgentStage::ModelThinking;
        let request = ModelRequest {
            messages: self
                .conversation
                .to_messages(self.system_prompt.as_deref()),
            tools: self.tools.definitions(),
        };
        let model_client = self.model_client.clone();
        let on_delta = self.on_message_delta.clone();
        let generation = self.generation;
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let response =
                    model_client.send_request(request, on_delta).await;
                handle_clone
                    .send(ModelRequestFinished {
                        generation,
                        response,
                    })
                    .ok();
            },
            handle,
        );
    }

    fn handle_model_response(
        &mut self,
        response: ModelClientResponse,
        handle: &Actor<Self>,
    ) {
        let ModelClientResponse {
            content,
            tool_calls,
            ..
        } = response;
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        turn.retries = 0;
        turn.backoff.reset();
        turn.tool_results = tool_calls
            .iter()
            .map(|call| (call.id.clone(), None))
            .collect();

        if !content.is_empty() {
            self.emit_transcript(&content, TranscriptSource::Assistant);
        }
        self.conversation.push(ConversationItem::new(
            ModelMessage::Assistant(AssistantMessage {
                content: content.clone(),
                tool_calls: tool_calls.clone(),
            }),
            content.clone(),
        ));

        if tool_calls.is_empty() {
            self.complete_turn(content, handle);
            return;
        }

        self.current_stage = AgentStage::RunningTools;
        debug!("running {} tool calls", tool_calls.len());
        for (index, call) in tool_calls.iter().enumerate() {
            let fut = self.tools.call(call);
            let generation = self.generation;
            let handle_clone = handle.clone();
            self.spawn_task(
                async move {
                    let content = render_result(&fut.await);
                    handle_clone
                        .send(ToolCallFinished {
                            generation,
                            index,
                            content,
                        })
                        .ok();
                },
                handle,
            );
        }
    }

    fn handle_tool_result(
        &mut self,
        index: usize,
        content: String,
        handle: &Actor<Self>,
    ) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if let Some((_, slot)) = turn.tool_results.get_mut(index) {
            *slot = Some(content);
        }
        if turn.tool_results.iter().any(|(_, slot)| slot.is_none()) {
            return;
        }

        // Every call has answered, feed the results back in request order.
        for (id, content) in mem::take(&mut turn.tool_results) {
            let content = content.unwrap_or_default();
            self.conversation.push(ConversationItem::new(
                ModelMessage::Tool(ToolCallResult {
                    id,
                    content: content.clone(),
                }),
                content,
            ));
        }
        self.request_model(handle);
    }

    fn handle_model_error(&mut self, err: ProviderError, handle: &Actor<Self>) {
        let kind = err.kind();
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if kind.is_retryable() && turn.retries < self.max_retries {
            turn.retries += 1;
            let delay = turn
                .backoff
                .next_backoff()
                .unwrap_or(self.initial_retry_delay);
            info!("model request failed ({kind:?}), retrying in {delay:?}");

            let generation = self.generation;
            let handle_clone = handle.clone();
            self.spawn_task(
                async move {
                    tokio::time::sleep(delay).await;
                    handle_clone.send(RetryDue { generation }).ok();
                },
                handle,
            );
            return;
        }

        let err = AgentError::Model {
            kind,
            message: err.to_string(),
        };
        self.fail_turn(err, handle);
    }

    fn complete_turn(&mut self, content: String, handle: &Actor<Self>) {
        if let Some(reply) = self.turn.take().and_then(|turn| turn.reply) {
            reply.send(Ok(content)).ok();
        }
        self.current_stage = AgentStage::Idle;
        self.process_next_input(handle);
    }

    /// Ends the turn with an error, as if the user input never happened.
    fn fail_turn(&mut self, err: AgentError, handle: &Actor<Self>) {
        error!("turn failed: {err}");
        let Some(turn) = self.turn.take() else {
            return;
        };
        self.conversation.truncate(turn.rollback_len);
        let apology = format!("I apologize, but I encountered an error: {err}");
        self.emit_transcript(&apology, TranscriptSource::Assistant);
        if let Some(reply) = turn.reply {
            reply.send(Err(err)).ok();
        }
        self.current_stage = AgentStage::Idle;
        self.process_next_input(handle);
    }

    fn reset(&mut self, handle: &Actor<Self>) {
        debug!("resetting conversation");
        self.generation += 1;
        for (_, task) in self.running_tasks.drain() {
            task.abort();
        }

        let turn_reply = self.turn.take().and_then(|turn| turn.reply);
        let queued_replies = self.pending_inputs.drain(..).filter_map(|i| i.reply);
        for reply in turn_reply.into_iter().chain(queued_replies) {
            reply.send(Err(AgentError::Reset)).ok();
        }

        self.conversation.clear();
        self.current_stage = AgentStage::Idle;
        self.process_next_input(handle);
    }

    #[inline]
    fn emit_transcript(&self, text: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(text, source);
        }
    }

    fn spawn_task<Fut>(&mut self, fut: Fut, handle: &Actor<Self>)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = handle.clone();
        let task = tokio::spawn(async move {
            fut.await;
            handle.send(TaskEnded(task_id)).ok();
        });
        self.running_tasks.insert(task_id, task);
    }
}

#[derive(Debug)]
pub struct EnqueueUserInput(pub PendingInput);

impl Message<AgentState> for EnqueueUserInput {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.enqueue_user_input(self.0, handle);
    }
}

#[derive(Debug)]
pub struct Reset;

impl Message<AgentState> for Reset {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.reset(handle);
    }
}

#[derive(Debug)]
struct ModelRequestFinished {
    generation: u64,
    response: Result<ModelClientResponse, ProviderError>,
}

impl Message<AgentState> for ModelRequestFinished {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        if self.generation != state.generation {
            return;
        }
        match self.response {
            Ok(resp) => state.handle_model_response(resp, handle),
            Err(err) => state.handle_model_error(err, handle),
        }
    }
}

#[derive(Debug)]
struct ToolCallFinished {
    generation: u64,
    index: usize,
    content: String,
}

impl Message<AgentState> for ToolCallFinished {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        if self.generation != state.generation {
            return;
        }
        state.handle_tool_result(self.index, self.content, handle);
    }
}

#[derive(Debug)]
struct RetryDue {
    generation: u64,
}

impl Message<AgentState> for RetryDue {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        if self.generation != state.generation || state.turn.is_none() {
            return;
        }
        state.dispatch_request(handle);
    }
}

#[derive(Debug)]
struct TaskEnded(u64);

impl Message<AgentState> for TaskEnded {
    #[inline]
    fn handle(self, state: &mut AgentState, _handle: &Actor<AgentState>) {
        // Aborted tasks were already removed by a reset.
        state.running_tasks.remove(&self.0);
    }
}
