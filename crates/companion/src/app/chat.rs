use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::quiz::QuizTranscript;

const DEFAULT_SYSTEM_PROMPT: &str = "You are Buddy, a small companion that lives on the \
user's desktop. Keep replies short and conversational, expand only when asked, and give \
practical advice when the user asks a question. You may receive a list of quiz questions \
and the user's answers; use them to adjust your personality gradually toward what would \
help this person most.";

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ChatError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion returned no text")]
    EmptyResponse,
    #[error("chat worker is not running")]
    WorkerStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One completion call: the full history plus model limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ChatRequest {
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ChatSettings {
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) system_prompt: String,
    /// Chat-completions URL used when an API key is available.
    pub(crate) endpoint: String,
    /// Environment variable holding the bearer token. Unset or blank means
    /// the offline client answers instead.
    pub(crate) api_key_env: String,
    pub(crate) request_timeout_seconds: u64,
    /// Canned replies for the offline client, used in order and then repeated.
    pub(crate) scripted_replies: Vec<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".to_string(),
            max_tokens: 50,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            request_timeout_seconds: 30,
            scripted_replies: vec![
                "Hey! I'm right here if you want to talk.".to_string(),
                "Sounds good. Maybe take a short break from the screen soon?".to_string(),
                "Tell me more, I'm listening.".to_string(),
            ],
        }
    }
}

/// Text-completion backend. Called from the chat worker thread.
pub(crate) trait CompletionClient: Send {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, ChatError>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, ChatError> {
        (**self).complete(request)
    }
}

/// Offline client that answers from a fixed list of replies.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedCompletion {
    replies: Vec<String>,
    next: usize,
}

impl ScriptedCompletion {
    pub(crate) fn new(replies: Vec<String>) -> Self {
        Self { replies, next: 0 }
    }
}

impl CompletionClient for ScriptedCompletion {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, ChatError> {
        if self.replies.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        let reply = self.replies[self.next % self.replies.len()].clone();
        self.next = self.next.wrapping_add(1);
        debug!(
            model = request.model.as_str(),
            message_count = request.messages.len(),
            "scripted_completion"
        );
        Ok(reply)
    }
}

/// Conversation history plus the client that extends it.
pub(crate) struct ChatSession<C> {
    client: C,
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

impl<C: CompletionClient> ChatSession<C> {
    pub(crate) fn new(client: C, settings: &ChatSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            messages: vec![ChatMessage::new(Role::System, settings.system_prompt.clone())],
        }
    }

    pub(crate) fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Appends `text` as a user message and, on success, the assistant reply.
    /// A failed completion keeps the user message in the history.
    pub(crate) fn submit_user(&mut self, text: &str) -> Result<String, ChatError> {
        self.messages.push(ChatMessage::new(Role::User, text));
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: self.messages.clone(),
        };
        let reply = self.client.complete(&request)?;
        if reply.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        self.messages
            .push(ChatMessage::new(Role::Assistant, reply.clone()));
        Ok(reply)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatJob {
    UserMessage(String),
    QuizResults(QuizTranscript),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatEvent {
    Reply(String),
    /// Quiz replies only shape the conversation; they are not shown.
    QuizAbsorbed,
    Failed(ChatError),
}

/// Runs a [`ChatSession`] on its own thread so completions never block the
/// frame loop.
pub(crate) struct ChatWorker {
    jobs: Option<Sender<ChatJob>>,
    events: Receiver<ChatEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ChatWorker {
    pub(crate) fn spawn<C>(session: ChatSession<C>) -> std::io::Result<Self>
    where
        C: CompletionClient + 'static,
    {
        let (job_sender, job_receiver) = mpsc::channel::<ChatJob>();
        let (event_sender, event_receiver) = mpsc::channel::<ChatEvent>();
        let handle = thread::Builder::new()
            .name("chat_worker".to_string())
            .spawn(move || run_worker(session, job_receiver, event_sender))?;
        Ok(Self {
            jobs: Some(job_sender),
            events: event_receiver,
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(&self, job: ChatJob) -> Result<(), ChatError> {
        let Some(jobs) = &self.jobs else {
            return Err(ChatError::WorkerStopped);
        };
        jobs.send(job).map_err(|_| ChatError::WorkerStopped)
    }

    pub(crate) fn try_next_event(&self) -> Option<ChatEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    fn next_event_blocking(&self) -> Option<ChatEvent> {
        self.events
            .recv_timeout(std::time::Duration::from_secs(5))
            .ok()
    }
}

impl Drop for ChatWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("chat_worker_panicked");
            }
        }
    }
}

fn run_worker<C: CompletionClient>(
    mut session: ChatSession<C>,
    jobs: Receiver<ChatJob>,
    events: Sender<ChatEvent>,
) {
    info!("chat_worker_started");
    for job in jobs {
        let event = match job {
            ChatJob::UserMessage(text) => match session.submit_user(&text) {
                Ok(reply) => ChatEvent::Reply(reply),
                Err(error) => ChatEvent::Failed(error),
            },
            ChatJob::QuizResults(transcript) => match session.submit_user(transcript.as_str()) {
                Ok(_) => ChatEvent::QuizAbsorbed,
                Err(error) => ChatEvent::Failed(error),
            },
        };
        if let ChatEvent::Failed(error) = &event {
            warn!(error = %error, "chat_completion_failed");
        }
        if events.send(event).is_err() {
            break;
        }
    }
    info!(
        message_count = session.history().len(),
        "chat_worker_stopped"
    );
}
