use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use core_types::{Agent, AgentQuery, ToastVariant};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::StudioContext;
use crate::error::{ServiceError, ServiceResult};

pub const SIMULATED_USER_LINE: &str = "Hello, can you help me with my question?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageMode {
    #[default]
    Selection,
    Chat,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl UsageMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageState {
    pub mode: UsageMode,
    pub messages: Vec<UsageMessage>,
    pub listening: bool,
    pub speaking: bool,
    pub loading: bool,
}

/// Delays of the simulated voice exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTimings {
    pub listen: Duration,
    pub reply_delay: Duration,
    pub speak: Duration,
}

impl Default for VoiceTimings {
    fn default() -> Self {
        Self {
            listen: Duration::from_secs(3),
            reply_delay: Duration::from_millis(500),
            speak: Duration::from_secs(2),
        }
    }
}

/// One "use this agent" dialog: text chat against the query backend or a
/// simulated voice call.
#[derive(Clone)]
pub struct UsageSession {
    ctx: StudioContext,
    agent: Agent,
    state: Arc<Mutex<UsageState>>,
    timings: VoiceTimings,
}

impl UsageSession {
    pub fn new(ctx: StudioContext, agent: Agent) -> Self {
        Self {
            ctx,
            agent,
            state: Arc::new(Mutex::new(UsageState::default())),
            timings: VoiceTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: VoiceTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn snapshot(&self) -> UsageState {
        self.state.lock().clone()
    }

    pub fn start_chat(&self) {
        self.start(UsageMode::Chat, "usage.chat_started.title", "usage.chat_started.desc");
    }

    pub fn start_voice(&self) {
        self.start(UsageMode::Voice, "usage.voice_started.title", "usage.voice_started.desc");
    }

    fn start(&self, mode: UsageMode, title_key: &str, desc_key: &str) {
        {
            let mut state = self.state.lock();
            state.mode = mode;
            state.messages = vec![UsageMessage::new(Sender::Agent, self.agent.greeting())];
        }
        debug!(agent_id = %self.agent.id, ?mode, "usage session started");
        let description = self
            .ctx
            .toaster
            .format(desc_key, &[("name", self.agent.name.as_str())]);
        self.ctx
            .toaster
            .emit(ToastVariant::Default, title_key, description);
    }

    /// Sends one chat line and appends the agent's reply. Blank input is ignored.
    pub async fn send_message(&self, text: &str) -> ServiceResult<Option<UsageMessage>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        {
            let mut state = self.state.lock();
            state.messages.push(UsageMessage::new(Sender::User, text));
            state.loading = true;
        }

        let query = AgentQuery {
            agent_id: self.agent.id,
            message: text.to_owned(),
        };
        let outcome = match self.ctx.extractor().query_agent(&query).await {
            Ok(result) if result.success && !result.response.is_empty() => Ok(result.response),
            Ok(result) => Err(result.error.filter(|message| !message.is_empty())),
            Err(err) => Err(Some(err.to_string())),
        };

        let mut state = self.state.lock();
        state.loading = false;
        match outcome {
            Ok(response) => {
                let reply = UsageMessage::new(Sender::Agent, response);
                state.messages.push(reply.clone());
                Ok(Some(reply))
            }
            Err(message) => {
                drop(state);
                let message =
                    message.unwrap_or_else(|| self.ctx.toaster.t("usage.agent_error.desc"));
                warn!(agent_id = %self.agent.id, error = %message, "agent query failed");
                Err(self
                    .ctx
                    .report("usage.agent_error", ServiceError::Agent(message)))
            }
        }
    }

    /// Fabricated voice turn: listen, hear a fixed question, answer, speak.
    pub async fn simulate_listening(&self) {
        self.state.lock().listening = true;
        self.ctx.toaster.show(
            ToastVariant::Default,
            "usage.listening.title",
            "usage.listening.desc",
        );

        tokio::time::sleep(self.timings.listen).await;
        {
            let mut state = self.state.lock();
            state.listening = false;
            state
                .messages
                .push(UsageMessage::new(Sender::User, SIMULATED_USER_LINE));
        }

        tokio::time::sleep(self.timings.reply_delay).await;
        {
            let mut state = self.state.lock();
            state.speaking = true;
            state.messages.push(UsageMessage::new(
                Sender::Agent,
                format!(
                    "Of course! I'm {} and I'd be happy to help you. What would you like to know?",
                    self.agent.name
                ),
            ));
        }

        tokio::time::sleep(self.timings.speak).await;
        self.state.lock().speaking = false;
    }

    pub fn close(&self) {
        *self.state.lock() = UsageState::default();
    }
}
