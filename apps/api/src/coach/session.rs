//! Coach Session — owns one conversation and runs the reply pipeline.
//!
//! Flow: user text → history append → context prompt → completer →
//!       stager → each unit appended to history as it is delivered →
//!       one trim when the delivery cycle ends.
//!
//! CRITICAL: a failed completion appends nothing but the user's own message.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coach::history::ConversationHistory;
use crate::coach::message::Message;
use crate::coach::prompt::{build_context_prompt, DEFAULT_CONTEXT_WINDOW};
use crate::coach::stager::{StagedUnits, Stager, DEFAULT_BUBBLE_DELAY};
use crate::coach::text::sanitize;
use crate::llm_client::{GenerationConfig, LlmError, TextCompleter};

pub const DEFAULT_MAX_HISTORY: usize = 10;

pub const WELCOME_MESSAGE: &str = "What's up! I'm your personal hair coach. \
I can help you with styling tips, hair care advice, and finding the perfect look for you. \
Ask me anything!";

pub const STARTER_QUESTIONS: &[&str] = &[
    "What's the best haircut for my face shape?",
    "What hair colour suits me?",
    "How can I make my hair look thicker?",
    "What products should I use for my hair type?",
    "How often should I wash my hair?",
];

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Coach is not configured: Gemini API key is missing")]
    Unconfigured,

    #[error("Completion failed: {0}")]
    Completion(#[from] LlmError),
}

/// Tunables for one conversation.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub generation: GenerationConfig,
    /// History capacity `H`, enforced once per delivery cycle.
    pub max_history: usize,
    /// Number of recent messages rendered into each prompt.
    pub context_window: usize,
    pub bubble_delay: Duration,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            max_history: DEFAULT_MAX_HISTORY,
            context_window: DEFAULT_CONTEXT_WINDOW,
            bubble_delay: DEFAULT_BUBBLE_DELAY,
        }
    }
}

pub struct CoachSession {
    history: ConversationHistory,
    config: CoachConfig,
    stager: Stager,
    completer: Arc<dyn TextCompleter>,
}

impl CoachSession {
    /// Starts a conversation seeded with the coach greeting.
    pub fn new(config: CoachConfig, completer: Arc<dyn TextCompleter>) -> Self {
        Self {
            history: ConversationHistory::seeded(Message::assistant(WELCOME_MESSAGE)),
            stager: Stager::new(config.bubble_delay),
            config,
            completer,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        info!("Clearing {} coach messages", self.history.len());
        self.history.clear();
    }

    pub fn starter_questions() -> &'static [&'static str] {
        STARTER_QUESTIONS
    }

    /// Records the user message, asks the completer for a reply and stages it.
    ///
    /// The user text is sanitized like model output before it is stored.
    /// Nothing is appended when the text is blank or the completer is
    /// unconfigured. On completer failure only the user message remains.
    pub async fn request_reply(&mut self, text: &str) -> Result<StagedUnits, ChatError> {
        let text = sanitize(text);
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if !self.completer.is_configured() {
            warn!("Coach message rejected: completion backend is unconfigured");
            return Err(ChatError::Unconfigured);
        }

        self.history.append(Message::user(text.as_str()));

        let recent = self.history.context_window(self.config.context_window);
        let prompt = build_context_prompt(&text, &recent);
        debug!(
            "Built coach prompt with {} context messages ({} chars)",
            recent.len(),
            prompt.len()
        );

        let raw = self
            .completer
            .complete(&prompt, &self.config.generation)
            .await?;

        let units = self.stager.stage(&raw);
        info!("Staged coach reply into {} units", units.remaining());
        Ok(units)
    }

    /// Starts delivering `units`, appending each to history as it is handed out.
    pub fn deliver(&mut self, units: StagedUnits) -> StagedReply<'_> {
        StagedReply {
            history: &mut self.history,
            units,
            max_history: self.config.max_history,
            finished: false,
        }
    }
}

/// One delivery cycle in progress.
///
/// Each unit is appended to history right before it is yielded. History is
/// trimmed exactly once, when the cycle ends: exhaustion, `cancel`, or drop.
/// Cancelling keeps the units already delivered.
pub struct StagedReply<'a> {
    history: &'a mut ConversationHistory,
    units: StagedUnits,
    max_history: usize,
    finished: bool,
}

impl StagedReply<'_> {
    /// Next unit, after the pacing delay. Cancel-safe.
    pub async fn next(&mut self) -> Option<Message> {
        if self.finished {
            return None;
        }
        match self.units.next().await {
            Some(message) => {
                self.history.append(message.clone());
                Some(message)
            }
            None => {
                self.finish();
                None
            }
        }
    }

    /// Stops delivery now. Delivered units stay in history.
    pub fn cancel(&mut self) {
        self.units.cancel();
        self.finish();
    }

    /// Token that cancels this delivery from another task. The cycle
    /// finishes on the next call to `next`.
    pub fn cancellation(&self) -> CancellationToken {
        self.units.cancellation()
    }

    pub fn delivered(&self) -> usize {
        self.units.delivered()
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let evicted = self.history.trim(self.max_history);
        debug!(
            "Delivery cycle ended: delivered={}, cancelled={}, evicted={evicted}",
            self.units.delivered(),
            self.units.is_cancelled()
        );
    }
}

impl Drop for StagedReply<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
