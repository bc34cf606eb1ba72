//! Application State

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};

use agent_core::{Agent, AgentConfig, LlmProvider, Result, ToolRegistry};
use agent_runtime::settings::DEFAULT_MAX_CONVERSATIONS;

/// One agent per conversation, each behind its own lock so a conversation
/// handles one `chat` at a time while others proceed.
pub type Conversation = Arc<Mutex<Agent>>;

struct Entry {
    agent: Conversation,
    last_used: AtomicU64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider shared by every conversation
    pub provider: Arc<dyn LlmProvider>,

    /// Tool registry shared by every conversation
    pub tools: Arc<ToolRegistry>,

    /// Configuration each new conversation's agent starts from
    pub config: AgentConfig,

    /// Conversations kept before the least recently used one is dropped
    pub max_conversations: usize,

    conversations: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            conversations: Arc::default(),
            clock: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_max_conversations(mut self, max: usize) -> Self {
        self.max_conversations = max.max(1);
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Existing conversation, if any
    pub async fn conversation(&self, id: &str) -> Option<Conversation> {
        let conversations = self.conversations.read().await;
        let entry = conversations.get(id)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.agent.clone())
    }

    /// Existing conversation, or a fresh agent registered under `id`.
    ///
    /// At capacity the least recently used conversation is dropped first; a
    /// turn already running on it finishes against its own handle.
    pub async fn conversation_or_create(&self, id: &str) -> Result<Conversation> {
        if let Some(existing) = self.conversation(id).await {
            return Ok(existing);
        }

        let mut conversations = self.conversations.write().await;
        if let Some(existing) = conversations.get(id) {
            existing.last_used.store(self.tick(), Ordering::Relaxed);
            return Ok(existing.agent.clone());
        }

        while conversations.len() >= self.max_conversations {
            let Some(oldest) = conversations
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            conversations.remove(&oldest);
            tracing::info!(conversation_id = %oldest, "Conversation evicted");
        }

        let agent = Agent::new(self.provider.clone(), self.tools.clone(), self.config.clone())?;
        let conversation = Arc::new(Mutex::new(agent));
        conversations.insert(
            id.to_string(),
            Entry {
                agent: conversation.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        tracing::info!(conversation_id = %id, "Conversation started");
        Ok(conversation)
    }

    /// Forget a conversation; false if it did not exist
    pub async fn remove_conversation(&self, id: &str) -> bool {
        let removed = self.conversations.write().await.remove(id).is_some();
        if removed {
            tracing::info!(conversation_id = %id, "Conversation deleted");
        }
        removed
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}
