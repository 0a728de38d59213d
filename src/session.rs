//! Per-user conversation state
//!
//! Sessions live in a moka cache with time-to-idle eviction. Each session sits
//! behind its own async mutex, which serializes the messages of one user while
//! different users proceed in parallel.

use crate::idea::Verdict;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// What the bot expects from the user next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Main menu
    #[default]
    Idle,
    /// Waiting for a free-form idea
    AwaitingIdea,
    /// Waiting for an agent name to search for
    AwaitingAgentName,
    /// Waiting for a topic to find responsible people for
    AwaitingHelperQuery,
    /// Filling the template; `step` is the next field index
    FillingTemplate {
        /// Zero-based index into the template fields
        step: usize,
    },
}

/// Conversation state of one user
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current mode
    pub mode: Mode,
    /// Template answers in field order
    pub form: Vec<(String, String)>,
    /// Last idea sent for a uniqueness check
    pub last_idea: Option<String>,
    /// LLM reply for the last check
    pub summary: Option<String>,
    /// Verdict of the last check
    pub verdict: Option<Verdict>,
}

impl Session {
    /// Returns to the menu and drops collected answers; the last check result is kept
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.form.clear();
    }

    /// Starts the template at `step` with answers already collected
    pub fn start_template(&mut self, form: Vec<(String, String)>) {
        self.mode = Mode::FillingTemplate { step: form.len() };
        self.form = form;
    }
}

/// Shared handle to one session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Session cache keyed by transport-qualified user id
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<String, SessionHandle>,
}

impl SessionStore {
    /// Creates a store evicting sessions idle for `ttl_secs`
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(Duration::from_secs(ttl_secs))
            .build();
        Self { cache }
    }

    /// Returns the session of `user_id`, creating an idle one if needed
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        self.cache
            .get_with(user_id.to_string(), async {
                Arc::new(Mutex::new(Session::default()))
            })
            .await
    }

    /// Forgets the session of `user_id`
    pub async fn remove(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether there are no live sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
