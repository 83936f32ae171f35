//! Conversation history for a single chat session
//!
//! A conversation is an append-only list of turns. When it is replayed to the model, only the
//! newest turns that fit the [`ContextBudget`] are used; older turns are dropped first and the
//! order is never changed.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
    strum_macros::EnumIs,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Size used for the character budget
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: \"{}\"", self.role, self.content)
    }
}

/// Upper bounds on how much history is passed to the model
///
/// Both bounds apply at the same time; `None` disables a bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub max_turns: Option<usize>,
    pub max_chars: Option<usize>,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_turns: Some(20),
            max_chars: Some(24_000),
        }
    }
}

impl ContextBudget {
    pub fn unbounded() -> Self {
        Self {
            max_turns: None,
            max_chars: None,
        }
    }

    pub fn turns(max_turns: usize) -> Self {
        Self {
            max_turns: Some(max_turns),
            max_chars: None,
        }
    }

    pub fn chars(max_chars: usize) -> Self {
        Self {
            max_turns: None,
            max_chars: Some(max_chars),
        }
    }
}

/// Snapshot of a conversation's bookkeeping
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub session_id: Uuid,
    pub turn_count: usize,
    pub total_chars: usize,
    /// Number of turns that would currently be sent as context
    pub context_turns: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Conversation {
    session_id: Uuid,
    turns: Vec<Turn>,
    budget: ContextBudget,
    total_chars: usize,
    created_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(ContextBudget::default())
    }
}

impl Conversation {
    pub fn new(budget: ContextBudget) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            turns: Vec::new(),
            budget,
            total_chars: 0,
            created_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    /// Replaces the budget. Stored turns are kept; only what `context` returns changes.
    pub fn set_budget(&mut self, budget: ContextBudget) -> &mut Self {
        self.budget = budget;
        self
    }

    pub fn append(&mut self, turn: Turn) {
        self.total_chars += turn.char_count();
        self.turns.push(turn);
    }

    /// Records both sides of one exchange
    pub fn append_exchange(&mut self, user: Turn, assistant: Turn) {
        self.append(user);
        self.append(assistant);
    }

    /// All turns ever appended since the last clear
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The newest turns that fit the budget, in insertion order
    pub fn context(&self) -> &[Turn] {
        let max_turns = self.budget.max_turns.unwrap_or(usize::MAX);
        let max_chars = self.budget.max_chars.unwrap_or(usize::MAX);

        let mut start = self.turns.len();
        let mut chars = 0usize;

        for turn in self.turns.iter().rev() {
            let kept = self.turns.len() - start;
            if kept >= max_turns {
                break;
            }

            let next = chars.saturating_add(turn.char_count());
            if next > max_chars {
                break;
            }

            chars = next;
            start -= 1;
        }

        &self.turns[start..]
    }

    /// Drops all turns and starts over under a new session id
    pub fn clear(&mut self) {
        self.turns.clear();
        self.total_chars = 0;
        self.session_id = Uuid::new_v4();
        self.created_at = Utc::now();

        tracing::debug!(session_id = %self.session_id, "Conversation cleared");
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            session_id: self.session_id,
            turn_count: self.turns.len(),
            total_chars: self.total_chars,
            context_turns: self.context().len(),
            created_at: self.created_at,
        }
    }
}
