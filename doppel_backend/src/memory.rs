//! Per-chat rolling memory.
//!
//! Every chat gets two bounded FIFO buffers: the dialogue history that feeds
//! the prompt, and the raw messages written by the impersonated person that
//! feed the style block. Buffers are created on first touch and live for the
//! rest of the process.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 80;
pub const DEFAULT_STYLE_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

/// Fixed-capacity FIFO; pushing past capacity drops the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

struct ChatMemory {
    history: RingBuffer<Turn>,
    style_samples: RingBuffer<String>,
}

/// Owns the keyed buffers for every chat the bot has seen.
pub struct MemoryStore {
    chats: Mutex<HashMap<ConversationId, ChatMemory>>,
    history_capacity: usize,
    style_capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY, DEFAULT_STYLE_CAPACITY)
    }

    pub fn with_capacity(history_capacity: usize, style_capacity: usize) -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
            history_capacity,
            style_capacity,
        }
    }

    /// Buffers only ever hold fully pushed entries, so a poisoned lock still
    /// guards consistent data and is safe to keep using.
    fn lock_chats(&self) -> MutexGuard<'_, HashMap<ConversationId, ChatMemory>> {
        self.chats.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Memory store lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }

    fn with_chat<R>(&self, id: ConversationId, f: impl FnOnce(&mut ChatMemory) -> R) -> R {
        let mut chats = self.lock_chats();
        let chat = chats.entry(id).or_insert_with(|| ChatMemory {
            history: RingBuffer::new(self.history_capacity),
            style_samples: RingBuffer::new(self.style_capacity),
        });
        f(chat)
    }

    pub fn record_turn(&self, id: ConversationId, turn: Turn) {
        self.with_chat(id, |chat| chat.history.push(turn));
    }

    pub fn record_style_sample(&self, id: ConversationId, text: impl Into<String>) {
        let text = text.into();
        self.with_chat(id, |chat| chat.style_samples.push(text));
    }

    pub fn history(&self, id: ConversationId) -> Vec<Turn> {
        self.with_chat(id, |chat| chat.history.snapshot())
    }

    pub fn style_samples(&self, id: ConversationId) -> Vec<String> {
        self.with_chat(id, |chat| chat.style_samples.snapshot())
    }

    /// Clears dialogue history only. Style samples survive a reset.
    pub fn reset(&self, id: ConversationId) {
        if let Some(chat) = self.lock_chats().get_mut(&id) {
            chat.history.clear();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide reply probability, always within [0, 1].
pub struct ResponseChance {
    bits: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChanceUpdate {
    Applied(f64),
    Rejected { current: f64 },
}

impl ResponseChance {
    /// Out-of-range initial values are clamped.
    pub fn new(initial: f64) -> Self {
        let initial = if initial.is_nan() {
            0.0
        } else {
            initial.clamp(0.0, 1.0)
        };
        Self {
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set(&self, value: f64) -> ChanceUpdate {
        if !(0.0..=1.0).contains(&value) {
            return ChanceUpdate::Rejected {
                current: self.get(),
            };
        }
        self.bits.store(value.to_bits(), Ordering::Release);
        ChanceUpdate::Applied(value)
    }

    pub fn set_from_str(&self, raw: &str) -> ChanceUpdate {
        match raw.trim().parse::<f64>() {
            Ok(value) => self.set(value),
            Err(_) => ChanceUpdate::Rejected {
                current: self.get(),
            },
        }
    }
}
