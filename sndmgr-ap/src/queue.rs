//! Per-channel command queues
//!
//! Each channel owns one unbounded double-ended buffer. The broker event loop
//! inserts at the head, consumers remove from the tail, so commands leave a
//! queue in the order they arrived. Waiting consumers are woken through a
//! [`Notify`] instead of polling.

use sndmgr_common::{Channel, Command};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

/// Thread-safe FIFO of commands for one channel
#[derive(Debug)]
pub struct CommandQueue {
    channel: Channel,
    entries: Mutex<VecDeque<Command>>,
    available: Notify,
}

impl CommandQueue {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            entries: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Command>> {
        // Critical sections never panic midway, so a poisoned queue is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a newly received command at the head
    pub fn push(&self, command: Command) {
        let len = {
            let mut entries = self.lock();
            entries.push_front(command);
            entries.len()
        };
        debug!("{} queue length now {}", self.channel, len);

        // Stores a permit when nobody is waiting yet
        self.available.notify_one();
    }

    /// Remove the oldest command, if any
    pub fn try_pop(&self) -> Option<Command> {
        self.lock().pop_back()
    }

    /// Wait until a command is available and remove the oldest one
    pub async fn pop(&self) -> Command {
        loop {
            if let Some(command) = self.try_pop() {
                return command;
            }
            self.available.notified().await;
        }
    }

    /// Oldest command without removing it
    pub fn peek(&self) -> Option<Command> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Queued commands, oldest first
    pub fn snapshot(&self) -> Vec<Command> {
        self.lock().iter().rev().cloned().collect()
    }
}

/// The sound and speech queues, shared between the broker client and
/// their consumers
///
/// The speech queue has no consumer in this agent. An external collaborator
/// that wants speech commands takes them from [`ChannelQueues::speech`].
#[derive(Debug)]
pub struct ChannelQueues {
    sound: CommandQueue,
    speech: CommandQueue,
}

impl ChannelQueues {
    pub fn new() -> Self {
        Self {
            sound: CommandQueue::new(Channel::Sound),
            speech: CommandQueue::new(Channel::Speech),
        }
    }

    pub fn get(&self, channel: Channel) -> &CommandQueue {
        match channel {
            Channel::Sound => &self.sound,
            Channel::Speech => &self.speech,
        }
    }

    pub fn sound(&self) -> &CommandQueue {
        &self.sound
    }

    pub fn speech(&self) -> &CommandQueue {
        &self.speech
    }
}

impl Default for ChannelQueues {
    fn default() -> Self {
        Self::new()
    }
}
