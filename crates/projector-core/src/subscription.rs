use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    sdk::{ChatChannel, ListenerId, MessageListener},
    types::ChannelKey,
};

/// Listeners currently attached to one channel.
#[derive(Debug)]
pub struct ActiveSubscription<C: ChatChannel> {
    channel: Arc<C>,
    listeners: Vec<ListenerId>,
    generation: u64,
}

impl<C: ChatChannel> ActiveSubscription<C> {
    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn key(&self) -> &ChannelKey {
        self.channel.key()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Subscription lifecycle: at most one channel is subscribed at a time.
///
/// Only `attach` and `detach` change the state, and `attach` always detaches
/// the previous channel first.
#[derive(Debug)]
pub enum SubscriptionState<C: ChatChannel> {
    Unsubscribed,
    Subscribed(ActiveSubscription<C>),
}

impl<C: ChatChannel> Default for SubscriptionState<C> {
    fn default() -> Self {
        Self::Unsubscribed
    }
}

impl<C: ChatChannel> SubscriptionState<C> {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed(_))
    }

    pub fn active(&self) -> Option<&ActiveSubscription<C>> {
        match self {
            Self::Unsubscribed => None,
            Self::Subscribed(active) => Some(active),
        }
    }

    pub fn channel(&self) -> Option<&Arc<C>> {
        self.active().map(ActiveSubscription::channel)
    }

    pub fn key(&self) -> Option<&ChannelKey> {
        self.active().map(ActiveSubscription::key)
    }

    /// Generation of the active subscription, if any.
    pub fn generation(&self) -> Option<u64> {
        self.active().map(ActiveSubscription::generation)
    }

    /// Subscribe to `channel`, replacing any previous subscription.
    ///
    /// Returns the key of the channel that was detached, if one was.
    pub fn attach(
        &mut self,
        channel: Arc<C>,
        listeners: impl IntoIterator<Item = MessageListener>,
        generation: u64,
    ) -> Option<ChannelKey> {
        let previous = self.detach();

        let listeners = listeners
            .into_iter()
            .map(|listener| channel.add_listener(listener))
            .collect::<Vec<_>>();
        debug!(
            channel = %channel.key(),
            generation,
            listeners = listeners.len(),
            "attached channel listeners"
        );

        *self = Self::Subscribed(ActiveSubscription {
            channel,
            listeners,
            generation,
        });
        previous
    }

    /// Detach all listeners from the active channel. No-op when unsubscribed.
    pub fn detach(&mut self) -> Option<ChannelKey> {
        let Self::Subscribed(active) = std::mem::take(self) else {
            return None;
        };

        for id in &active.listeners {
            if !active.channel.remove_listener(*id) {
                warn!(
                    channel = %active.key(),
                    listener = id.0,
                    "listener was already removed from channel"
                );
            }
        }
        debug!(channel = %active.key(), "detached channel listeners");
        Some(active.key().clone())
    }
}
