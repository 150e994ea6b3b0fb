use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use projector_core::{
    ChangeStream, ChannelKey, ChatChannel, ChatClient, ClientProvider, LoadOutcome, MessageView,
    ProjectorConfig, ProjectorError, SendGate, SendOutcome, SendPermit, SendRejection,
    SequenceChange, SubscriptionState, channel_title,
};
use tracing::{debug, error, info, warn};

use crate::shared::{Shared, lock};

type ChannelOf<P> = <<P as ClientProvider>::Client as ChatClient>::Channel;

/// Channel type/id halves supplied one at a time by the caller.
#[derive(Debug, Default)]
struct PendingInputs {
    channel_type: Option<String>,
    channel_id: Option<String>,
}

/// Mirrors one remote channel into an ordered, observable list of message views.
///
/// The sequence is only ever mutated by the initial seed and by the channel's
/// received/updated/deleted events. Sending never inserts locally; the sent
/// message shows up when the channel echoes it back.
pub struct ChannelProjector<P: ClientProvider> {
    provider: P,
    config: ProjectorConfig,
    shared: Arc<Shared>,
    subscription: Mutex<SubscriptionState<ChannelOf<P>>>,
    pending: Mutex<PendingInputs>,
    input: Mutex<String>,
    send_gate: SendGate,
    load_generation: AtomicU64,
}

impl<P: ClientProvider> ChannelProjector<P> {
    pub fn new(provider: P, config: ProjectorConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config.change_buffer)),
            provider,
            config,
            subscription: Mutex::new(SubscriptionState::default()),
            pending: Mutex::new(PendingInputs::default()),
            input: Mutex::new(String::new()),
            send_gate: SendGate::new(),
            load_generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current message views in display order.
    pub fn messages(&self) -> Vec<MessageView> {
        self.shared.state().sequence.items().to_vec()
    }

    pub fn title(&self) -> String {
        self.shared.state().title.clone()
    }

    /// Subscribe to sequence changes published from now on.
    pub fn subscribe(&self) -> ChangeStream {
        self.shared.changes().subscribe()
    }

    /// Channel currently subscribed, if any.
    pub fn active_channel(&self) -> Option<ChannelKey> {
        lock(&self.subscription).key().cloned()
    }

    pub fn input(&self) -> String {
        lock(&self.input).clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        *lock(&self.input) = text.into();
    }

    pub fn is_sending(&self) -> bool {
        self.send_gate.is_busy()
    }

    /// Whether a send would currently be dispatched.
    pub fn can_send(&self) -> bool {
        !self.is_sending() && !lock(&self.input).is_empty() && self.active_channel().is_some()
    }

    /// Store the channel id half and load once the type is known too.
    pub async fn set_channel_id(
        &self,
        channel_id: impl Into<String>,
    ) -> Result<LoadOutcome, ProjectorError> {
        let (channel_type, channel_id) = {
            let mut pending = lock(&self.pending);
            pending.channel_id = Some(channel_id.into());
            (pending.channel_type.clone(), pending.channel_id.clone())
        };
        self.load_parts(channel_type.as_deref(), channel_id.as_deref())
            .await
    }

    /// Store the channel type half and load once the id is known too.
    pub async fn set_channel_type(
        &self,
        channel_type: impl Into<String>,
    ) -> Result<LoadOutcome, ProjectorError> {
        let (channel_type, channel_id) = {
            let mut pending = lock(&self.pending);
            pending.channel_type = Some(channel_type.into());
            (pending.channel_type.clone(), pending.channel_id.clone())
        };
        self.load_parts(channel_type.as_deref(), channel_id.as_deref())
            .await
    }

    /// Resolve a channel, seed the sequence from its history and subscribe to it.
    ///
    /// Blank `channel_id` or `channel_type` makes this a no-op. Any previous
    /// subscription is detached before the new one is attached. When a newer
    /// load starts while this one awaits the SDK, this one backs off and
    /// returns [`LoadOutcome::Superseded`].
    pub async fn load(
        &self,
        channel_id: &str,
        channel_type: &str,
    ) -> Result<LoadOutcome, ProjectorError> {
        self.load_parts(Some(channel_type), Some(channel_id)).await
    }

    async fn load_parts(
        &self,
        channel_type: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<LoadOutcome, ProjectorError> {
        let Some(key) = ChannelKey::from_parts(channel_type, channel_id) else {
            debug!(?channel_type, ?channel_id, "channel type or id missing; load skipped");
            return Ok(LoadOutcome::Skipped);
        };

        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(channel = %key, generation, "loading channel");

        let client = self.provider.ready_client().await.map_err(|err| {
            let err = err.with_channel(&key);
            error!(channel = %key, error = %err, "chat client did not become ready");
            err
        })?;
        if self.is_superseded(generation) {
            debug!(channel = %key, generation, "load superseded while waiting for client");
            return Ok(LoadOutcome::Superseded);
        }

        let channel = client.get_or_create_channel(&key).await.map_err(|err| {
            let err = err.with_channel(&key);
            error!(channel = %key, error = %err, "failed to get or create channel");
            err
        })?;

        let history = channel.messages();
        let title = channel_title(
            channel.display_name().as_deref(),
            &key,
            self.config.title_max_chars,
        );

        let mut subscription = lock(&self.subscription);
        if self.is_superseded(generation) {
            debug!(channel = %key, generation, "load superseded while resolving channel");
            return Ok(LoadOutcome::Superseded);
        }

        if let Some(previous) = subscription.detach() {
            debug!(previous = %previous, channel = %key, "replacing channel subscription");
        }

        let seeded = {
            let mut state = self.shared.state();
            state.generation = generation;
            let items = state.sequence.reset(&history).to_vec();
            let seeded = items.len();
            state.title.clone_from(&title);
            self.shared.changes().emit(SequenceChange::Reset {
                channel: key.clone(),
                items,
            });
            self.shared
                .changes()
                .emit(SequenceChange::TitleChanged { title });
            seeded
        };

        subscription.attach(channel, self.shared.listeners(generation), generation);
        info!(channel = %key, seeded, "channel loaded");
        Ok(LoadOutcome::Loaded {
            channel: key,
            seeded,
        })
    }

    /// Send the current input text to the loaded channel.
    ///
    /// Rejected without side effects while another send is in flight, when the
    /// input is empty, or when no channel is loaded. On success the input is
    /// cleared; on failure it is kept so the user can retry, and a
    /// [`SequenceChange::SendFailed`] is published.
    pub async fn send(&self) -> Result<SendOutcome, ProjectorError> {
        let Some(permit) = self.send_gate.try_acquire() else {
            debug!("send already in flight; rejecting");
            return Ok(SendOutcome::Rejected(SendRejection::Busy));
        };
        let text = self.input();
        let channel = match self.send_target(&text) {
            Ok(channel) => channel,
            Err(rejection) => return Ok(SendOutcome::Rejected(rejection)),
        };
        self.dispatch(permit, channel, text).await
    }

    /// Replace the input with `text` and send it.
    ///
    /// The input is only replaced once the send is accepted for dispatch, so
    /// every rejection leaves the previous draft in place.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<SendOutcome, ProjectorError> {
        let Some(permit) = self.send_gate.try_acquire() else {
            debug!("send already in flight; rejecting");
            return Ok(SendOutcome::Rejected(SendRejection::Busy));
        };
        let text = text.into();
        let channel = match self.send_target(&text) {
            Ok(channel) => channel,
            Err(rejection) => return Ok(SendOutcome::Rejected(rejection)),
        };
        self.set_input(text.clone());
        self.dispatch(permit, channel, text).await
    }

    fn send_target(&self, text: &str) -> Result<Arc<ChannelOf<P>>, SendRejection> {
        if text.is_empty() {
            return Err(SendRejection::EmptyInput);
        }
        lock(&self.subscription).channel().cloned().ok_or_else(|| {
            warn!("send requested before any channel was loaded");
            SendRejection::NoChannel
        })
    }

    async fn dispatch(
        &self,
        _permit: SendPermit<'_>,
        channel: Arc<ChannelOf<P>>,
        text: String,
    ) -> Result<SendOutcome, ProjectorError> {
        let key = channel.key().clone();

        match channel.send_message(&text).await {
            Ok(message_id) => {
                debug!(channel = %key, message = %message_id, "message sent");
                lock(&self.input).clear();
                Ok(SendOutcome::Sent { message_id })
            }
            Err(err) => {
                let err = err.with_channel(&key);
                error!(channel = %key, error = %err, "failed to send message; input kept for retry");
                self.shared
                    .changes()
                    .emit(SequenceChange::SendFailed { error: err.clone() });
                Err(err)
            }
        }
    }

    /// Detach listeners from the subscribed channel. Idempotent.
    ///
    /// Loads still awaiting the SDK finish but no longer subscribe, and
    /// callbacks the SDK captured before detaching no longer apply.
    pub fn dispose(&self) {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut subscription = lock(&self.subscription);
        self.shared.state().generation = generation;
        if let Some(key) = subscription.detach() {
            info!(channel = %key, "channel projector disposed");
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.load_generation.load(Ordering::SeqCst) != generation
    }
}

impl<P: ClientProvider> Drop for ChannelProjector<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
