mod config;
mod logging;

use std::{process, time::Duration};

use config::SmokeConfig;
use projector_core::{
    ChangeStream, ChannelId, ChannelKey, ChannelType, ChatChannel, LoadOutcome, MessageId,
    ProjectorError, SendOutcome, recv_change,
};
use projector_memory::{ConnectionState, MemoryChatService, new_record};
use projector_runtime::ChannelProjector;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run(config).await {
        eprintln!("Smoke run failed: {err}");
        process::exit(1);
    }
}

async fn run(config: SmokeConfig) -> Result<(), ProjectorError> {
    info!(
        channel_type = %config.channel_type,
        channel_id = %config.channel_id,
        title_max_chars = config.projector.title_max_chars,
        "starting projector smoke run"
    );

    let service = MemoryChatService::new(config.user_id.clone());
    let key = ChannelKey::new(
        ChannelType::new(config.channel_type.clone()),
        ChannelId::new(config.channel_id.clone()),
    );
    let channel = service.client().create_channel(
        key,
        Some("Projector smoke test channel"),
        vec![
            new_record("bob", "welcome to the channel"),
            new_record("carol", "hi all"),
        ],
    );

    let projector = ChannelProjector::new(service.clone(), config.projector.clone());
    let stop = CancellationToken::new();
    let printer = tokio::spawn(print_changes(projector.subscribe(), stop.child_token()));

    let connect_delay = Duration::from_millis(config.connect_delay_ms);
    let connector = service.clone();
    tokio::spawn(async move {
        tokio::time::sleep(connect_delay).await;
        connector.set_state(ConnectionState::Ready);
    });

    let outcome = projector.set_channel_type(&config.channel_type).await?;
    debug!(?outcome, "channel type supplied");
    let outcome = projector.set_channel_id(&config.channel_id).await?;
    if !matches!(outcome, LoadOutcome::Loaded { .. }) {
        warn!(?outcome, "channel did not load");
    }
    info!(title = %projector.title(), "channel title");

    match projector.send_text("hello from projector-smoke").await? {
        SendOutcome::Sent { message_id } => info!(message = %message_id, "message sent"),
        SendOutcome::Rejected(reason) => warn!(?reason, "send rejected"),
    }

    let remote = channel.receive_remote("bob", "welcome aboard");
    channel.edit_message(&remote.id, "welcome aboard (edited)");
    if let Some(first) = channel.messages().first() {
        channel.delete_message(&first.id, false);
    }
    channel.edit_message(&MessageId::new("never-seen"), "ignored by projector");

    channel.fail_next_send(ProjectorError::send_failed("simulated outage"));
    if let Err(err) = projector.send_text("this send fails").await {
        warn!(error = %err, input = %projector.input(), "send failed; input kept for retry");
    }

    print_json(&projector.messages());

    projector.dispose();
    stop.cancel();
    if let Err(err) = printer.await {
        warn!(error = %err, "change printer task failed");
    }
    Ok(())
}

async fn print_changes(mut changes: ChangeStream, stop: CancellationToken) {
    loop {
        tokio::select! {
            change = recv_change(&mut changes) => match change {
                Ok(change) => print_json(&change),
                Err(_) => break,
            },
            _ = stop.cancelled() => {
                while let Ok(change) = changes.try_recv() {
                    print_json(&change);
                }
                break;
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "failed to serialize smoke output"),
    }
}
