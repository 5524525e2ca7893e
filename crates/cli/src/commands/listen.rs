//! Stream realtime notifications.

use talent_ops_client::{AppContext, ChannelStatus};
use talent_ops_core::UserId;
use talent_ops_core::realtime::{MessageKind, Topic};

use super::CommandError;

/// Log every envelope on `kind` (or all kinds) until Ctrl-C or until the
/// channel gives up reconnecting.
pub async fn listen(ctx: &AppContext, kind: Option<&str>) -> Result<(), CommandError> {
    if !ctx.session().is_logged_in() {
        tracing::warn!("Not logged in; the server may refuse the connection");
    }

    let topic = kind.map_or(Topic::Wildcard, |kind| Topic::Kind(MessageKind::from(kind)));
    let handler = ctx.realtime().on(topic.clone(), |envelope| {
        tracing::info!(
            kind = %envelope.kind,
            user_id = envelope.user_id.as_ref().map(UserId::as_i64),
            data = %envelope.data,
            "Message"
        );
    });

    let mut status = ctx.realtime().subscribe_status();
    ctx.connect_realtime()?;
    tracing::info!(%topic, "Listening, press Ctrl-C to stop");

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CommandError::from),
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = status.borrow_and_update().clone();
                tracing::debug!(status = %current, "Channel status");
                if current == ChannelStatus::GaveUp {
                    tracing::warn!("Realtime channel gave up reconnecting");
                    break Ok(());
                }
            }
        }
    };

    ctx.realtime().off(&topic, handler);
    ctx.teardown();
    result
}
