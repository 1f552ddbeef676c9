//! Nick changes and loss of the server connection.

use chrono::Utc;
use tracing::info;

use tether_shared::{Message, MessageKind, UserRecord};

use super::{announce_users, is_own_nick, HandlerOutcome, NickEvent};
use crate::channel::{JoinState, PushContext};
use crate::network::Network;

pub(super) fn handle_nick(network: &mut Network, ctx: &PushContext<'_>, event: NickEvent) -> HandlerOutcome {
    let own = is_own_nick(network, &event.nick);
    if own {
        info!(network = %network.uuid, from = %event.nick, to = %event.new_nick, "nick changed");
        network.set_nick(&event.new_nick);

        let message = Message::new(ctx.ids, MessageKind::Nick, event.time)
            .with_from(UserRecord::new(&event.nick))
            .with_text(event.new_nick.as_str())
            .self_authored(true);
        network.lobby_mut().push_message(ctx, message, false);
    }

    for channel in network.channels.iter_mut().skip(1) {
        let Some(old) = channel.remove_user(&event.nick) else {
            continue;
        };
        channel.set_user(UserRecord::with_mode(&event.new_nick, old.mode.as_str()));

        let message = Message::new(ctx.ids, MessageKind::Nick, event.time)
            .with_from(old)
            .with_text(event.new_nick.as_str())
            .self_authored(own);
        channel.push_message(ctx, message, false);
        announce_users(channel, ctx);
    }

    if own {
        HandlerOutcome::changed()
    } else {
        HandlerOutcome::unchanged()
    }
}

pub(super) fn handle_disconnected(network: &mut Network, ctx: &PushContext<'_>) -> HandlerOutcome {
    info!(network = %network.uuid, "disconnected from server");

    for channel in &mut network.channels {
        channel.state = JoinState::Parted;
    }

    let message = Message::new(ctx.ids, MessageKind::Error, Utc::now())
        .with_text("Disconnected from the network.");
    network.lobby_mut().push_message(ctx, message, true);

    HandlerOutcome::unchanged()
}
