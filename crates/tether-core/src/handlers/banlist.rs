use chrono::Utc;

use tether_shared::{BanEntry, Message, MessageKind};

use super::{announce_channel, BanlistEvent, HandlerOutcome};
use crate::channel::{Channel, ChannelKind, JoinState, PushContext};
use crate::network::Network;

pub(super) fn handle(network: &mut Network, ctx: &PushContext<'_>, event: BanlistEvent) -> HandlerOutcome {
    if event.bans.is_empty() {
        let message = Message::new(ctx.ids, MessageKind::Error, Utc::now()).with_text("Banlist empty");

        match network.channel_index(&event.channel) {
            Some(index) if network.channels[index].state == JoinState::Joined => {
                network.channels[index].push_message(ctx, message, true);
            }
            _ => {
                network
                    .lobby_mut()
                    .push_message(ctx, message.show_in_active(true), true);
            }
        }
        return HandlerOutcome::unchanged();
    }

    let name = format!("Banlist for {}", event.channel);
    let index = match network.channel_index(&name) {
        Some(index) => index,
        None => {
            let index = network.push_channel(Channel::new(ctx.ids, name, ChannelKind::Special));
            announce_channel(network, ctx, index);
            index
        }
    };

    let bans = event
        .bans
        .into_iter()
        .map(|ban| BanEntry {
            hostmask: ban.banned,
            banned_by: ban.banned_by,
            banned_at: ban.banned_at.saturating_mul(1000),
        })
        .collect();
    let message = Message::new(ctx.ids, MessageKind::Banlist, Utc::now()).with_bans(bans);

    let channel = &mut network.channels[index];
    channel.messages.clear();
    channel.push_message(ctx, message, true);

    HandlerOutcome::unchanged()
}
