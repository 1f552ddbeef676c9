use tracing::debug;

use tether_shared::{Message, UserRecord};

use super::{announce_channel, hostmask, is_own_nick, HandlerOutcome, MessageEvent};
use crate::channel::{Channel, ChannelKind, PushContext};
use crate::network::Network;

const CHANNEL_PREFIXES: &[char] = &['#', '&', '+', '!'];

fn is_channel_name(name: &str) -> bool {
    name.starts_with(CHANNEL_PREFIXES)
}

pub(super) fn handle(network: &mut Network, ctx: &PushContext<'_>, event: MessageEvent) -> HandlerOutcome {
    let mut outcome = HandlerOutcome::unchanged();

    let Some(nick) = event.nick.as_deref() else {
        let message = Message::new(ctx.ids, event.kind, event.time).with_text(event.text);
        network.lobby_mut().push_message(ctx, message, true);
        return outcome;
    };

    let own = is_own_nick(network, nick);
    let highlight = !own && network.is_highlight(&event.text);

    let mut message = Message::new(ctx.ids, event.kind, event.time)
        .with_text(event.text.as_str())
        .self_authored(own)
        .highlighted(highlight);
    if !event.ident.is_empty() {
        message = message.with_hostmask(hostmask(&event.ident, &event.hostname));
    }

    let index = if is_channel_name(&event.target) {
        match network.channel_index(&event.target) {
            Some(index) => index,
            None => {
                debug!(network = %network.uuid, chan = %event.target, "message for unknown channel");
                let message = message.with_from(UserRecord::new(nick)).show_in_active(true);
                network.lobby_mut().push_message(ctx, message, true);
                return outcome;
            }
        }
    } else {
        let query = if own { event.target.as_str() } else { nick };
        match network.channel_index(query) {
            Some(index) => index,
            None => {
                let index = network.push_channel(Channel::new(ctx.ids, query, ChannelKind::Query));
                announce_channel(network, ctx, index);
                outcome = HandlerOutcome::changed();
                index
            }
        }
    };

    let channel = &mut network.channels[index];
    let from = channel.get_user(nick);
    channel.push_message(ctx, message.with_from(from), true);

    outcome
}
