use tracing::debug;

use tether_shared::{Message, MessageKind};

use super::{announce_users, hostmask, is_own_nick, HandlerOutcome, PartEvent};
use crate::channel::{JoinState, PushContext};
use crate::network::Network;

pub(super) fn handle(network: &mut Network, ctx: &PushContext<'_>, event: PartEvent) -> HandlerOutcome {
    let own = is_own_nick(network, &event.nick);
    let uuid = network.uuid;

    let Some(channel) = network.get_channel_mut(&event.channel) else {
        debug!(network = %uuid, chan = %event.channel, "part for unknown channel");
        return HandlerOutcome::unchanged();
    };

    let from = channel.get_user(&event.nick);
    if own {
        channel.state = JoinState::Parted;
    } else {
        channel.remove_user(&event.nick);
    }

    let message = Message::new(ctx.ids, MessageKind::Part, event.time)
        .with_from(from)
        .with_hostmask(hostmask(&event.ident, &event.hostname))
        .with_text(event.message)
        .self_authored(own);
    channel.push_message(ctx, message, false);
    announce_users(channel, ctx);

    HandlerOutcome::unchanged()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tether_shared::UserRecord;

    use crate::channel::tests::Harness;
    use crate::channel::{Channel, ChannelKind};
    use crate::handlers::tests::network;

    fn part(channel: &str, nick: &str) -> PartEvent {
        PartEvent {
            channel: channel.into(),
            nick: nick.into(),
            ident: "u".into(),
            hostname: "h".into(),
            message: "bye".into(),
            time: Utc::now(),
        }
    }

    #[test]
    fn someone_else_parting_removes_them() {
        let mut h = Harness::new(Some(100));
        let mut net = network(&h);
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel).with_state(JoinState::Joined);
        chan.set_user(UserRecord::with_mode("Bob", "+"));
        net.push_channel(chan);

        handle(&mut net, &h.ctx(), part("#rust", "bob"));

        let chan = &net.channels[1];
        assert!(chan.find_user("bob").is_none());
        assert_eq!(chan.state, JoinState::Joined);
        let msg = &chan.messages[0];
        assert_eq!(msg.kind, MessageKind::Part);
        assert_eq!(msg.body.text, "bye");
        assert_eq!(msg.body.from.as_ref().map(|u| u.mode.as_str()), Some("+"));

        let names: Vec<&str> = h.drain().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["msg", "users"]);
    }

    #[test]
    fn own_part_marks_channel_parted() {
        let h = Harness::new(Some(100));
        let mut net = network(&h);
        net.push_channel(Channel::new(&h.ids, "#rust", ChannelKind::Channel).with_state(JoinState::Joined));

        handle(&mut net, &h.ctx(), part("#rust", "alice"));

        assert_eq!(net.channels[1].state, JoinState::Parted);
        assert!(net.channels[1].messages[0].is_self());
    }

    #[test]
    fn unknown_channel_is_ignored() {
        let mut h = Harness::new(Some(100));
        let mut net = network(&h);

        handle(&mut net, &h.ctx(), part("#gone", "bob"));
        assert!(net.lobby().messages.is_empty());
        assert!(h.drain().is_empty());
    }
}
