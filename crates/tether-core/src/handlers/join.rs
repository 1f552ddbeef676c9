use tracing::debug;

use tether_shared::{Message, MessageKind, UserRecord};

use super::{announce_channel, announce_users, hostmask, is_own_nick, HandlerOutcome, JoinEvent};
use crate::channel::{Channel, ChannelKind, JoinState, PushContext};
use crate::network::Network;

pub(super) fn handle(network: &mut Network, ctx: &PushContext<'_>, event: JoinEvent) -> HandlerOutcome {
    let own = is_own_nick(network, &event.nick);
    let mut outcome = HandlerOutcome::unchanged();

    let index = match network.channel_index(&event.channel) {
        Some(index) => {
            if own {
                network.channels[index].state = JoinState::Joined;
            }
            index
        }
        None => {
            let channel = Channel::new(ctx.ids, &event.channel, ChannelKind::Channel)
                .with_state(JoinState::Joined);
            let index = network.insert_channel_sorted(channel);
            debug!(network = %network.uuid, chan = %event.channel, index, "joined new channel");

            outcome = HandlerOutcome::changed();
            announce_channel(network, ctx, index);
            index
        }
    };

    let message = Message::new(ctx.ids, MessageKind::Join, event.time)
        .with_from(UserRecord::new(&event.nick))
        .with_hostmask(hostmask(&event.ident, &event.hostname))
        .self_authored(own);

    let channel = &mut network.channels[index];
    channel.set_user(UserRecord::new(&event.nick));
    channel.push_message(ctx, message, false);
    announce_users(channel, ctx);

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::channel::tests::Harness;
    use crate::events::ClientEvent;
    use crate::handlers::tests::network;

    fn join(channel: &str, nick: &str) -> JoinEvent {
        JoinEvent {
            channel: channel.into(),
            nick: nick.into(),
            ident: "~ident".into(),
            hostname: "host.example".into(),
            time: Utc::now(),
        }
    }

    #[test]
    fn new_channel_is_inserted_in_order_and_announced() {
        let mut h = Harness::new(Some(100));
        let mut net = network(&h);
        net.push_channel(Channel::new(&h.ids, "#abc", ChannelKind::Channel));
        net.push_channel(Channel::new(&h.ids, "#xyz", ChannelKind::Channel));

        let outcome = handle(&mut net, &h.ctx(), join("#test", "alice"));
        assert!(outcome.config_changed);

        let names: Vec<&str> = net.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["irc.example.org", "#abc", "#test", "#xyz"]);

        let chan = &net.channels[2];
        assert_eq!(chan.state, JoinState::Joined);
        assert!(chan.find_user("alice").is_some());
        assert_eq!(chan.messages.len(), 1);
        assert_eq!(chan.messages[0].kind, MessageKind::Join);
        assert!(chan.messages[0].is_self());
        assert_eq!(chan.messages[0].body.hostmask.as_deref(), Some("~ident@host.example"));

        let events = h.drain();
        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["join", "msg", "users"]);
        match &events[0] {
            ClientEvent::Join { network: id, chan, index } => {
                assert_eq!(*id, net.id);
                assert_eq!(chan.name, "#test");
                assert_eq!(*index, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn join_after_every_existing_name_goes_last() {
        let h = Harness::new(Some(100));
        let mut net = network(&h);
        net.push_channel(Channel::new(&h.ids, "#abc", ChannelKind::Channel));

        handle(&mut net, &h.ctx(), join("#zzz", "alice"));
        assert_eq!(net.channels.last().map(|c| c.name.as_str()), Some("#zzz"));
        assert_eq!(net.channels.len(), 3);
    }

    #[test]
    fn own_rejoin_marks_existing_channel_joined() {
        let mut h = Harness::new(Some(100));
        let mut net = network(&h);
        net.push_channel(Channel::new(&h.ids, "#rust", ChannelKind::Channel));

        let outcome = handle(&mut net, &h.ctx(), join("#RUST", "Alice"));
        assert!(!outcome.config_changed);
        assert_eq!(net.channels.len(), 2);
        assert_eq!(net.channels[1].state, JoinState::Joined);

        let names: Vec<&str> = h.drain().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["msg", "users"]);
    }

    #[test]
    fn someone_else_joining_adds_a_user() {
        let h = Harness::new(Some(100));
        let mut net = network(&h);
        net.push_channel(Channel::new(&h.ids, "#rust", ChannelKind::Channel));

        handle(&mut net, &h.ctx(), join("#rust", "bob"));
        let chan = &net.channels[1];
        assert_eq!(chan.state, JoinState::Parted);
        assert!(chan.find_user("BOB").is_some());
        assert!(!chan.messages[0].is_self());
        assert_eq!(chan.unread, 0);
    }
}
