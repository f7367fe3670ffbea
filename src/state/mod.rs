//! Shared state and API to handle incoming commands.
//!
//! This module is split in several files:
//!
//! - `mod.rs`: public API of the server state, dispatcher and send utilities
//! - `rfc2812.rs`: handlers for each recognized verb

use crate::channel::{Channel, MemberModes};
use crate::client::{Client, MessageQueue, MessageQueueItem};
use crate::config;
use crate::lines;
use crate::util::time_str;
use chatrelay_tokens::{mode, rpl, Buffer, Command, Message, ParseError, ReplyBuffer};
use slab::Slab;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::{cmp, io, net};
use tokio::sync::Mutex;

macro_rules! server_version(() => {concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"))});

mod rfc2812;

type ChannelMap = HashMap<String, Channel>;
type ClientMap = Slab<Client>;
type HandlerResult = Result<(), ()>;

/// What a handler needs to know about the command it is handling.
pub(crate) struct CommandContext<'a> {
    /// The client that issued the command.
    id: usize,

    /// Where replies to the issuer are written.  Sent after the handler returns.
    rb: &'a mut ReplyBuffer,
}

/// State of the chat relay.
///
/// Every client is stored in a slab and identified by its key.  Channels only store these keys,
/// so removing a client is a matter of scanning the channel map.
///
/// Note that this is just an `Arc` to the real data, so it's cheap to clone and clones share the
/// same data.  The lock is held while a whole batch of input is processed, which means that a
/// command handler has exclusive access to every client and every channel.
#[derive(Clone)]
pub struct State(Arc<Mutex<StateInner>>);

impl State {
    /// Initialize the state from the given configuration.
    pub fn new(config: config::State) -> Self {
        let inner = StateInner::new(config);
        Self(Arc::new(Mutex::new(inner)))
    }

    /// Adds a new connection to the state, and returns its identifier.
    ///
    /// The queue is used to push messages back to the peer.
    pub async fn peer_joined(&self, addr: net::SocketAddr, queue: MessageQueue) -> usize {
        self.0.lock().await.peer_joined(addr, queue)
    }

    /// Removes the given connection from the state, with an optional error.
    ///
    /// If the peer has quit unexpectedly, `err` should be set to `Some` and reflect the cause of
    /// the quit, so that other peers can be correctly informed.
    pub async fn peer_quit(&self, id: usize, err: Option<io::Error>) {
        self.0.lock().await.peer_quit(id, err);
    }

    /// Feeds bytes received from the given connection.
    ///
    /// Complete lines are parsed and handled in arrival order.  Returns false when the client has
    /// quit and its connection must be closed once its queue has been flushed.
    pub async fn handle_input(&self, id: usize, bytes: &[u8]) -> bool {
        self.0.lock().await.handle_input(id, bytes)
    }
}

/// The actual shared data (state) of the server.
pub(crate) struct StateInner {
    /// The domain of the server.  This string is used as a prefix for replies sent to clients.
    domain: String,

    /// The shared password.  Clients need to issue a PASS command with this password to
    /// register.
    password: Option<String>,

    nicklen: usize,
    channellen: usize,
    max_channels: usize,
    max_targets: usize,

    clients: ClientMap,

    /// HashMap to associate the name of each channel with their metadata.
    channels: ChannelMap,

    /// The formatted time when this instance is created.  It is sent to the client when they
    /// register (in a "003 RPL_CREATED" reply).
    created_at: String,
}

impl StateInner {
    pub fn new(config: config::State) -> Self {
        Self {
            domain: config.domain,
            password: config.password,
            nicklen: config.nicklen,
            channellen: config.channellen,
            max_channels: config.max_channels,
            max_targets: config.max_targets,
            clients: Slab::new(),
            channels: HashMap::new(),
            created_at: time_str(),
        }
    }

    pub fn peer_joined(&mut self, addr: net::SocketAddr, queue: MessageQueue) -> usize {
        let id = self.clients.insert(Client::new(queue, self.password.is_some()));
        log::debug!("{}: Connected from {}", id, addr);
        id
    }

    pub fn peer_quit(&mut self, id: usize, err: Option<io::Error>) {
        log::debug!("{}: Disconnected", id);
        match err {
            Some(err) => {
                let reason = err.to_string();
                self.remove_client(id, &reason);
            }
            None => self.remove_client(id, lines::CONNECTION_CLOSED),
        }
    }

    /// This function is called by `peer_quit` and `cmd_quit` to do the various cleanup needed when
    /// a client disconnects:
    ///
    /// - send a QUIT message to the clients that share a channel with it, once per client,
    /// - remove the client from the members, operators and invites of each channel,
    /// - remove empty channels,
    /// - remove the client from `StateInner::clients`, which closes its message queue.
    fn remove_client(&mut self, id: usize, reason: &str) {
        if !self.clients.contains(id) {
            return;
        }
        let client = self.clients.remove(id);

        let mut response = Buffer::new();
        response.message(client.full_name(), Command::Quit).trailing_param(reason);
        let msg = MessageQueueItem::from(response);

        let mut notified = HashSet::new();
        for channel in self.channels.values().filter(|channel| channel.is_member(id)) {
            for (member, _) in &channel.members {
                if *member != id && notified.insert(*member) {
                    self.send(*member, msg.clone());
                }
            }
        }

        self.channels.retain(|name, channel| {
            channel.remove_member(id);
            if channel.members.is_empty() {
                log::debug!("{}: Channel {} is now empty", id, name);
                false
            } else {
                true
            }
        });
    }

    pub fn handle_input(&mut self, id: usize, bytes: &[u8]) -> bool {
        let lines = match self.clients.get_mut(id) {
            Some(client) => client.read(bytes),
            None => return false,
        };

        for line in lines {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::debug!("{}: Discarded line: {}", id, err);
                    continue;
                }
            };
            log::trace!("{} >> {}", id, line.trim_end());

            match Message::parse(&line) {
                Ok(msg) => self.handle_message(id, msg),
                Err(ParseError::UnknownVerb(verb)) => self.handle_unknown_verb(id, verb),
                Err(err) => log::debug!("{}: Invalid message: {}", id, err),
            }

            if !self.clients.contains(id) {
                return false;
            }
        }
        true
    }

    /// Unregistered clients get an ERR_NOTREGISTERED for unknown verbs, other clients get
    /// nothing.
    fn handle_unknown_verb(&mut self, id: usize, verb: &str) {
        let client = match self.clients.get(id) {
            Some(client) => client,
            None => return,
        };
        log::debug!("{}: Unknown verb {:?}", id, verb);
        if !client.is_registered() {
            let mut rb = ReplyBuffer::new(&self.domain, client.nick());
            rb.reply(rpl::ERR_NOTREGISTERED).trailing_param(lines::NOT_REGISTERED);
            client.send(rb);
        }
    }

    pub fn handle_message(&mut self, id: usize, msg: Message<'_>) {
        let client = match self.clients.get(id) {
            Some(client) => client,
            None => return,
        };
        let mut rb = ReplyBuffer::new(&self.domain, client.nick());
        let command = msg.command;

        if let Err(reply) = client.can_issue_command(command) {
            log::debug!("{}: {} not allowed in state {:?}", id, command, client.state());
            if command == Command::Notice {
                return;
            }
            if reply == rpl::ERR_ALREADYREGISTRED {
                rb.reply(reply).trailing_param(lines::ALREADY_REGISTERED);
            } else {
                rb.reply(reply).trailing_param(lines::NOT_REGISTERED);
            }
            client.send(rb);
            return;
        }

        if !msg.has_enough_params() {
            log::debug!("{}: {} with {} argument(s)", id, command, msg.num_args());
            rb.reply(rpl::ERR_NEEDMOREPARAMS)
                .param(command.as_str())
                .trailing_param(lines::NEED_MORE_PARAMS);
            client.send(rb);
            return;
        }

        let args = msg.args();
        let n = msg.num_args();
        log::debug!("{}: {} {:?}", id, command, &args[..n]);

        // PRIVMSG and NOTICE take their targets from the middle parameters and their text from
        // the trailing segment only.
        let targets = msg.params[..msg.num_params].first().copied();

        let ctx = CommandContext { id, rb: &mut rb };
        let cmd_result = match command {
            Command::Invite => self.cmd_invite(ctx, args[0], args[1]),
            Command::Join => self.cmd_join(ctx, args[0], msg.arg(1)),
            Command::Kick => self.cmd_kick(ctx, args[0], args[1], msg.arg(2)),
            Command::Mode => self.cmd_mode(ctx, args[0], msg.arg(1), &args[2..cmp::max(2, n)]),
            Command::Nick => self.cmd_nick(ctx, msg.arg(0)),
            Command::Notice => self.cmd_notice(ctx, targets, msg.trailing),
            Command::Part => self.cmd_part(ctx, args[0], msg.arg(1)),
            Command::Pass => self.cmd_pass(ctx, args[0]),
            Command::Ping => self.cmd_ping(ctx, args[0]),
            Command::Pong => Ok(()),
            Command::PrivMsg => self.cmd_privmsg(ctx, targets, msg.trailing),
            Command::Quit => self.cmd_quit(ctx, msg.arg(0)),
            Command::Topic => self.cmd_topic(ctx, args[0], msg.arg(1)),
            Command::User => self.cmd_user(ctx, &msg.params[..msg.num_params], msg.trailing),
            Command::Reply(_) => Ok(()),
        };
        if cmd_result.is_err() {
            log::debug!("{}:     {} failed", id, command);
        }

        if !rb.is_empty() {
            self.send(id, MessageQueueItem::from(rb));
        }
    }
}

/// Returns `Ok(channel)` when `name` is an existing channel name.  Otherwise returns `Err(())` and
/// send an error to the client.
fn find_channel<'a>(id: usize, rb: &mut ReplyBuffer, channels: &'a ChannelMap,
                    name: &str) -> Result<&'a Channel, ()>
{
    match channels.get(name) {
        Some(channel) => Ok(channel),
        None => {
            log::debug!("{}:     no such channel", id);
            rb.reply(rpl::ERR_NOSUCHCHANNEL).param(name).trailing_param(lines::NO_SUCH_CHANNEL);
            Err(())
        }
    }
}

/// Returns `Ok(member_modes)` when the client identified by `id` is in the given `channel`.
/// Otherwise returns `Err(())` and send an error to the client.
///
/// `channel_name` is needed for the error reply.
fn find_member(id: usize, rb: &mut ReplyBuffer, channel: &Channel,
               channel_name: &str) -> Result<MemberModes, ()>
{
    match channel.member_modes(id) {
        Some(modes) => Ok(modes),
        None => {
            log::debug!("{}:     not on channel", id);
            rb.reply(rpl::ERR_NOTONCHANNEL)
                .param(channel_name)
                .trailing_param(lines::NOT_ON_CHANNEL);
            Err(())
        }
    }
}

/// Returns `Ok(member_modes)` when the client identified by `id` is an operator of `channel`.
/// Otherwise returns `Err(())` and send an error to the client.
fn find_operator(id: usize, rb: &mut ReplyBuffer, channel: &Channel,
                 channel_name: &str) -> Result<MemberModes, ()>
{
    let modes = find_member(id, rb, channel, channel_name)?;
    if !modes.operator {
        log::debug!("{}:     not operator", id);
        rb.reply(rpl::ERR_CHANOPRIVSNEEDED)
            .param(channel_name)
            .trailing_param(lines::CHAN_O_PRIVS_NEEDED);
        return Err(());
    }
    Ok(modes)
}

/// Returns the client ID of the registered client with the given nickname.
fn id_of(clients: &ClientMap, nick: &str) -> Option<usize> {
    clients.iter()
        .find(|(_, client)| client.is_registered() && client.nick() == nick)
        .map(|(id, _)| id)
}

/// Returns `Ok(target_id)` when the client identified by the nickname `nick` is connected and
/// registered.  Otherwise returns `Err(())` and send an error to the client.
fn find_nick(id: usize, rb: &mut ReplyBuffer, clients: &ClientMap, nick: &str) -> Result<usize, ()> {
    match id_of(clients, nick) {
        Some(target) => Ok(target),
        None => {
            log::debug!("{}:     nick doesn't exist", id);
            rb.reply(rpl::ERR_NOSUCHNICK).param(nick).trailing_param(lines::NO_SUCH_NICK);
            Err(())
        }
    }
}

fn is_channel_name(s: &str) -> bool {
    s.starts_with('#') || s.starts_with('&')
}

// Send utilities
impl StateInner {
    /// Sends the given message to the given client.
    fn send(&self, id: usize, msg: MessageQueueItem) {
        if let Some(client) = self.clients.get(id) {
            client.send(msg);
        }
    }

    /// Sends the given message to all members of the given channel, except `except` if any.
    fn broadcast(&self, channel: &Channel, msg: &MessageQueueItem, except: Option<usize>) {
        for (member, _) in &channel.members {
            if Some(*member) != except {
                self.send(*member, msg.clone());
            }
        }
    }

    /// Sends the list of nicknames in the channel `channel_name` to the given client.
    fn write_names(&self, rb: &mut ReplyBuffer, channel: &Channel, channel_name: &str) {
        if !channel.members.is_empty() {
            let mut message = rb.reply(rpl::NAMREPLY).param("=").param(channel_name);
            let trailing = message.raw_trailing_param();
            for (member, modes) in &channel.members {
                let client = match self.clients.get(*member) {
                    Some(client) => client,
                    None => continue,
                };
                if let Some(s) = modes.symbol() {
                    trailing.push(s);
                }
                trailing.push_str(client.nick());
                trailing.push(' ');
            }
            trailing.pop();  // Remove last space
        }
        rb.reply(rpl::ENDOFNAMES).param(channel_name).trailing_param(lines::END_OF_NAMES);
    }

    /// Sends the topic of the channel `channel_name` to the given client.
    fn write_topic(rb: &mut ReplyBuffer, channel: &Channel, channel_name: &str) {
        if let Some(ref topic) = channel.topic {
            rb.reply(rpl::TOPIC).param(channel_name).trailing_param(topic);
        } else {
            rb.reply(rpl::NOTOPIC).param(channel_name).trailing_param(lines::NO_TOPIC);
        }
    }

    /// Sends welcome messages.  Called when a client has completed its registration.
    fn write_welcome(&self, rb: &mut ReplyBuffer, full_name: &str) {
        lines::welcome(rb.reply(rpl::WELCOME), full_name);
        lines::your_host(rb.reply(rpl::YOURHOST), &self.domain, server_version!());
        lines::created(rb.reply(rpl::CREATED), &self.created_at);
        rb.reply(rpl::MYINFO)
            .param(&self.domain)
            .param(server_version!())
            .param(mode::USER_MODES)
            .param(mode::CHAN_MODES);
    }
}
