//! Handlers of the recognized verbs.
//!
//! <https://tools.ietf.org/html/rfc2812.html>

use crate::channel::Channel;
use crate::client::MessageQueueItem;
use crate::lines;
use crate::util::split_list;
use chatrelay_tokens::{mode, rpl, Buffer, Command, MessageBuffer, ReplyBuffer};
use super::{find_channel, find_member, find_nick, find_operator, id_of, is_channel_name};
use super::{CommandContext, HandlerResult as Result};

fn is_valid_channel_name(s: &str, channellen: usize) -> bool {
    is_channel_name(s)
        && s.len() <= channellen
        && s.chars().all(|c| c != ' ' && c != ',' && !c.is_control())
}

fn is_valid_nickname(s: &str, nicklen: usize) -> bool {
    let first = match s.chars().next() {
        Some(first) => first,
        None => return false,
    };
    let is_forbidden = |c: char| {
        c.is_control() || c == ' ' || c == ',' || c == '!' || c == '@' || c == '*' || c == '?'
    };
    s.chars().count() <= nicklen
        && first != '#' && first != '&' && first != ':' && !first.is_ascii_digit()
        && !s.chars().any(is_forbidden)
}

/// Writes a message in `rb` for the issuer of the command, and returns the same message for the
/// other members of a channel.
fn notification<F>(rb: &mut ReplyBuffer, prefix: &str, command: Command,
                   fill: F) -> MessageQueueItem
    where F: Fn(MessageBuffer<'_>)
{
    fill(rb.message(prefix, command));
    let mut response = Buffer::new();
    fill(response.message(prefix, command));
    MessageQueueItem::from(response)
}

// Command handlers
impl super::StateInner {
    // INVITE

    pub fn cmd_invite(&mut self, ctx: CommandContext<'_>, nick: &str, channel_name: &str) -> Result {
        let target = find_nick(ctx.id, ctx.rb, &self.clients, nick)?;
        let channel = find_channel(ctx.id, ctx.rb, &self.channels, channel_name)?;
        let modes = find_member(ctx.id, ctx.rb, channel, channel_name)?;
        if channel.invite_only && !modes.operator {
            log::debug!("{}:     not operator", ctx.id);
            ctx.rb.reply(rpl::ERR_CHANOPRIVSNEEDED)
                .param(channel_name)
                .trailing_param(lines::CHAN_O_PRIVS_NEEDED);
            return Err(());
        }
        if channel.is_member(target) {
            log::debug!("{}:     target already on channel", ctx.id);
            ctx.rb.reply(rpl::ERR_USERONCHANNEL)
                .param(nick)
                .param(channel_name)
                .trailing_param(lines::USER_ON_CHANNEL);
            return Err(());
        }

        if let Some(channel) = self.channels.get_mut(channel_name) {
            channel.invites.insert(target);
        }

        ctx.rb.reply(rpl::INVITING).param(nick).param(channel_name);

        let mut invite = Buffer::new();
        invite.message(self.clients[ctx.id].full_name(), Command::Invite)
            .param(nick)
            .param(channel_name);
        self.send(target, MessageQueueItem::from(invite));

        Ok(())
    }

    // JOIN

    pub fn cmd_join(&mut self, ctx: CommandContext<'_>, targets: &str, keys: Option<&str>) -> Result {
        if targets == "0" {
            self.part_all(ctx.id, ctx.rb);
            return Ok(());
        }

        let mut keys = keys.unwrap_or("").split(',');
        for channel_name in targets.split(',') {
            let key = keys.next().filter(|key| !key.is_empty());
            if channel_name.is_empty() {
                continue;
            }
            let _ = self.join_one(ctx.id, ctx.rb, channel_name, key);
        }

        Ok(())
    }

    fn join_one(&mut self, id: usize, rb: &mut ReplyBuffer, channel_name: &str,
                key: Option<&str>) -> Result
    {
        log::debug!("{}:     JOIN {}", id, channel_name);
        if !is_valid_channel_name(channel_name, self.channellen) {
            log::debug!("{}:     bad channel name", id);
            rb.reply(rpl::ERR_BADCHANMASK).param(channel_name).trailing_param(lines::BAD_CHAN_MASK);
            return Err(());
        }
        if self.channels.get(channel_name).map_or(false, |channel| channel.is_member(id)) {
            log::debug!("{}:     already in channel", id);
            return Ok(());
        }
        if 0 < self.max_channels {
            let joined = self.channels.values().filter(|channel| channel.is_member(id)).count();
            if self.max_channels <= joined {
                log::debug!("{}:     too many channels", id);
                rb.reply(rpl::ERR_TOOMANYCHANNELS)
                    .param(channel_name)
                    .trailing_param(lines::TOO_MANY_CHANNELS);
                return Err(());
            }
        }
        if let Some(channel) = self.channels.get(channel_name) {
            if let Err(reply) = channel.check_join(id, key) {
                log::debug!("{}:     cannot join ({})", id, reply);
                let line = match reply {
                    rpl::ERR_INVITEONLYCHAN => lines::INVITE_ONLY_CHAN,
                    rpl::ERR_BADCHANNELKEY => lines::BAD_CHAN_KEY,
                    _ => lines::CHANNEL_IS_FULL,
                };
                rb.reply(reply).param(channel_name).trailing_param(line);
                return Err(());
            }
        }

        self.channels.entry(channel_name.to_owned())
            .or_insert_with(Channel::new)
            .add_member(id);

        let channel = &self.channels[channel_name];
        let join = notification(rb, self.clients[id].full_name(), Command::Join, |msg| {
            msg.param(channel_name);
        });
        self.broadcast(channel, &join, Some(id));
        Self::write_topic(rb, channel, channel_name);
        self.write_names(rb, channel, channel_name);

        Ok(())
    }

    // KICK

    pub fn cmd_kick(&mut self, ctx: CommandContext<'_>, channel_names: &str, nicks: &str,
                    reason: Option<&str>) -> Result
    {
        for channel_name in split_list(channel_names) {
            let allowed = find_channel(ctx.id, ctx.rb, &self.channels, channel_name)
                .and_then(|channel| find_operator(ctx.id, ctx.rb, channel, channel_name));
            if allowed.is_err() {
                continue;
            }
            for nick in split_list(nicks) {
                let _ = self.kick_one(ctx.id, ctx.rb, channel_name, nick, reason);
            }
        }
        Ok(())
    }

    fn kick_one(&mut self, id: usize, rb: &mut ReplyBuffer, channel_name: &str, nick: &str,
                reason: Option<&str>) -> Result
    {
        let channel = find_channel(id, rb, &self.channels, channel_name)?;
        if !channel.is_operator(id) {
            // The issuer kicked themselves earlier in the same command.
            return Err(());
        }
        let target = find_nick(id, rb, &self.clients, nick)?;
        if !channel.is_member(target) {
            log::debug!("{}:     target not on channel", id);
            rb.reply(rpl::ERR_USERNOTINCHANNEL)
                .param(nick)
                .param(channel_name)
                .trailing_param(lines::USER_NOT_IN_CHANNEL);
            return Err(());
        }

        let reason = reason.filter(|reason| !reason.is_empty()).unwrap_or(lines::DEFAULT_KICK);
        let kick = notification(rb, self.clients[id].full_name(), Command::Kick, |msg| {
            msg.param(channel_name).param(nick).trailing_param(reason);
        });
        self.broadcast(channel, &kick, Some(id));

        self.remove_member(channel_name, target);
        Ok(())
    }

    // MODE

    pub fn cmd_mode(&mut self, ctx: CommandContext<'_>, target: &str, modes: Option<&str>,
                    params: &[&str]) -> Result
    {
        if !is_channel_name(target) {
            log::debug!("{}:     user modes are not supported", ctx.id);
            return Ok(());
        }
        let channel = find_channel(ctx.id, ctx.rb, &self.channels, target)?;
        find_member(ctx.id, ctx.rb, channel, target)?;

        let modes = match modes.filter(|modes| !modes.is_empty()) {
            Some(modes) => modes,
            None => {
                channel.modes(ctx.rb.reply(rpl::CHANNELMODEIS).param(target));
                return Ok(());
            }
        };

        find_operator(ctx.id, ctx.rb, channel, target)?;

        let clients = &self.clients;
        let channel = match self.channels.get_mut(target) {
            Some(channel) => channel,
            None => return Err(()),
        };
        let mut applied_modes = String::new();
        let mut applied_params = Vec::new();
        for maybe_change in mode::channel_query(modes, params) {
            match maybe_change {
                Ok(change) => match channel.apply_mode_change(change, |nick| id_of(clients, nick)) {
                    Ok(true) => {
                        log::debug!("{}:     applied {:?}", ctx.id, change);
                        applied_modes.push(if change.value() { '+' } else { '-' });
                        applied_modes.push(change.symbol());
                        if let Some(param) = change.param() {
                            applied_params.push(param);
                        }
                    }
                    Ok(false) => {}
                    Err(rpl::ERR_NOSUCHNICK) => {
                        ctx.rb.reply(rpl::ERR_NOSUCHNICK)
                            .param(change.param().unwrap_or(""))
                            .trailing_param(lines::NO_SUCH_NICK);
                    }
                    Err(reply) => {
                        ctx.rb.reply(reply)
                            .param(change.param().unwrap_or(""))
                            .param(target)
                            .trailing_param(lines::USER_NOT_IN_CHANNEL);
                    }
                },
                Err(mode::Error::Unknown(letter, _)) => {
                    let mut msg = ctx.rb.reply(rpl::ERR_UNKNOWNMODE);
                    msg.raw_param().push(letter);
                    msg.trailing_param(lines::UNKNOWN_MODE);
                }
                Err(mode::Error::MissingParam(letter, _)) => {
                    log::debug!("{}:     missing parameter for {:?}", ctx.id, letter);
                }
            }
        }

        if !applied_modes.is_empty() {
            let channel = &self.channels[target];
            let mode_change = notification(ctx.rb, self.clients[ctx.id].full_name(), Command::Mode,
                                           |msg| {
                let msg = msg.param(target).param(&applied_modes);
                applied_params.iter().fold(msg, |msg, param| msg.param(param));
            });
            self.broadcast(channel, &mode_change, Some(ctx.id));
        }

        Ok(())
    }

    // NICK

    pub fn cmd_nick(&mut self, ctx: CommandContext<'_>, nick: Option<&str>) -> Result {
        let nick = match nick {
            Some(nick) => nick,
            None => {
                ctx.rb.reply(rpl::ERR_NONICKNAMEGIVEN).trailing_param(lines::NO_NICKNAME_GIVEN);
                return Err(());
            }
        };
        if !is_valid_nickname(nick, self.nicklen) {
            log::debug!("{}:     erroneous nickname", ctx.id);
            ctx.rb.reply(rpl::ERR_ERRONEUSNICKNAME)
                .param(nick)
                .trailing_param(lines::ERRONEOUS_NICKNAME);
            return Err(());
        }
        if self.clients[ctx.id].nick() == nick {
            return Ok(());
        }
        if self.clients.iter().any(|(_, client)| client.nick() == nick) {
            log::debug!("{}:     nickname in use", ctx.id);
            ctx.rb.reply(rpl::ERR_NICKNAMEINUSE)
                .param(nick)
                .trailing_param(lines::NICKNAME_IN_USE);
            return Err(());
        }

        let client = &mut self.clients[ctx.id];
        if client.is_registered() {
            // Only the client itself is told about the change.
            ctx.rb.message(client.full_name(), Command::Nick).trailing_param(nick);
        }
        client.set_nick(nick);

        Ok(())
    }

    // NOTICE

    pub fn cmd_notice(&mut self, ctx: CommandContext<'_>, targets: Option<&str>,
                      content: Option<&str>) -> Result
    {
        let (targets, content) = match (targets, content) {
            (Some(targets), Some(content)) if !content.is_empty() => (targets, content),
            _ => return Err(()),
        };
        if self.max_targets < split_list(targets).count() {
            log::debug!("{}:     too many targets", ctx.id);
            return Err(());
        }

        // NOTICE never triggers an error reply.
        let mut discarded = ReplyBuffer::new(&self.domain, "");
        for target in split_list(targets) {
            let _ = self.deliver(ctx.id, &mut discarded, Command::Notice, target, content);
        }
        Ok(())
    }

    // PART

    pub fn cmd_part(&mut self, ctx: CommandContext<'_>, channel_names: &str,
                    reason: Option<&str>) -> Result
    {
        for channel_name in split_list(channel_names) {
            let _ = self.part_one(ctx.id, ctx.rb, channel_name, reason);
        }
        Ok(())
    }

    fn part_one(&mut self, id: usize, rb: &mut ReplyBuffer, channel_name: &str,
                reason: Option<&str>) -> Result
    {
        let channel = find_channel(id, rb, &self.channels, channel_name)?;
        find_member(id, rb, channel, channel_name)?;

        let reason = reason.filter(|reason| !reason.is_empty()).unwrap_or(lines::DEFAULT_PART);
        let part = notification(rb, self.clients[id].full_name(), Command::Part, |msg| {
            msg.param(channel_name).trailing_param(reason);
        });
        self.broadcast(channel, &part, Some(id));

        self.remove_member(channel_name, id);
        Ok(())
    }

    /// Parts every channel the client is in (JOIN 0).
    fn part_all(&mut self, id: usize, rb: &mut ReplyBuffer) {
        let mut joined: Vec<String> = self.channels.iter()
            .filter(|(_, channel)| channel.is_member(id))
            .map(|(name, _)| name.clone())
            .collect();
        joined.sort();
        for channel_name in joined {
            let _ = self.part_one(id, rb, &channel_name, Some(lines::PART_ALL));
        }
    }

    /// Removes a member from a channel, and the channel itself if it is then empty.
    fn remove_member(&mut self, channel_name: &str, id: usize) {
        let is_empty = match self.channels.get_mut(channel_name) {
            Some(channel) => {
                channel.remove_member(id);
                channel.members.is_empty()
            }
            None => false,
        };
        if is_empty {
            log::debug!("{}: Channel {} is now empty", id, channel_name);
            self.channels.remove(channel_name);
        }
    }

    // PASS

    pub fn cmd_pass(&mut self, ctx: CommandContext<'_>, password: &str) -> Result {
        if let Some(ref expected) = self.password {
            if expected != password {
                log::debug!("{}:     wrong password", ctx.id);
                ctx.rb.reply(rpl::ERR_PASSWDMISMATCH).trailing_param(lines::PASSWORD_MISMATCH);
                return Err(());
            }
        }
        self.clients[ctx.id].authenticate();
        Ok(())
    }

    // PING

    pub fn cmd_ping(&mut self, ctx: CommandContext<'_>, token: &str) -> Result {
        ctx.rb.prefixed_message(Command::Pong)
            .param(&self.domain)
            .trailing_param(token);
        Ok(())
    }

    // PRIVMSG

    pub fn cmd_privmsg(&mut self, ctx: CommandContext<'_>, targets: Option<&str>,
                       content: Option<&str>) -> Result
    {
        let targets = match targets {
            Some(targets) if split_list(targets).next().is_some() => targets,
            _ => {
                lines::no_recipient(ctx.rb.reply(rpl::ERR_NORECIPIENT), Command::PrivMsg.as_str());
                return Err(());
            }
        };
        let content = match content {
            Some(content) if !content.is_empty() => content,
            _ => {
                ctx.rb.reply(rpl::ERR_NOTEXTTOSEND).trailing_param(lines::NO_TEXT_TO_SEND);
                return Err(());
            }
        };
        if self.max_targets < split_list(targets).count() {
            log::debug!("{}:     too many targets", ctx.id);
            ctx.rb.reply(rpl::ERR_TOOMANYTARGETS)
                .param(targets)
                .trailing_param(lines::TOO_MANY_TARGETS);
            return Err(());
        }

        for target in split_list(targets) {
            let _ = self.deliver(ctx.id, ctx.rb, Command::PrivMsg, target, content);
        }
        Ok(())
    }

    /// Sends a PRIVMSG or a NOTICE to one target, which is either a channel or a nickname.
    fn deliver(&self, id: usize, rb: &mut ReplyBuffer, command: Command, target: &str,
               content: &str) -> Result
    {
        let mut response = Buffer::new();
        response.message(self.clients[id].full_name(), command)
            .param(target)
            .trailing_param(content);
        let msg = MessageQueueItem::from(response);

        if is_channel_name(target) {
            let channel = find_channel(id, rb, &self.channels, target)?;
            if !channel.is_member(id) {
                log::debug!("{}:     cannot send to {}", id, target);
                rb.reply(rpl::ERR_CANNOTSENDTOCHAN)
                    .param(target)
                    .trailing_param(lines::CANNOT_SEND_TO_CHAN);
                return Err(());
            }
            self.broadcast(channel, &msg, Some(id));
        } else {
            let target = find_nick(id, rb, &self.clients, target)?;
            self.send(target, msg);
        }
        Ok(())
    }

    // QUIT

    pub fn cmd_quit(&mut self, ctx: CommandContext<'_>, reason: Option<&str>) -> Result {
        let reason = reason.filter(|reason| !reason.is_empty()).unwrap_or(lines::DEFAULT_QUIT);

        let mut error = Buffer::new();
        error.message("", "ERROR").trailing_param(lines::CLOSING_LINK);
        self.send(ctx.id, MessageQueueItem::from(error));

        self.remove_client(ctx.id, reason);
        Ok(())
    }

    // TOPIC

    pub fn cmd_topic(&mut self, ctx: CommandContext<'_>, channel_name: &str,
                     topic: Option<&str>) -> Result
    {
        let channel = find_channel(ctx.id, ctx.rb, &self.channels, channel_name)?;
        let modes = find_member(ctx.id, ctx.rb, channel, channel_name)?;

        let topic = match topic {
            Some(topic) => topic,
            None => {
                Self::write_topic(ctx.rb, channel, channel_name);
                return Ok(());
            }
        };
        if channel.topic_restricted && !modes.operator {
            log::debug!("{}:     not operator", ctx.id);
            ctx.rb.reply(rpl::ERR_CHANOPRIVSNEEDED)
                .param(channel_name)
                .trailing_param(lines::CHAN_O_PRIVS_NEEDED);
            return Err(());
        }

        if let Some(channel) = self.channels.get_mut(channel_name) {
            channel.set_topic(topic);
        }

        let channel = &self.channels[channel_name];
        let topic_change = notification(ctx.rb, self.clients[ctx.id].full_name(), Command::Topic,
                                        |msg| msg.param(channel_name).trailing_param(topic));
        self.broadcast(channel, &topic_change, Some(ctx.id));

        Ok(())
    }

    // USER

    pub fn cmd_user(&mut self, ctx: CommandContext<'_>, params: &[&str],
                    real: Option<&str>) -> Result
    {
        let (user, real) = match (params, real) {
            ([user, _, _], Some(real)) if !real.is_empty() => (*user, real),
            _ => {
                ctx.rb.reply(rpl::ERR_NEEDMOREPARAMS)
                    .param(Command::User.as_str())
                    .trailing_param(lines::NEED_MORE_PARAMS);
                return Err(());
            }
        };

        let client = &mut self.clients[ctx.id];
        if !client.is_authenticated() {
            log::debug!("{}:     password required", ctx.id);
            ctx.rb.reply(rpl::ERR_PASSWDMISMATCH).trailing_param(lines::PASSWORD_REQUIRED);
            return Err(());
        }
        if !client.has_nick() {
            log::debug!("{}:     no nickname", ctx.id);
            ctx.rb.reply(rpl::ERR_NOTREGISTERED).trailing_param(lines::NICK_FIRST);
            return Err(());
        }

        client.set_user_real(user, real);
        client.register();
        log::debug!("{}: Registered as {} ({})", ctx.id, client.full_name(), client.real());

        let full_name = client.full_name().to_owned();
        ctx.rb.set_nick(client.nick());
        self.write_welcome(ctx.rb, &full_name);

        Ok(())
    }
}
