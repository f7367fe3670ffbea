use chatrelay_tokens::{mode, rpl, MessageBuffer, Reply};
use std::collections::HashSet;

/// Modes applied to clients on a per-channel basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemberModes {
    pub operator: bool,
}

impl MemberModes {
    /// The prefix of the member's nickname in RPL_NAMREPLY.
    pub fn symbol(self) -> Option<char> {
        if self.operator {
            Some('@')
        } else {
            None
        }
    }
}

/// Channel data.
pub struct Channel {
    /// Members, identified by their client ID and associated with their channel modes.
    ///
    /// Kept in join order, which is the order of RPL_NAMREPLY.
    pub members: Vec<(usize, MemberModes)>,

    /// The topic.  Never `Some("")`.
    pub topic: Option<String>,

    pub key: Option<String>,
    pub user_limit: Option<usize>,

    /// Clients that have been invited and have not joined yet.
    pub invites: HashSet<usize>,

    pub invite_only: bool,
    pub topic_restricted: bool,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            topic: None,
            key: None,
            user_limit: None,
            invites: HashSet::new(),
            invite_only: false,
            topic_restricted: true,
        }
    }
}

impl Channel {
    /// Creates an empty channel with the 't' mode set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member.  The first member of a channel becomes its operator.
    ///
    /// Consumes the invitation of the client, if any.
    pub fn add_member(&mut self, id: usize) {
        let modes = MemberModes {
            operator: self.members.is_empty(),
        };
        self.invites.remove(&id);
        if !self.is_member(id) {
            self.members.push((id, modes));
        }
    }

    /// Removes every trace of a client, including pending invitations.
    pub fn remove_member(&mut self, id: usize) {
        self.members.retain(|(member, _)| *member != id);
        self.invites.remove(&id);
    }

    pub fn member_modes(&self, id: usize) -> Option<MemberModes> {
        self.members.iter().find(|(member, _)| *member == id).map(|(_, modes)| *modes)
    }

    pub fn is_member(&self, id: usize) -> bool {
        self.member_modes(id).is_some()
    }

    pub fn is_operator(&self, id: usize) -> bool {
        self.member_modes(id).map_or(false, |modes| modes.operator)
    }

    /// Gives or takes operator privileges.  Returns false if `id` is not a member.
    pub fn set_operator(&mut self, id: usize, value: bool) -> bool {
        match self.members.iter_mut().find(|(member, _)| *member == id) {
            Some((_, modes)) => {
                modes.operator = value;
                true
            }
            None => false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.user_limit.map_or(false, |limit| limit <= self.members.len())
    }

    pub fn is_invited(&self, id: usize) -> bool {
        self.invites.contains(&id)
    }

    /// Checks whether the client `id` can join with the given key.
    ///
    /// Invite-only is checked first, then the key, then the user limit.
    pub fn check_join(&self, id: usize, key: Option<&str>) -> Result<(), Reply> {
        if self.invite_only && !self.is_invited(id) {
            return Err(rpl::ERR_INVITEONLYCHAN);
        }
        if let Some(ref chan_key) = self.key {
            if key != Some(chan_key.as_str()) {
                return Err(rpl::ERR_BADCHANNELKEY);
            }
        }
        if self.is_full() {
            return Err(rpl::ERR_CHANNELISFULL);
        }
        Ok(())
    }

    /// Sets the topic.  An empty topic clears it.
    pub fn set_topic(&mut self, topic: &str) {
        if topic.is_empty() {
            self.topic = None;
        } else {
            self.topic = Some(topic.to_owned());
        }
    }

    /// Writes the mode summary (e.g. `+tl 10`) as parameters of `out`.
    ///
    /// The key is never disclosed.
    pub fn modes(&self, mut out: MessageBuffer<'_>) {
        let modes = out.raw_param();
        modes.push('+');
        if self.invite_only { modes.push('i'); }
        if self.topic_restricted { modes.push('t'); }
        if self.key.is_some() { modes.push('k'); }
        if self.user_limit.is_some() { modes.push('l'); }
        if let Some(user_limit) = self.user_limit {
            out.fmt_param(user_limit);
        }
    }

    /// Applies one change of a MODE query.
    ///
    /// Returns whether the change must be echoed to the channel.  `id_of` returns the client ID
    /// of a nickname, and is used for `o` changes.
    pub fn apply_mode_change<F>(&mut self, change: mode::ChannelChange<'_>,
                                id_of: F) -> Result<bool, Reply>
        where F: Fn(&str) -> Option<usize>
    {
        use mode::ChannelChange::*;
        let applied = match change {
            InviteOnly(value) => {
                self.invite_only = value;
                true
            }
            TopicRestricted(value) => {
                self.topic_restricted = value;
                true
            }
            Key(true, key) => {
                self.key = key.map(str::to_owned);
                self.key.is_some()
            }
            Key(false, _) => {
                self.key = None;
                true
            }
            UserLimit(Some(s)) => match s.parse() {
                Ok(limit) if 0 < limit => {
                    self.user_limit = Some(limit);
                    true
                }
                _ => false,
            },
            UserLimit(None) => {
                self.user_limit = None;
                true
            }
            ChangeOperator(value, nick) => {
                let id = id_of(nick).ok_or(rpl::ERR_NOSUCHNICK)?;
                if !self.set_operator(id, value) {
                    return Err(rpl::ERR_USERNOTINCHANNEL);
                }
                true
            }
        };
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_tokens::{Buffer, Command};

    fn summary(channel: &Channel) -> String {
        let mut response = Buffer::new();
        channel.modes(response.message("", Command::Mode));
        response.build()
    }

    #[test]
    fn test_first_member_is_operator() {
        let mut channel = Channel::new();
        channel.add_member(4);
        channel.add_member(2);
        assert!(channel.is_operator(4));
        assert!(!channel.is_operator(2));
        assert_eq!(channel.members.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![4, 2]);

        channel.remove_member(4);
        assert!(!channel.is_member(4));
        assert!(!channel.is_operator(2));
    }

    #[test]
    fn test_check_join_order() {
        let mut channel = Channel::new();
        channel.add_member(0);
        channel.invite_only = true;
        channel.key = Some("secret".to_owned());
        channel.user_limit = Some(1);
        assert_eq!(channel.check_join(1, Some("secret")), Err(rpl::ERR_INVITEONLYCHAN));

        channel.invites.insert(1);
        assert_eq!(channel.check_join(1, None), Err(rpl::ERR_BADCHANNELKEY));
        assert_eq!(channel.check_join(1, Some("secret")), Err(rpl::ERR_CHANNELISFULL));

        channel.user_limit = Some(2);
        assert_eq!(channel.check_join(1, Some("secret")), Ok(()));
        channel.add_member(1);
        assert!(!channel.is_invited(1));
    }

    #[test]
    fn test_modes_summary() {
        let mut channel = Channel::new();
        assert_eq!(summary(&channel), "MODE +t\r\n");

        channel.invite_only = true;
        channel.key = Some("secret".to_owned());
        channel.user_limit = Some(10);
        assert_eq!(summary(&channel), "MODE +itkl 10\r\n");

        channel.topic_restricted = false;
        channel.invite_only = false;
        channel.key = None;
        channel.user_limit = None;
        assert_eq!(summary(&channel), "MODE +\r\n");
    }

    #[test]
    fn test_apply_mode_change() {
        use mode::ChannelChange::*;

        let mut channel = Channel::new();
        channel.add_member(0);
        channel.add_member(1);
        let id_of = |nick: &str| match nick {
            "alice" => Some(0),
            "bob" => Some(1),
            "carol" => Some(2),
            _ => None,
        };

        assert_eq!(channel.apply_mode_change(UserLimit(Some("abc")), id_of), Ok(false));
        assert_eq!(channel.apply_mode_change(UserLimit(Some("0")), id_of), Ok(false));
        assert_eq!(channel.user_limit, None);
        assert_eq!(channel.apply_mode_change(UserLimit(Some("3")), id_of), Ok(true));
        assert_eq!(channel.user_limit, Some(3));

        assert_eq!(channel.apply_mode_change(Key(true, Some("k")), id_of), Ok(true));
        assert_eq!(channel.key.as_deref(), Some("k"));
        assert_eq!(channel.apply_mode_change(Key(false, Some("wrong")), id_of), Ok(true));
        assert_eq!(channel.key, None);

        assert_eq!(channel.apply_mode_change(ChangeOperator(true, "bob"), id_of), Ok(true));
        assert!(channel.is_operator(1));
        assert_eq!(channel.apply_mode_change(ChangeOperator(true, "dave"), id_of),
                   Err(rpl::ERR_NOSUCHNICK));
        assert_eq!(channel.apply_mode_change(ChangeOperator(true, "carol"), id_of),
                   Err(rpl::ERR_USERNOTINCHANNEL));
    }

    #[test]
    fn test_empty_topic_clears() {
        let mut channel = Channel::new();
        channel.set_topic("hello");
        assert_eq!(channel.topic.as_deref(), Some("hello"));
        channel.set_topic("");
        assert_eq!(channel.topic, None);
    }
}
