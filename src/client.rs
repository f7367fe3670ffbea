//! Client management and connection state.

use chatrelay_tokens::{framer, rpl, Buffer, Command, Framer, Reply, ReplyBuffer};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A message to be sent to a client.
///
/// It may contain several lines.  Clones share the same data, so broadcasting a message to a
/// whole channel only allocates once.
#[derive(Clone, Debug)]
pub struct MessageQueueItem(Arc<str>);

impl From<String> for MessageQueueItem {
    fn from(bytes: String) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<Buffer> for MessageQueueItem {
    fn from(response: Buffer) -> Self {
        Self::from(response.build())
    }
}

impl From<ReplyBuffer> for MessageQueueItem {
    fn from(response: ReplyBuffer) -> Self {
        Self::from(response.build())
    }
}

impl AsRef<str> for MessageQueueItem {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for MessageQueueItem {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// The write end of the queue of messages to be sent to a client.
pub type MessageQueue = mpsc::UnboundedSender<MessageQueueItem>;

/// Client data.
pub struct Client {
    /// The queue of messages to be sent to the client.
    ///
    /// It is unbounded, meaning sending messages to this channel does not block.
    queue: MessageQueue,

    /// Input that has been received but not yet cut into lines.
    framer: Framer,

    /// The state of the connection with the client.
    state: ConnectionState,

    /// The nickname, empty until the client sends a valid NICK.
    nick: String,

    /// The username, set by USER.
    user: String,

    /// The real name, set by USER.
    real: String,

    /// `nick!~user@localhost`, used as the prefix of the messages this client generates.
    full_name: String,
}

impl Client {
    /// Initialize the data for a new client, given its message queue.
    ///
    /// `password_required` tells whether the client must send PASS before registering.
    pub fn new(queue: MessageQueue, password_required: bool) -> Self {
        let mut res = Self {
            queue,
            framer: Framer::new(),
            state: ConnectionState::new(password_required),
            nick: String::new(),
            user: String::new(),
            real: String::new(),
            full_name: String::new(),
        };
        res.update_full_name();
        res
    }

    /// Appends incoming bytes and returns the lines they complete.
    pub fn read(&mut self, bytes: &[u8]) -> Vec<Result<String, framer::Error>> {
        self.framer.append(bytes);
        self.framer.extract_lines()
    }

    /// Add a message to the client message queue.
    ///
    /// Use this function to send messages to the client.  If the connection is being torn down,
    /// the message is dropped.
    pub fn send<M>(&self, msg: M)
        where M: Into<MessageQueueItem>
    {
        let _ = self.queue.send(msg.into());
    }

    /// Whether or not the client can issue the given command.
    ///
    /// On failure, returns the reply to send to the client.
    pub fn can_issue_command(&self, cmd: Command) -> Result<(), Reply> {
        self.state.can_issue(cmd)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state.is_registered()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Records that the client has sent the right password.
    pub fn authenticate(&mut self) {
        self.state = self.state.apply_password();
    }

    /// Completes the registration.
    pub fn register(&mut self) {
        self.state = ConnectionState::Registered;
    }

    /// The nickname of the client, or an empty string if it has not set one yet.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn has_nick(&self) -> bool {
        !self.nick.is_empty()
    }

    /// Change the nickname of the client.
    ///
    /// This function does not change the connection state.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick.clear();
        self.nick.push_str(nick);
        self.update_full_name();
    }

    pub fn real(&self) -> &str {
        &self.real
    }

    /// Change the username and the realname of the client.
    ///
    /// This function does not change the connection state.
    pub fn set_user_real(&mut self, user: &str, real: &str) {
        self.user.clear();
        self.user.push_str(user);
        self.real.clear();
        self.real.push_str(real);
        self.update_full_name();
    }

    /// The `nick!~user@localhost` string.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    fn update_full_name(&mut self) {
        self.full_name.clear();
        self.full_name.push_str(if self.nick.is_empty() { "*" } else { &self.nick });
        self.full_name.push_str("!~");
        self.full_name.push_str(&self.user);
        self.full_name.push_str("@localhost");
    }
}

/// A state machine that represents the connection with a client.  It keeps track of what
/// commands the client can send.
///
/// For example, a client that has only sent a "NICK" message cannot send a "JOIN" message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// The client must send the server password before it can register.
    Unauthenticated,

    /// The password has been accepted, or none is needed.  The client still needs to send NICK
    /// and USER.
    Authenticated,

    /// The client is registered, and can send any command except PASS and USER.
    Registered,
}

impl ConnectionState {
    /// The connection state of a client that has just connected to the server.
    pub fn new(password_required: bool) -> Self {
        if password_required {
            ConnectionState::Unauthenticated
        } else {
            ConnectionState::Authenticated
        }
    }

    /// Returns `Ok(())` if a client in this state can send the given command, or the reply code
    /// to send otherwise.
    pub fn can_issue(self, cmd: Command) -> Result<(), Reply> {
        match self {
            ConnectionState::Registered => match cmd {
                Command::Pass | Command::User => Err(rpl::ERR_ALREADYREGISTRED),
                _ => Ok(()),
            },
            _ => match cmd {
                Command::Pass | Command::Nick | Command::User | Command::Quit => Ok(()),
                _ => Err(rpl::ERR_NOTREGISTERED),
            },
        }
    }

    /// The state after a successful PASS.
    pub fn apply_password(self) -> Self {
        match self {
            ConnectionState::Unauthenticated => ConnectionState::Authenticated,
            other => other,
        }
    }

    pub fn is_authenticated(self) -> bool {
        self != ConnectionState::Unauthenticated
    }

    pub fn is_registered(self) -> bool {
        self == ConnectionState::Registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_gate() {
        let state = ConnectionState::new(true);
        assert_eq!(state, ConnectionState::Unauthenticated);
        assert_eq!(state.can_issue(Command::Pass), Ok(()));
        assert_eq!(state.can_issue(Command::Nick), Ok(()));
        assert_eq!(state.can_issue(Command::Quit), Ok(()));
        assert_eq!(state.can_issue(Command::Join), Err(rpl::ERR_NOTREGISTERED));
        assert_eq!(state.can_issue(Command::Ping), Err(rpl::ERR_NOTREGISTERED));

        let state = state.apply_password();
        assert_eq!(state, ConnectionState::Authenticated);
        assert_eq!(state.can_issue(Command::PrivMsg), Err(rpl::ERR_NOTREGISTERED));

        let state = ConnectionState::Registered;
        assert_eq!(state.can_issue(Command::User), Err(rpl::ERR_ALREADYREGISTRED));
        assert_eq!(state.can_issue(Command::Pass), Err(rpl::ERR_ALREADYREGISTRED));
        assert_eq!(state.can_issue(Command::Join), Ok(()));
        assert_eq!(state.apply_password(), ConnectionState::Registered);
    }

    #[test]
    fn test_no_password() {
        let state = ConnectionState::new(false);
        assert!(state.is_authenticated());
        assert!(!state.is_registered());
    }

    #[test]
    fn test_full_name() {
        let (queue, _) = mpsc::unbounded_channel();
        let mut client = Client::new(queue, false);
        assert_eq!(client.full_name(), "*!~@localhost");
        client.set_nick("alice");
        client.set_user_real("al", "Alice");
        assert_eq!(client.full_name(), "alice!~al@localhost");
        client.set_nick("bob");
        assert_eq!(client.full_name(), "bob!~al@localhost");
    }
}
