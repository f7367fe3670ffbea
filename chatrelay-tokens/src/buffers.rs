use crate::{Command, MESSAGE_LENGTH};
use std::fmt;

/// Helper to build one line.
///
/// Use with `Buffer::message` and `ReplyBuffer::message`.  The CR LF terminator is appended when
/// the `MessageBuffer` is dropped.
pub struct MessageBuffer<'a> {
    buf: &'a mut String,
}

impl<'a> MessageBuffer<'a> {
    fn with_prefix<C>(buf: &'a mut String, prefix: &str, command: C) -> Self
        where C: Into<Command>
    {
        if !prefix.is_empty() {
            buf.push(':');
            buf.push_str(prefix);
            buf.push(' ');
        }
        buf.push_str(command.into().as_str());
        MessageBuffer { buf }
    }

    /// Appends a parameter to the message.
    ///
    /// The parameter is trimmed before insertion.  If `param` is whitespace, it is not appended.
    ///
    /// **Note**: It is up to the caller to make sure there is no remaining whitespace or newline
    /// in the parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Command, Buffer};
    /// let mut response = Buffer::new();
    ///
    /// response.message("alice!~al@localhost", Command::Part)
    ///     .param("")
    ///     .param("  #rust ");
    ///
    /// assert_eq!(&response.build(), ":alice!~al@localhost PART #rust\r\n");
    /// ```
    pub fn param(self, param: &str) -> Self {
        let param = param.trim();
        if param.is_empty() {
            return self;
        }
        self.buf.push(' ');
        self.buf.push_str(param);
        self
    }

    /// Formats, then appends a parameter to the message.
    ///
    /// The parameter is **NOT** trimmed before insertion, and is appended even if it's empty.
    pub fn fmt_param<T>(self, param: T) -> Self
        where T: fmt::Display
    {
        use std::fmt::Write as _;

        self.buf.push(' ');
        let _ = write!(self.buf, "{}", param);
        self
    }

    /// Appends the trailing parameter to the message and consumes the buffer.
    ///
    /// Contrary to `MessageBuffer::param`, the parameter is not trimmed, and is appended even if
    /// it is empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Command, Buffer};
    /// let mut response = Buffer::new();
    ///
    /// response.message("alice!~al@localhost", Command::Quit)
    ///     .trailing_param("long quit message");
    ///
    /// assert_eq!(&response.build(), ":alice!~al@localhost QUIT :long quit message\r\n");
    /// ```
    pub fn trailing_param(self, param: &str) {
        self.buf.push(' ');
        self.buf.push(':');
        self.buf.push_str(param);
    }

    /// Returns a buffer the caller can use to append characters to a middle parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Command, Buffer};
    /// let mut response = Buffer::new();
    /// {
    ///     let mut msg = response.message("alice!~al@localhost", Command::Mode)
    ///         .param("#rust");
    ///     let param = msg.raw_param();
    ///     param.push_str("+i-t");
    /// }
    ///
    /// assert_eq!(&response.build(), ":alice!~al@localhost MODE #rust +i-t\r\n");
    /// ```
    pub fn raw_param(&mut self) -> &mut String {
        self.buf.push(' ');
        self.buf
    }

    /// Returns a buffer the caller can use to append characters to the trailing parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Buffer, rpl};
    /// let mut response = Buffer::new();
    /// {
    ///     let mut msg = response.message("server", rpl::NAMREPLY)
    ///         .param("alice");
    ///     let param = msg.raw_trailing_param();
    ///     param.push_str("@alice");
    ///     param.push(' ');
    ///     param.push_str("bob");
    /// }
    ///
    /// assert_eq!(&response.build(), ":server 353 alice :@alice bob\r\n");
    /// ```
    pub fn raw_trailing_param(&mut self) -> &mut String {
        self.buf.push(' ');
        self.buf.push(':');
        self.buf
    }
}

impl Drop for MessageBuffer<'_> {
    /// Auto-magically append "\r\n" when the `MessageBuffer` is dropped.
    fn drop(&mut self) {
        self.buf.push('\r');
        self.buf.push('\n');
    }
}

/// Helper to build lines.
///
/// The `Buffer` is used to ease the creation of strings representing valid lines.  If you mainly
/// need to send numeric replies, `ReplyBuffer` might be a better fit.
///
/// # Example
///
/// ```rust
/// # use chatrelay_tokens::{Command, Buffer, rpl};
/// let mut response = Buffer::new();
///
/// response.message("alice!~al@localhost", Command::Topic)
///     .param("#hall")
///     .trailing_param("Welcome to new users!");
/// response.message("server", rpl::TOPIC)
///     .param("bob")
///     .param("#hall")
///     .trailing_param("Welcome to new users!");
///
/// let result = response.build();
/// assert_eq!(&result, ":alice!~al@localhost TOPIC #hall :Welcome to new users!\r\n\
/// :server 332 bob #hall :Welcome to new users!\r\n");
/// ```
#[derive(Debug, Default)]
pub struct Buffer {
    buf: String,
}

impl Buffer {
    /// Creates a `Buffer`.  Does not allocate.
    pub fn new() -> Self {
        Self {
            buf: String::new(),
        }
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends a message with a prefix to the buffer.
    ///
    /// If the given `prefix` is empty, no prefix is added.  This function may allocate to reserve
    /// space for the message.
    pub fn message<C>(&mut self, prefix: &str, command: C) -> MessageBuffer<'_>
        where C: Into<Command>
    {
        self.buf.reserve(MESSAGE_LENGTH);
        MessageBuffer::with_prefix(&mut self.buf, prefix, command)
    }

    /// Consumes the `Buffer` and returns the underlying `String`.
    pub fn build(self) -> String {
        self.buf
    }
}

/// A helper to build responses meant for one client.
///
/// While `Buffer` is able to build any kind of line, `ReplyBuffer` allows for easy creation of
/// numeric replies: `:<domain> <code> <nickname> ...`.  When the client has no nickname yet, `*`
/// is used instead.
///
/// # Example
///
/// ```rust
/// # use chatrelay_tokens::{Command, ReplyBuffer, rpl};
/// let mut response = ReplyBuffer::new("server", "");
///
/// response.reply(rpl::ERR_NOTREGISTERED).trailing_param("You have not registered");
/// response.set_nick("alice");
/// response.reply(rpl::WELCOME).trailing_param("Welcome");
/// response.prefixed_message(Command::Pong).param("server").trailing_param("token");
///
/// assert_eq!(&response.build(), ":server 451 * :You have not registered\r\n\
/// :server 001 alice :Welcome\r\n\
/// :server PONG server :token\r\n");
/// ```
#[derive(Debug)]
pub struct ReplyBuffer {
    buf: Buffer,
    domain: String,
    nick: String,
}

impl ReplyBuffer {
    /// Creates a new `ReplyBuffer` for the client with the given nickname.
    pub fn new(domain: &str, nickname: &str) -> Self {
        let mut res = Self {
            buf: Buffer::new(),
            domain: domain.to_owned(),
            nick: String::new(),
        };
        res.set_nick(nickname);
        res
    }

    /// Whether the buffer has messages in it or not.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Changes the nickname used as first parameter of replies.
    pub fn set_nick(&mut self, nickname: &str) {
        self.nick.clear();
        if nickname.is_empty() {
            self.nick.push('*');
        } else {
            self.nick.push_str(nickname);
        }
    }

    /// Appends a reply to the buffer.
    ///
    /// This will push the domain, the reply and the nickname of the client, and then return the
    /// resulting `MessageBuffer`.
    pub fn reply<C>(&mut self, r: C) -> MessageBuffer<'_>
        where C: Into<Command>
    {
        self.buf.buf.reserve(MESSAGE_LENGTH);
        let msg = MessageBuffer::with_prefix(&mut self.buf.buf, &self.domain, r);
        msg.param(&self.nick)
    }

    /// Appends a command to the buffer, with the domain prefix, but without the nickname
    /// parameter.
    pub fn prefixed_message<C>(&mut self, command: C) -> MessageBuffer<'_>
        where C: Into<Command>
    {
        self.buf.buf.reserve(MESSAGE_LENGTH);
        MessageBuffer::with_prefix(&mut self.buf.buf, &self.domain, command)
    }

    /// Appends a prefixed message like you would do with a `Buffer`.
    pub fn message<C>(&mut self, prefix: &str, command: C) -> MessageBuffer<'_>
        where C: Into<Command>
    {
        self.buf.message(prefix, command)
    }

    /// Consumes the buffer and returns the underlying `String`.
    pub fn build(self) -> String {
        self.buf.build()
    }
}
