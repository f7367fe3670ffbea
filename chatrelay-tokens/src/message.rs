use crate::Command;
use std::fmt;

/// The maximum length of a line, terminator included.
///
/// Longer input is rejected by both the `Framer` and `Message::parse`.  It is also used by
/// `Buffer` to reserve space when building a message.
pub const MESSAGE_LENGTH: usize = 512;

/// The number of elements in `Message::params`.
///
/// The trailing segment counts as a parameter, so a message has at most `PARAMS_LENGTH - 1`
/// middle parameters.
pub const PARAMS_LENGTH: usize = 15;

/// Reasons why a line is not a valid message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// The line has no content.
    Empty,

    /// The line is longer than `MESSAGE_LENGTH`.
    TooLong,

    /// The line contains a line feed that is not part of a final CR LF.
    BadTerminator,

    /// The line starts with a prefix that is not followed by a space.
    MalformedPrefix,

    /// There is no verb where one is expected.
    EmptyVerb,

    /// The verb is not one of the recognized commands.
    UnknownVerb(&'a str),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::TooLong => write!(f, "line longer than {} bytes", MESSAGE_LENGTH),
            Self::BadTerminator => write!(f, "malformed line terminator"),
            Self::MalformedPrefix => write!(f, "prefix not followed by a verb"),
            Self::EmptyVerb => write!(f, "missing verb"),
            Self::UnknownVerb(verb) => write!(f, "unknown verb {:?}", verb),
        }
    }
}

impl std::error::Error for ParseError<'_> {}

/// Returns `(word, rest)` where `word` is everything up to the first space, and `rest` is what
/// comes after that space.
///
/// Contrary to parameters, the verb is not allowed to be preceded by extra spaces, so this
/// function does not trim anything.
fn split_word(s: &str) -> (&str, &str) {
    match s.find(' ') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

/// If the given string starts with a prefix, returns `(Some(prefix), rest)` where `rest` starts
/// right after the space that ends the prefix.
fn parse_prefix(buf: &str) -> Result<(Option<&str>, &str), ParseError<'_>> {
    match buf.strip_prefix(':') {
        Some(rest) => match rest.find(' ') {
            Some(i) => Ok((Some(&rest[..i]), &rest[i + 1..])),
            None => Err(ParseError::MalformedPrefix),
        },
        None => Ok((None, buf)),
    }
}

/// A parsed line.
///
/// Parameters are borrowed from the line, nothing is allocated.
#[derive(Clone, Debug)]
pub struct Message<'a> {
    /// The prefix of the message, without the leading colon.
    pub prefix: Option<&'a str>,

    /// The verb.
    pub command: Command,

    /// The number of middle parameters in `params`.
    pub num_params: usize,

    /// The middle parameters.  Only the first `num_params` elements are relevant, the others
    /// are empty strings.
    pub params: [&'a str; PARAMS_LENGTH],

    /// The trailing segment, without its leading colon.  May be empty or contain spaces.
    pub trailing: Option<&'a str>,
}

impl<'a> Message<'a> {
    /// Parses one line and returns its structure.
    ///
    /// The line may or may not end with CR LF.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Command, Message};
    /// let privmsg = Message::parse(":alice PRIVMSG #rust :borrowck says no\r\n").unwrap();
    ///
    /// assert_eq!(privmsg.prefix, Some("alice"));
    /// assert_eq!(privmsg.command, Command::PrivMsg);
    /// assert_eq!(privmsg.num_params, 1);
    /// assert_eq!(privmsg.params[0], "#rust");
    /// assert_eq!(privmsg.trailing, Some("borrowck says no"));
    /// ```
    ///
    /// Lines with an unknown verb are rejected:
    ///
    /// ```rust
    /// # use chatrelay_tokens::{Message, ParseError};
    /// let unknown = Message::parse("WHOIS alice\r\n");
    ///
    /// assert_eq!(unknown.unwrap_err(), ParseError::UnknownVerb("WHOIS"));
    /// ```
    pub fn parse(s: &'a str) -> Result<Message<'a>, ParseError<'a>> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if MESSAGE_LENGTH < s.len() {
            return Err(ParseError::TooLong);
        }

        let buf = s.strip_suffix("\r\n").unwrap_or(s);
        if buf.contains('\n') {
            return Err(ParseError::BadTerminator);
        }
        if buf.is_empty() {
            return Err(ParseError::Empty);
        }

        let (prefix, rest) = parse_prefix(buf)?;
        let (verb, mut buf) = split_word(rest);
        if verb.is_empty() {
            return Err(ParseError::EmptyVerb);
        }
        let command = Command::parse(verb).ok_or(ParseError::UnknownVerb(verb))?;

        let mut params = [""; PARAMS_LENGTH];
        let mut num_params = 0;
        let mut trailing = None;
        loop {
            buf = buf.trim_start_matches(' ');
            if buf.is_empty() {
                break;
            }
            if let Some(rest) = buf.strip_prefix(':') {
                trailing = Some(rest);
                break;
            }
            let (word, rest) = split_word(buf);
            if num_params < PARAMS_LENGTH - 1 {
                params[num_params] = word;
                num_params += 1;
            }
            buf = rest;
        }

        Ok(Message {
            prefix,
            command,
            num_params,
            params,
            trailing,
        })
    }

    /// The number of arguments, that is middle parameters plus the trailing segment if any.
    pub fn num_args(&self) -> usize {
        self.num_params + self.trailing.is_some() as usize
    }

    /// Returns the argument at index `i`, counting the trailing segment as the last argument.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::Message;
    /// let nick = Message::parse("NICK :alice").unwrap();
    ///
    /// assert_eq!(nick.arg(0), Some("alice"));
    /// assert_eq!(nick.arg(1), None);
    /// ```
    pub fn arg(&self, i: usize) -> Option<&'a str> {
        if i < self.num_params {
            Some(self.params[i])
        } else if i == self.num_params {
            self.trailing
        } else {
            None
        }
    }

    /// Returns the arguments as a fixed-size array, padded with empty strings.
    pub fn args(&self) -> [&'a str; PARAMS_LENGTH] {
        let mut args = self.params;
        if let Some(trailing) = self.trailing {
            args[self.num_params] = trailing;
        }
        args
    }

    /// Returns true if the message has enough arguments for its command.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use chatrelay_tokens::Message;
    /// let join = Message::parse("JOIN :#rust").unwrap();
    /// assert_eq!(join.has_enough_params(), true);
    ///
    /// let join = Message::parse("JOIN").unwrap();
    /// assert_eq!(join.has_enough_params(), false);
    /// ```
    pub fn has_enough_params(&self) -> bool {
        self.command.required_params() <= self.num_args()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_msg;

    #[test]
    fn test_parse_simple() {
        let msg = Message::parse("NICK alice\r\n").unwrap();
        assert_msg(&msg, None, Command::Nick, &["alice"]);
        assert_eq!(msg.trailing, None);

        let msg = Message::parse("NICK alice").unwrap();
        assert_msg(&msg, None, Command::Nick, &["alice"]);
    }

    #[test]
    fn test_parse_trailing() {
        let msg = Message::parse("USER alice 0 * :Alice Smith\r\n").unwrap();
        assert_eq!(msg.num_params, 3);
        assert_eq!(&msg.params[..3], &["alice", "0", "*"]);
        assert_eq!(msg.trailing, Some("Alice Smith"));

        let msg = Message::parse("PRIVMSG #test :\r\n").unwrap();
        assert_eq!(msg.num_params, 1);
        assert_eq!(msg.trailing, Some(""));
        assert_eq!(msg.num_args(), 2);

        let msg = Message::parse("TOPIC #test :a :colon  inside").unwrap();
        assert_eq!(msg.trailing, Some("a :colon  inside"));
    }

    #[test]
    fn test_parse_prefix() {
        let msg = Message::parse(":server.com NOTICE * :Test message\r\n").unwrap();
        assert_msg(&msg, Some("server.com"), Command::Notice, &["*", "Test message"]);

        assert_eq!(Message::parse(":server.com").unwrap_err(), ParseError::MalformedPrefix);
        assert_eq!(Message::parse(":server.com  NICK a").unwrap_err(), ParseError::EmptyVerb);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Message::parse("").unwrap_err(), ParseError::Empty);
        assert_eq!(Message::parse("\r\n").unwrap_err(), ParseError::Empty);
        assert_eq!(Message::parse(" NICK a").unwrap_err(), ParseError::EmptyVerb);
        assert_eq!(Message::parse("INVALIDCMD test\r\n").unwrap_err(),
                   ParseError::UnknownVerb("INVALIDCMD"));
        assert_eq!(Message::parse("NICK alice\n").unwrap_err(), ParseError::BadTerminator);
        assert_eq!(Message::parse("NICK a\nNICK b\r\n").unwrap_err(), ParseError::BadTerminator);

        let long = format!("PRIVMSG #c :{}\r\n", "a".repeat(MESSAGE_LENGTH));
        assert_eq!(Message::parse(&long).unwrap_err(), ParseError::TooLong);
    }

    #[test]
    fn test_parse_longest_line() {
        let head = "PRIVMSG #c :";
        let text = "a".repeat(MESSAGE_LENGTH - head.len() - 2);
        let line = format!("{}{}\r\n", head, text);
        assert_eq!(line.len(), MESSAGE_LENGTH);

        let msg = Message::parse(&line).unwrap();
        assert_eq!(msg.trailing, Some(text.as_str()));
    }

    #[test]
    fn test_parse_extra_spaces() {
        let msg = Message::parse("JOIN   #a,#b    key\r\n").unwrap();
        assert_msg(&msg, None, Command::Join, &["#a,#b", "key"]);
    }

    #[test]
    fn test_too_many_params() {
        let msg = Message::parse("MODE a b c d e f g h i j k l m n o p q :last").unwrap();
        assert_eq!(msg.num_params, PARAMS_LENGTH - 1);
        assert_eq!(msg.params[PARAMS_LENGTH - 2], "n");
        assert_eq!(msg.trailing, Some("last"));
        assert_eq!(msg.args()[PARAMS_LENGTH - 1], "last");
    }

    #[test]
    fn test_args() {
        let msg = Message::parse("KICK #c bob :go away").unwrap();
        let args = msg.args();
        assert_eq!(&args[..4], &["#c", "bob", "go away", ""]);
        assert_eq!(msg.arg(2), Some("go away"));
        assert_eq!(msg.arg(3), None);

        let msg = Message::parse("TOPIC #c").unwrap();
        assert_eq!(msg.arg(1), None);
    }
} // mod tests
