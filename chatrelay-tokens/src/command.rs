use std::fmt;

macro_rules! commands {
    ( $( $cmd:ident $cmd_str:literal $n:literal )* ) => {
        /// The list of recognized verbs.
        ///
        /// Numeric replies and server-only verbs (like `ERROR`) are carried by the `Reply`
        /// variant, so that `Buffer` can build both kinds of messages with the same API.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Command {
            $( $cmd, )*
            Reply(&'static str),
        }

        impl Command {
            /// From a given verb, returns the corresponding command, or `None` if the verb is not
            /// recognized.
            ///
            /// It ignores the case of its argument.
            ///
            /// # Example
            ///
            /// ```rust
            /// # use chatrelay_tokens::Command;
            /// assert_eq!(Command::parse("join"), Some(Command::Join));
            /// assert_eq!(Command::parse("JOIN"), Some(Command::Join));
            /// assert_eq!(Command::parse("CAP"), None);
            /// ```
            pub fn parse(s: &str) -> Option<Self> {
                $( if s.eq_ignore_ascii_case($cmd_str) {
                    Some(Command::$cmd)
                } else )* {
                    None
                }
            }

            /// Returns the number of arguments (middle parameters and trailing segment) the
            /// command needs before its handler is called.
            ///
            /// Handlers that answer missing arguments with a dedicated reply (NICK, PRIVMSG,
            /// USER...) declare zero here and check by themselves.
            pub fn required_params(&self) -> usize {
                match self {
                $(
                    Command::$cmd => $n,
                )*
                    Command::Reply(_) => 0,
                }
            }

            /// Returns the canonical (upper-case) verb.
            ///
            /// # Example
            ///
            /// ```rust
            /// # use chatrelay_tokens::Command;
            /// let quit = Command::parse("Quit").unwrap();
            ///
            /// assert_eq!(quit.as_str(), "QUIT");
            /// ```
            pub fn as_str(&self) -> &'static str {
                match self {
                $(
                    Command::$cmd => $cmd_str,
                )*
                    Command::Reply(s) => s,
                }
            }
        }

        impl From<&'static str> for Command {
            /// `&'static str`s are converted to the `Command::Reply` variant.
            fn from(reply: &'static str) -> Self {
                Command::Reply(reply)
            }
        }

        impl fmt::Display for Command {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }
    }
}

commands! {
//  Ident.   String     Minimum # of args
    Invite   "INVITE"   2
    Join     "JOIN"     1
    Kick     "KICK"     2
    Mode     "MODE"     1
    Nick     "NICK"     0
    Notice   "NOTICE"   0
    Part     "PART"     1
    Pass     "PASS"     1
    Ping     "PING"     1
    Pong     "PONG"     0
    PrivMsg  "PRIVMSG"  0
    Quit     "QUIT"     0
    Topic    "TOPIC"    1
    User     "USER"     0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Command::parse("PrivMsg"), Some(Command::PrivMsg));
        assert_eq!(Command::parse("notice"), Some(Command::Notice));
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("WHOIS"), None);
    }

    #[test]
    fn test_reply_display() {
        let reply = Command::from("001");
        assert_eq!(reply.to_string(), "001");
        assert_eq!(Command::Topic.to_string(), "TOPIC");
    }
}
