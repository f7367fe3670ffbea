use chatrelay_tokens::MessageBuffer;
use std::fmt::Write as _;

//
// Network messages
//

pub const CLOSING_LINK: &str = "Closing link";

pub const CONNECTION_CLOSED: &str = "Connection closed";

pub const DEFAULT_KICK: &str = "You have been kicked";

pub const DEFAULT_PART: &str = "Leaving";

pub const DEFAULT_QUIT: &str = "Client quit";

pub const PART_ALL: &str = "Left all channels";

//
// Replies
//

pub const ALREADY_REGISTERED: &str = "You may not reregister";

pub const BAD_CHAN_KEY: &str = "Cannot join channel (+k)";

pub const BAD_CHAN_MASK: &str = "Bad Channel Mask";

pub const CANNOT_SEND_TO_CHAN: &str = "Cannot send to channel";

pub const CHAN_O_PRIVS_NEEDED: &str = "You're not channel operator";

pub const CHANNEL_IS_FULL: &str = "Cannot join channel (+l)";

pub const END_OF_NAMES: &str = "End of /NAMES list";

pub const ERRONEOUS_NICKNAME: &str = "Erroneous nickname";

pub const INVITE_ONLY_CHAN: &str = "Cannot join channel (+i)";

pub const NEED_MORE_PARAMS: &str = "Not enough parameters";

pub const NICKNAME_IN_USE: &str = "Nickname is already in use";

pub const NO_NICKNAME_GIVEN: &str = "No nickname given";

pub const NO_TEXT_TO_SEND: &str = "No text to send";

pub const NO_TOPIC: &str = "No topic is set";

pub const NO_SUCH_CHANNEL: &str = "No such channel";

pub const NO_SUCH_NICK: &str = "No such nick/channel";

pub const NOT_ON_CHANNEL: &str = "You're not on that channel";

pub const NOT_REGISTERED: &str = "You have not registered";

pub const NICK_FIRST: &str = "You must set a nickname first";

pub const PASSWORD_MISMATCH: &str = "Password incorrect";

pub const PASSWORD_REQUIRED: &str = "Password required";

pub const TOO_MANY_CHANNELS: &str = "You have joined too many channels";

pub const TOO_MANY_TARGETS: &str = "Too many recipients";

pub const UNKNOWN_MODE: &str = "is unknown mode char to me";

pub const USER_NOT_IN_CHANNEL: &str = "They aren't on that channel";

pub const USER_ON_CHANNEL: &str = "is already on channel";

pub fn no_recipient(mut msg: MessageBuffer<'_>, command: &str) {
    let _ = write!(msg.raw_trailing_param(), "No recipient given ({})", command);
}

//
// Welcome messages
//

pub fn welcome(mut msg: MessageBuffer<'_>, full_name: &str) {
    let _ = write!(msg.raw_trailing_param(), "Welcome to the IRC Network {}", full_name);
}

pub fn your_host(mut msg: MessageBuffer<'_>, domain: &str, version: &str) {
    let _ = write!(msg.raw_trailing_param(), "Your host is {}, running version {}", domain, version);
}

pub fn created(mut msg: MessageBuffer<'_>, since: &str) {
    let _ = write!(msg.raw_trailing_param(), "This server was created {}", since);
}
