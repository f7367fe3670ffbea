//! The list of numeric replies.
//!
//! Each reply must have the client's nick (or `*`) as first parameter.
//!
//! Sources:
//!
//! - <https://tools.ietf.org/html/rfc2812.html#section-5>
//! - <https://modern.ircdocs.horse/#numerics>

pub const WELCOME: &str   = "001";  // :Welcome to the IRC Network <nick>!<user>@<host>
pub const YOURHOST: &str  = "002";  // :Your host is <servername>, running version <ver>
pub const CREATED: &str   = "003";  // :This server was created <date>
pub const MYINFO: &str    = "004";  // <servername> <version> <umodes> <chan modes>

pub const CHANNELMODEIS: &str = "324";  // <channel> <modes> <mode params>
pub const NOTOPIC: &str       = "331";  // <channel> :No topic is set
pub const TOPIC: &str         = "332";  // <channel> :<topic>
pub const INVITING: &str      = "341";  // <nick> <channel>
pub const NAMREPLY: &str      = "353";  // <=/*/@> <channel> :1*(@/ /+user)
pub const ENDOFNAMES: &str    = "366";  // <channel> :End of /NAMES list

pub const ERR_NOSUCHNICK: &str       = "401";  // <nick> :No such nick/channel
pub const ERR_NOSUCHCHANNEL: &str    = "403";  // <channel> :No such channel
pub const ERR_CANNOTSENDTOCHAN: &str = "404";  // <channel> :Cannot send to channel
pub const ERR_TOOMANYCHANNELS: &str  = "405";  // <channel> :You have joined too many channels
pub const ERR_TOOMANYTARGETS: &str   = "407";  // <target> :Too many recipients
pub const ERR_NORECIPIENT: &str      = "411";  // :No recipient given (<command>)
pub const ERR_NOTEXTTOSEND: &str     = "412";  // :No text to send
pub const ERR_NONICKNAMEGIVEN: &str  = "431";  // :No nickname given
pub const ERR_ERRONEUSNICKNAME: &str = "432";  // <nick> :Erroneous nickname
pub const ERR_NICKNAMEINUSE: &str    = "433";  // <nick> :Nickname is already in use
pub const ERR_USERNOTINCHANNEL: &str = "441";  // <nick> <channel> :They aren't on that channel
pub const ERR_NOTONCHANNEL: &str     = "442";  // <channel> :You're not on that channel
pub const ERR_USERONCHANNEL: &str    = "443";  // <user> <channel> :is already on channel
pub const ERR_NOTREGISTERED: &str    = "451";  // :You have not registered
pub const ERR_NEEDMOREPARAMS: &str   = "461";  // <command> :Not enough parameters
pub const ERR_ALREADYREGISTRED: &str = "462";  // :You may not reregister
pub const ERR_PASSWDMISMATCH: &str   = "464";  // :Password incorrect
pub const ERR_CHANNELISFULL: &str    = "471";  // <channel> :Cannot join channel (+l)
pub const ERR_UNKNOWNMODE: &str      = "472";  // <char> :is unknown mode char to me
pub const ERR_INVITEONLYCHAN: &str   = "473";  // <channel> :Cannot join channel (+i)
pub const ERR_BADCHANNELKEY: &str    = "475";  // <channel> :Cannot join channel (+k)
pub const ERR_BADCHANMASK: &str      = "476";  // <channel> :Bad Channel Mask
pub const ERR_CHANOPRIVSNEEDED: &str = "482";  // <channel> :You're not channel operator
