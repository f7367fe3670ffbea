//! Configuration parsing and structures.
//!
//! See `doc/chatrelay.conf` for an explanation of each setting.

use std::{fmt, fs, io, net, path};
use std::str::FromStr;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Format(scfg::ParseError),
    Invalid(&'static str, String),
}

impl From<io::Error> for Error {
    fn from(val: io::Error) -> Self { Self::Io(val) }
}

impl From<scfg::ParseError> for Error {
    fn from(val: scfg::ParseError) -> Self { Self::Format(val) }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{}", err),
            Self::Format(err) => write!(f, "{}", err),
            Self::Invalid(directive, msg) => write!(f, "'{}': {}", directive, msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Settings for `State`.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    /// Prefix of numeric replies.
    pub domain: String,

    /// The shared server password.  When `None`, clients don't need to send PASS.
    pub password: Option<String>,

    pub nicklen: usize,
    pub channellen: usize,

    /// How many channels a client can be in at the same time.  0 means no limit.
    pub max_channels: usize,

    /// How many targets a PRIVMSG or NOTICE can have.
    pub max_targets: usize,
}

/// The whole configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bindings: Vec<net::SocketAddr>,
    pub state: State,
}

impl State {
    pub fn sample() -> Self {
        Self {
            domain: "server".to_owned(),
            password: None,
            nicklen: 9,
            channellen: 50,
            max_channels: 10,
            max_targets: 10,
        }
    }
}

impl Config {
    pub fn sample() -> Self {
        Self {
            bindings: vec![net::SocketAddr::from(([0, 0, 0, 0], 6667))],
            state: State::sample(),
        }
    }

    /// The configuration used when the server is started with a port and a password instead of
    /// a configuration file.
    pub fn with_port(port: u16, password: String) -> Self {
        let mut res = Self::sample();
        res.bindings = vec![net::SocketAddr::from(([0, 0, 0, 0], port))];
        res.state.password = Some(password);
        res
    }

    /// Reads the configuration file at the given path.
    pub fn from_file<P>(path: P) -> Result<Self>
        where P: AsRef<path::Path>
    {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parses the contents of a configuration file.
    ///
    /// Settings that are absent keep the value they have in `Config::sample`.
    pub fn parse(contents: &str) -> Result<Self> {
        let doc: scfg::Scfg = contents.parse()?;
        let mut res = Self::sample();

        if let Some(listen) = doc.get("listen") {
            let bindings = listen.params().iter()
                .map(|addr| addr.parse().map_err(|_| {
                    Error::Invalid("listen", format!("{:?} is not an address:port pair", addr))
                }))
                .collect::<Result<Vec<_>>>()?;
            if bindings.is_empty() {
                return Err(Error::Invalid("listen", "expected at least one address".to_owned()));
            }
            res.bindings = bindings;
        }

        if let Some(domain) = unique_setting::<String>(&doc, "domain")? {
            res.state.domain = domain;
        }
        res.state.password = unique_setting(&doc, "password")?;
        if let Some(nicklen) = unique_setting(&doc, "nicklen")? {
            res.state.nicklen = nicklen;
        }
        if let Some(channellen) = unique_setting(&doc, "channellen")? {
            res.state.channellen = channellen;
        }
        if let Some(max_channels) = unique_setting(&doc, "max_channels")? {
            res.state.max_channels = max_channels;
        }
        if let Some(max_targets) = unique_setting(&doc, "max_targets")? {
            res.state.max_targets = max_targets;
        }

        res.validate()?;
        Ok(res)
    }

    fn validate(&self) -> Result<()> {
        let domain = &self.state.domain;
        if domain.is_empty() || domain.contains(|c: char| c.is_whitespace() || c == ':') {
            return Err(Error::Invalid("domain", format!("{:?} is not a server name", domain)));
        }
        if self.state.nicklen == 0 {
            return Err(Error::Invalid("nicklen", "must be positive".to_owned()));
        }
        if self.state.channellen < 2 {
            return Err(Error::Invalid("channellen", "must be at least 2".to_owned()));
        }
        if self.state.max_targets == 0 {
            return Err(Error::Invalid("max_targets", "must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Returns the value of a directive that takes exactly one parameter, if it is present.
fn unique_setting<T>(doc: &scfg::Scfg, name: &'static str) -> Result<Option<T>>
    where T: FromStr
{
    let directive = match doc.get(name) {
        Some(directive) => directive,
        None => return Ok(None),
    };
    match directive.params() {
        [value] => value.parse().map(Some).map_err(|_| {
            Error::Invalid(name, format!("cannot parse {:?}", value))
        }),
        _ => Err(Error::Invalid(name, "expected exactly one value".to_owned())),
    }
}
