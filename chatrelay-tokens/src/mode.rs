//! Mode string scanning.

use std::str;

/// User modes advertised in RPL_MYINFO.
pub const USER_MODES: &str = "o";

/// Channel modes advertised in RPL_MYINFO.
pub const CHAN_MODES: &str = "iklot";

/// Iterator over the letters of a mode string, with the value of the last `+` or `-`.
struct SimpleQuery<'a> {
    modes: str::Chars<'a>,
    value: bool,
}

impl<'a> SimpleQuery<'a> {
    pub fn new(modes: &'a str) -> Self {
        Self {
            modes: modes.chars(),
            value: true,
        }
    }
}

impl Iterator for SimpleQuery<'_> {
    type Item = (bool, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.modes.next()? {
                '+' => {
                    self.value = true;
                }
                '-' => {
                    self.value = false;
                }
                c => {
                    return Some((self.value, c));
                }
            }
        }
    }
}

/// `channel_query` related errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// One of the modes in the query is unknown.
    Unknown(char, bool),

    /// A mode is missing its required parameter.
    MissingParam(char, bool),
}

/// Alias to std's Result using this module's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Item of a channel mode query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelChange<'a> {
    InviteOnly(bool),
    TopicRestricted(bool),
    /// `+k` always has a key.  `-k` may carry one, which is only echoed back.
    Key(bool, Option<&'a str>),
    /// The unparsed value of `+l`, or `None` for `-l`.
    UserLimit(Option<&'a str>),
    ChangeOperator(bool, &'a str),
}

impl<'a> ChannelChange<'a> {
    /// Whether this change is enabling or disabling a mode.
    pub fn value(&self) -> bool {
        use ChannelChange::*;
        match self {
            InviteOnly(v) | TopicRestricted(v) | Key(v, _) | ChangeOperator(v, _) => *v,
            UserLimit(l) => l.is_some(),
        }
    }

    /// The letter of this mode change.
    pub fn symbol(&self) -> char {
        use ChannelChange::*;
        match self {
            InviteOnly(_) => 'i',
            TopicRestricted(_) => 't',
            Key(_, _) => 'k',
            UserLimit(_) => 'l',
            ChangeOperator(_, _) => 'o',
        }
    }

    /// The parameter of this mode change.
    pub fn param(&self) -> Option<&'a str> {
        use ChannelChange::*;
        match self {
            Key(_, p) | UserLimit(p) => *p,
            ChangeOperator(_, p) => Some(*p),
            _ => None,
        }
    }
}

/// An iterator over the changes of a MODE query.
///
/// Parameters are consumed from `params` as letters need them, so that an unknown letter or a
/// letter missing its parameter does not shift the parameters of the following letters.
///
/// # Example
///
/// ```rust
/// # use chatrelay_tokens::mode::{self, Error, ChannelChange};
/// let mut query = mode::channel_query("-olX+kti", &["alice", "secret"]);
///
/// assert_eq!(query.next(), Some(Ok(ChannelChange::ChangeOperator(false, "alice"))));
/// assert_eq!(query.next(), Some(Ok(ChannelChange::UserLimit(None))));
/// assert_eq!(query.next(), Some(Err(Error::Unknown('X', false))));
/// assert_eq!(query.next(), Some(Ok(ChannelChange::Key(true, Some("secret")))));
/// assert_eq!(query.next(), Some(Ok(ChannelChange::TopicRestricted(true))));
/// assert_eq!(query.next(), Some(Ok(ChannelChange::InviteOnly(true))));
/// assert_eq!(query.next(), None);
/// ```
pub fn channel_query<'a, I, S>(
    modes: &'a str,
    params: I,
) -> impl Iterator<Item = Result<ChannelChange<'a>>>
where
    I: IntoIterator<Item = &'a S> + 'a,
    S: AsRef<str> + 'a,
{
    let mut params = params
        .into_iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty());
    SimpleQuery::new(modes).map(move |(value, mode)| {
        use ChannelChange::*;
        match mode {
            'i' => Ok(InviteOnly(value)),
            't' => Ok(TopicRestricted(value)),
            'k' => {
                let param = params.next();
                if value && param.is_none() {
                    Err(Error::MissingParam('k', value))
                } else {
                    Ok(Key(value, param))
                }
            }
            'l' => {
                if value {
                    if let Some(param) = params.next() {
                        Ok(UserLimit(Some(param)))
                    } else {
                        Err(Error::MissingParam('l', value))
                    }
                } else {
                    Ok(UserLimit(None))
                }
            }
            'o' => {
                if let Some(param) = params.next() {
                    Ok(ChangeOperator(value, param))
                } else {
                    Err(Error::MissingParam('o', value))
                }
            }
            other => Err(Error::Unknown(other, value)),
        }
    })
}

#[allow(clippy::cognitive_complexity)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_query() {
        let mut q = SimpleQuery::new("+ab+C++D+-+E--fg+-h");
        assert_eq!(q.next(), Some((true, 'a')));
        assert_eq!(q.next(), Some((true, 'b')));
        assert_eq!(q.next(), Some((true, 'C')));
        assert_eq!(q.next(), Some((true, 'D')));
        assert_eq!(q.next(), Some((true, 'E')));
        assert_eq!(q.next(), Some((false, 'f')));
        assert_eq!(q.next(), Some((false, 'g')));
        assert_eq!(q.next(), Some((false, 'h')));
        assert_eq!(q.next(), None);

        let mut q = SimpleQuery::new("a");
        assert_eq!(q.next(), Some((true, 'a')));
        assert_eq!(q.next(), None);

        let mut q = SimpleQuery::new("+-");
        assert_eq!(q.next(), None);
    }

    #[test]
    fn test_chanmode_key() {
        let mut q = channel_query::<_, String>("+k", &[]);
        assert_eq!(q.next(), Some(Err(Error::MissingParam('k', true))));
        assert_eq!(q.next(), None);

        let mut q = channel_query("+k", &["beer"]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::Key(true, Some("beer")))));
        assert_eq!(q.next(), None);

        let mut q = channel_query::<_, String>("-k", &[]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::Key(false, None))));
        assert_eq!(q.next(), None);

        let mut q = channel_query("-k", &["beer"]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::Key(false, Some("beer")))));
        assert_eq!(q.next(), None);

        let mut q = channel_query("+ko", &["beer", "alice"]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::Key(true, Some("beer")))));
        assert_eq!(q.next(), Some(Ok(ChannelChange::ChangeOperator(true, "alice"))));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn test_chanmode_limit() {
        let mut q = channel_query("+kl", &["secret", "3"]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::Key(true, Some("secret")))));
        assert_eq!(q.next(), Some(Ok(ChannelChange::UserLimit(Some("3")))));
        assert_eq!(q.next(), None);

        let mut q = channel_query("-l+l", &["abc"]);
        assert_eq!(q.next(), Some(Ok(ChannelChange::UserLimit(None))));
        assert_eq!(q.next(), Some(Ok(ChannelChange::UserLimit(Some("abc")))));
        assert_eq!(q.next(), None);

        let mut q = channel_query::<_, String>("+l", &[]);
        assert_eq!(q.next(), Some(Err(Error::MissingParam('l', true))));
    }

    #[test]
    fn test_chanmode_unknown_does_not_consume() {
        let mut q = channel_query("+bo", &["alice"]);
        assert_eq!(q.next(), Some(Err(Error::Unknown('b', true))));
        assert_eq!(q.next(), Some(Ok(ChannelChange::ChangeOperator(true, "alice"))));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn test_change_accessors() {
        let change = ChannelChange::Key(false, Some("beer"));
        assert_eq!((change.value(), change.symbol(), change.param()), (false, 'k', Some("beer")));

        let change = ChannelChange::UserLimit(None);
        assert_eq!((change.value(), change.symbol(), change.param()), (false, 'l', None));
    }
} // mod tests
