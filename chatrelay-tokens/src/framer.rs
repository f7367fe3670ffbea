//! Line framing of the incoming byte stream.

use crate::MESSAGE_LENGTH;
use std::fmt;

/// Reasons why a line is discarded by the `Framer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The line is longer than `MESSAGE_LENGTH` bytes, terminator included.
    TooLong,

    /// The line ends with a line feed that is not preceded by a carriage return.
    BareLineFeed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong => write!(f, "line longer than {} bytes", MESSAGE_LENGTH),
            Self::BareLineFeed => write!(f, "line terminated by a bare line feed"),
        }
    }
}

impl std::error::Error for Error {}

/// Accumulates the bytes of a connection and cuts them into lines.
///
/// Lines are returned with their CR LF terminator, in arrival order.  An incomplete line stays in
/// the buffer until the rest of it is appended.
///
/// # Example
///
/// ```rust
/// # use chatrelay_tokens::Framer;
/// let mut framer = Framer::new();
///
/// framer.append(b"NICK alice\r\nUSER al");
/// assert_eq!(framer.extract_lines(), vec![Ok("NICK alice\r\n".to_owned())]);
///
/// framer.append(b" 0 * :Alice\r\n");
/// assert_eq!(framer.extract_lines(), vec![Ok("USER al 0 * :Alice\r\n".to_owned())]);
/// ```
#[derive(Debug, Default)]
pub struct Framer {
    buf: Vec<u8>,

    /// Set when the beginning of the current line has been thrown away because it was too long.
    /// The rest of the line is dropped up to the next line feed.
    discarding: bool,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw input to the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The number of bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Removes the next complete line from the buffer.
    ///
    /// Returns `None` when no complete line is available.  Empty lines are skipped.  Lines that
    /// are not valid UTF-8 are converted lossily.
    pub fn next_line(&mut self) -> Option<Result<String, Error>> {
        loop {
            let lf = match self.buf.iter().position(|&b| b == b'\n') {
                Some(lf) => lf,
                None => {
                    if MESSAGE_LENGTH <= self.buf.len() {
                        // Whatever comes next, this line won't fit.
                        self.buf.clear();
                        self.discarding = true;
                    }
                    return None;
                }
            };

            let line: Vec<u8> = self.buf.drain(..=lf).collect();
            if self.discarding {
                self.discarding = false;
                return Some(Err(Error::TooLong));
            }
            if MESSAGE_LENGTH < line.len() {
                return Some(Err(Error::TooLong));
            }
            if line.len() < 2 || line[line.len() - 2] != b'\r' {
                return Some(Err(Error::BareLineFeed));
            }
            if line.len() == 2 {
                continue;
            }
            return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
        }
    }

    /// Removes all complete lines from the buffer.
    ///
    /// Each element is either a line (terminator included) or the reason why a line has been
    /// discarded.
    pub fn extract_lines(&mut self) -> Vec<Result<String, Error>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(s: &str) -> Result<String, Error> {
        Ok(s.to_owned())
    }

    #[test]
    fn test_split_reads() {
        let mut once = Framer::new();
        once.append(b"A\r\nB\r\n");

        let mut twice = Framer::new();
        twice.append(b"A\r\nB\r");
        let mut lines = twice.extract_lines();
        twice.append(b"\n");
        lines.extend(twice.extract_lines());

        assert_eq!(lines, once.extract_lines());
        assert_eq!(lines, vec![ok("A\r\n"), ok("B\r\n")]);
        assert_eq!(twice.pending(), 0);
    }

    #[test]
    fn test_partial_line_is_kept() {
        let mut framer = Framer::new();
        framer.append(b"PING a\r\nPING");
        assert_eq!(framer.extract_lines(), vec![ok("PING a\r\n")]);
        assert_eq!(framer.pending(), 4);
        assert!(framer.extract_lines().is_empty());
        framer.append(b" b\r\n");
        assert_eq!(framer.extract_lines(), vec![ok("PING b\r\n")]);
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let mut framer = Framer::new();
        framer.append(b"\r\n\r\nPING a\r\n\r\n");
        assert_eq!(framer.extract_lines(), vec![ok("PING a\r\n")]);
    }

    #[test]
    fn test_bare_line_feed() {
        let mut framer = Framer::new();
        framer.append(b"NICK a\nNICK b\r\n\n");
        assert_eq!(framer.extract_lines(), vec![
            Err(Error::BareLineFeed),
            ok("NICK b\r\n"),
            Err(Error::BareLineFeed),
        ]);
    }

    #[test]
    fn test_line_length_limit() {
        let head = "PRIVMSG #c :";
        let fits = format!("{}{}\r\n", head, "a".repeat(MESSAGE_LENGTH - head.len() - 2));
        let too_long = format!("{}{}\r\n", head, "a".repeat(MESSAGE_LENGTH - head.len() - 1));

        let mut framer = Framer::new();
        framer.append(fits.as_bytes());
        framer.append(too_long.as_bytes());
        framer.append(b"PING a\r\n");
        assert_eq!(framer.extract_lines(), vec![
            Ok(fits),
            Err(Error::TooLong),
            ok("PING a\r\n"),
        ]);
    }

    #[test]
    fn test_unterminated_flood_is_not_buffered() {
        let mut framer = Framer::new();
        for _ in 0..10 {
            framer.append(&[b'a'; 300]);
            assert!(framer.extract_lines().is_empty());
            assert!(framer.pending() < MESSAGE_LENGTH);
        }
        framer.append(b"aaa\r\nPING a\r\n");
        assert_eq!(framer.extract_lines(), vec![Err(Error::TooLong), ok("PING a\r\n")]);
    }
} // mod tests
