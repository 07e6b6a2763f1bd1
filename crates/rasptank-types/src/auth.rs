//! Plain-text credential handshake.
//!
//! The first frames of a session are not JSON: the client sends
//! `"<username>:<password>"` and the server answers with one of these banners.

/// Sent once when the credential pair matches.
pub const ACCEPTED_BANNER: &str =
    "congratulation, you have connect with server\r\nnow, you can do something else";

/// Sent for every rejected credential attempt. The connection stays open.
pub const REJECTED_BANNER: &str = "sorry, the username or password is wrong, please submit again";

/// A `username:password` pair as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Split a handshake line on the first `:`.
    ///
    /// A line without a separator parses as empty username and password,
    /// which never matches a configured pair.
    pub fn parse(line: &str) -> Self {
        match line.split_once(':') {
            Some((username, password)) => Self::new(username, password),
            None => Self::new("", ""),
        }
    }

    pub fn matches(&self, other: &Credentials) -> bool {
        self.username == other.username && self.password == other.password
    }
}
