use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::mpsc;

use crate::world::LivingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the player to type a name.
    AwaitingName,
    Playing(LivingId),
}

/// # Connection Session
///
/// One per TCP connection. A session starts in `AwaitingName`; the first valid name loads
/// or creates the player and moves it to `Playing`. Output for the session's living is pushed
/// to `tx` and written to the socket by the connection's writer task.
#[derive(Debug)]
pub struct Session {
    pub id: ConnId,
    pub peer: String,
    pub state: SessionState,
    /// When the player record was first created, carried into every save.
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    tx: mpsc::UnboundedSender<String>,
}

impl Session {
    pub fn new(id: ConnId, peer: String, tx: mpsc::UnboundedSender<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            peer,
            state: SessionState::AwaitingName,
            created_at: now,
            last_activity: now,
            tx,
        }
    }

    pub fn living(&self) -> Option<LivingId> {
        match self.state {
            SessionState::Playing(id) => Some(id),
            _ => None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Queue a line for the socket. A closed writer means the peer is gone.
    pub fn send(&self, text: &str) -> bool {
        let mut line = text.replace('\n', "\r\n");
        line.push_str("\r\n");
        if self.tx.send(line).is_err() {
            debug!("{} writer closed", self.id);
            return false;
        }
        true
    }

    /// Like `send` but without a trailing newline, for prompts.
    pub fn send_prompt(&self, text: &str) -> bool {
        self.tx.send(text.to_string()).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    TooShort,
    TooLong,
    InvalidCharacters,
}

impl std::fmt::Display for NameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NameError::TooShort => "Names need at least 3 letters.",
            NameError::TooLong => "Names may have at most 16 letters.",
            NameError::InvalidCharacters => "Names may only contain letters.",
        };
        f.write_str(text)
    }
}

/// Check a login name and return it capitalised (`aLiCe` -> `Alice`).
pub fn validate_player_name(input: &str) -> Result<String, NameError> {
    let name = input.trim();
    if name.chars().count() < 3 {
        return Err(NameError::TooShort);
    }
    if name.chars().count() > 16 {
        return Err(NameError::TooLong);
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(NameError::InvalidCharacters);
    }
    let lower = name.to_ascii_lowercase();
    Ok(crate::world::living::capitalize(&lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalised() {
        assert_eq!(validate_player_name("  aLiCe "), Ok("Alice".to_string()));
    }

    #[test]
    fn bad_names_are_rejected() {
        assert_eq!(validate_player_name("al"), Err(NameError::TooShort));
        assert_eq!(validate_player_name("abcdefghijklmnopq"), Err(NameError::TooLong));
        assert_eq!(validate_player_name("bob1"), Err(NameError::InvalidCharacters));
    }

    #[test]
    fn send_converts_newlines_for_telnet() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new(ConnId(1), "test".into(), tx);
        assert!(session.send("a\nb"));
        assert_eq!(rx.try_recv().ok(), Some("a\r\nb\r\n".to_string()));
        assert_eq!(session.living(), None);
    }
}
