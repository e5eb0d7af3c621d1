use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use super::router::{SessionId, TransportKind};

/// # Console
///
/// Per-connection state for one possibly unauthenticated principal. The
/// connection task owns its console and hands it to the engine for every
/// input line, so nothing here needs locking.
///
/// Authentication is tracked by `user`: `None` until a login succeeds. The
/// login cooldown is a per-session deadline armed by failed login or
/// recovery attempts.
#[derive(Debug)]
pub struct Console {
    id: SessionId,
    transport: TransportKind,
    user: Option<String>,
    login_cooldown: Option<Instant>,
    outbox: UnboundedSender<String>,
}

impl Console {
    pub fn new(id: SessionId, transport: TransportKind, outbox: UnboundedSender<String>) -> Self {
        Self {
            id,
            transport,
            user: None,
            login_cooldown: None,
            outbox,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Lowercase username of the authenticated user.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn set_user(&mut self, user: Option<&str>) {
        self.user = user.map(str::to_ascii_lowercase);
    }

    /// Queue one line for this session's transport.
    pub fn send(&self, text: impl Into<String>) {
        if self.outbox.send(text.into()).is_err() {
            debug!("Console {} output dropped; transport closed", self.id);
        }
    }

    pub fn arm_cooldown(&mut self, duration: Duration) {
        self.login_cooldown = Some(Instant::now() + duration);
    }

    /// Whether a failed attempt is still cooling down. Clears an expired deadline.
    pub fn cooling_down(&mut self) -> bool {
        match self.login_cooldown {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                self.login_cooldown = None;
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use uuid::Uuid;

    #[test]
    fn cooldown_expires() {
        let (tx, _rx) = unbounded_channel();
        let mut console = Console::new(Uuid::new_v4(), TransportKind::Local, tx);
        assert!(!console.cooling_down());
        console.arm_cooldown(Duration::from_secs(60));
        assert!(console.cooling_down());
        console.arm_cooldown(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!console.cooling_down());
    }

    #[test]
    fn send_reaches_outbox_and_user_is_lowercased() {
        let (tx, mut rx) = unbounded_channel();
        let mut console = Console::new(Uuid::new_v4(), TransportKind::Local, tx);
        console.set_user(Some("Ann"));
        assert_eq!(console.user(), Some("ann"));
        console.send("hi");
        assert_eq!(rx.try_recv().unwrap(), "hi");
    }
}
