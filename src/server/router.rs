//! Live session registry and message fan-out.
//!
//! Every connected session registers an outbound channel here. Delivery is
//! fire-and-forget: a closed channel is logged and skipped so one dead
//! recipient never stops a broadcast to the rest.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::world::{RoomId, UserRecord, World};

pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Repl,
    /// In-process session (tests, tooling).
    Local,
}

#[derive(Debug)]
struct SessionEntry {
    transport: TransportKind,
    user: Option<String>,
    outbox: UnboundedSender<String>,
}

#[derive(Debug, Default)]
pub struct Router {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, transport: TransportKind, outbox: UnboundedSender<String>) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions().insert(
            id,
            SessionEntry {
                transport,
                user: None,
                outbox,
            },
        );
        debug!("Registered {:?} session {}", transport, id);
        id
    }

    pub fn unregister(&self, id: SessionId) {
        if self.sessions().remove(&id).is_some() {
            debug!("Unregistered session {}", id);
        }
    }

    /// Record which user (if any) a session is authenticated as.
    pub fn bind_user(&self, id: SessionId, user: Option<&str>) {
        if let Some(entry) = self.sessions().get_mut(&id) {
            entry.user = user.map(str::to_ascii_lowercase);
        }
    }

    pub fn session_of(&self, user: &str) -> Option<SessionId> {
        self.sessions()
            .iter()
            .find(|(_, e)| {
                e.user
                    .as_deref()
                    .map(|u| u.eq_ignore_ascii_case(user))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
    }

    pub fn transport_of(&self, id: SessionId) -> Option<TransportKind> {
        self.sessions().get(&id).map(|e| e.transport)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    fn send(id: &SessionId, entry: &SessionEntry, text: &str) -> bool {
        match entry.outbox.send(text.to_string()) {
            Ok(()) => true,
            Err(_) => {
                debug!("Dropping message for closed session {}", id);
                false
            }
        }
    }

    pub fn deliver(&self, id: SessionId, text: &str) -> bool {
        let sessions = self.sessions();
        match sessions.get(&id) {
            Some(entry) => Self::send(&id, entry, text),
            None => false,
        }
    }

    pub fn deliver_to_user(&self, user: &str, text: &str) -> bool {
        let sessions = self.sessions();
        sessions
            .iter()
            .filter(|(_, e)| {
                e.user
                    .as_deref()
                    .map(|u| u.eq_ignore_ascii_case(user))
                    .unwrap_or(false)
            })
            .fold(false, |sent, (id, e)| Self::send(id, e, text) || sent)
    }

    /// Send to every live session, authenticated or not. Returns the number of deliveries.
    pub fn broadcast_all(&self, text: &str, exclude: Option<&str>) -> usize {
        let sessions = self.sessions();
        let mut delivered = 0;
        for (id, entry) in sessions.iter() {
            if is_excluded(entry.user.as_deref(), exclude) {
                continue;
            }
            if Self::send(id, entry, text) {
                delivered += 1;
            }
        }
        trace!("broadcast_all reached {} sessions", delivered);
        delivered
    }

    /// Send to every authenticated session whose user currently stands in `room`.
    pub fn broadcast_room(
        &self,
        world: &World,
        room: RoomId,
        text: &str,
        exclude: Option<&str>,
    ) -> usize {
        self.broadcast_where(world, text, |user| {
            user.room == room && !is_excluded(Some(&user.name), exclude)
        })
    }

    /// Send to every authenticated session whose user satisfies `filter`.
    pub fn broadcast_where<F>(&self, world: &World, text: &str, filter: F) -> usize
    where
        F: Fn(&UserRecord) -> bool,
    {
        let sessions = self.sessions();
        let mut delivered = 0;
        for (id, entry) in sessions.iter() {
            let Some(name) = entry.user.as_deref() else {
                continue;
            };
            let Some(user) = world.user(name) else {
                continue;
            };
            if filter(user) && Self::send(id, entry, text) {
                delivered += 1;
            }
        }
        delivered
    }
}

fn is_excluded(user: Option<&str>, exclude: Option<&str>) -> bool {
    match (user, exclude) {
        (Some(u), Some(x)) => u.eq_ignore_ascii_case(x),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn broadcast_all_skips_excluded_and_closed() {
        let router = Router::new();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, rx_b) = unbounded_channel();
        let (tx_c, mut rx_c) = unbounded_channel();
        let a = router.register(TransportKind::Local, tx_a);
        let b = router.register(TransportKind::Local, tx_b);
        router.register(TransportKind::Local, tx_c);
        router.bind_user(a, Some("Ann"));
        router.bind_user(b, Some("bob"));
        drop(rx_b);

        let delivered = router.broadcast_all("hello", Some("ANN"));
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_c.try_recv().unwrap(), "hello");
    }

    #[test]
    fn bind_and_lookup_sessions() {
        let router = Router::new();
        let (tx, mut rx) = unbounded_channel();
        let id = router.register(TransportKind::Tcp, tx);
        assert_eq!(router.session_of("ann"), None);
        router.bind_user(id, Some("Ann"));
        assert_eq!(router.session_of("ANN"), Some(id));
        assert!(router.deliver_to_user("ann", "psst"));
        assert_eq!(rx.try_recv().unwrap(), "psst");
        router.unregister(id);
        assert!(router.is_empty());
        assert!(!router.deliver(id, "gone"));
    }
}
