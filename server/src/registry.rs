//! Session registry: binds live connections to agent identities and is the
//! fan-out target for broadcasts.

use log::info;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Server-side record of one admitted connection.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub agent_id: u32,
    /// Outbound queue drained by the connection's writer task.
    outbound: UnboundedSender<String>,
    pub created_at: Instant,
}

impl Session {
    /// Best-effort send: false means the connection is gone and the session
    /// should be pruned.
    pub fn send(&self, payload: &str) -> bool {
        self.outbound.send(payload.to_string()).is_ok()
    }
}

/// All admitted sessions, keyed by session id. Iteration order is
/// unspecified but stable within a tick.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
    next_session_id: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Admits a connection that completed its handshake.
    pub fn admit(&mut self, agent_id: u32, outbound: UnboundedSender<String>) -> u32 {
        let session_id = self.next_session_id;
        self.next_session_id += 1;
        self.sessions.insert(
            session_id,
            Session {
                id: session_id,
                agent_id,
                outbound,
                created_at: Instant::now(),
            },
        );
        info!("Session {} admitted for agent {}", session_id, agent_id);
        session_id
    }

    pub fn remove(&mut self, session_id: u32) -> Option<Session> {
        let session = self.sessions.remove(&session_id);
        if session.is_some() {
            info!("Session {} removed", session_id);
        }
        session
    }

    pub fn find_by_agent(&self, agent_id: u32) -> Option<u32> {
        self.sessions
            .values()
            .find(|s| s.agent_id == agent_id)
            .map(|s| s.id)
    }

    pub fn active_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
