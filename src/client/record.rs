use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::protocol::Role;

/// Symbols client ids are drawn from.
const ID_SYMBOLS: [&str; 9] = ["😀", "🎉", "❤️", "🚀", "🌙", "🍕", "🐱", "📚", "🔥"];

const ID_LEN: usize = 3;

/// A registered client as the broker sees it.
///
/// Records are keyed by transport address. The `id` is a short display
/// handle: it is neither unique across clients nor hard to guess.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: String,
    pub addr: SocketAddr,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn new(id: String, addr: SocketAddr, role: Role) -> Self {
        Self {
            id,
            addr,
            role,
            registered_at: Utc::now(),
        }
    }

    pub fn is_producer(&self) -> bool {
        self.role == Role::Producer
    }

    pub fn is_consumer(&self) -> bool {
        self.role == Role::Consumer
    }
}

pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_SYMBOLS[rng.gen_range(0..ID_SYMBOLS.len())])
        .collect()
}
