//! The `client` module defines how the broker remembers a registered peer.
//!
//! It provides `ClientRecord`, holding the peer's transport address, its
//! declared role and the display id handed out at registration.

pub mod record;
pub use record::{ClientRecord, generate_client_id};
