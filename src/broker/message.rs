//! Outbound datagrams produced by the broker
//!
//! Handlers never touch the socket. Every reply or relayed frame is queued
//! as an `Outbound` on the broker's outbox; the transport drains the queue
//! and sends each datagram without waiting on the peer.

use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub addr: SocketAddr,
    pub bytes: Vec<u8>,
}

impl Outbound {
    pub fn new(addr: SocketAddr, bytes: Vec<u8>) -> Self {
        Self { addr, bytes }
    }
}
