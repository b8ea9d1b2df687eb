//! The `transport` module is responsible for moving datagrams between the
//! broker and its clients over UDP.
//!
//! It wraps the socket behind a small send/receive handle and implements
//! the broker's serving loop, which hands each datagram to the broker and
//! sends whatever the broker queues in return.

pub mod udp;

pub use udp::{BrokerServer, MAX_DATAGRAM, UdpTransport, start_broker_server};
