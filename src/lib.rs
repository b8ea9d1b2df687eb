//! # popsub-udp
//!
//! `popsub-udp` is an in-memory publish/subscribe overlay over UDP. A single
//! broker keeps a registry of clients and topics; producers announce topics
//! and publish payloads of any size, which are split into datagram-sized
//! fragments and rebuilt by every subscribed consumer.
//!
//! ## Core Modules
//!
//! - `protocol`: frame types and their binary encoding.
//! - `segment`: chunking, gzip compression and fragment reassembly.
//! - `broker`: the broker state machine, its topic and client registries.
//! - `client`: the broker's record of a registered client.
//! - `actor`: producer and consumer sessions that talk to a broker.
//! - `transport`: the UDP socket wrapper and the broker's serving loop.
//! - `config`: layered settings from files and the environment.
//! - `utils`: the shared error type and logging setup.

pub mod actor;
pub mod broker;
pub mod client;
pub mod config;
pub mod protocol;
pub mod segment;
pub mod transport;
pub mod utils;
