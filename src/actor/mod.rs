//! The `actor` module implements the client side of the overlay.
//!
//! - `Session`: registration, sending and receiving against one broker
//! - `Producer`: announces topics and publishes fragmented payloads
//! - `Consumer`: subscribes and rebuilds payloads into a `Sink`

pub mod consumer;
pub mod producer;
pub mod session;
pub mod sink;

pub use consumer::{Consumer, ConsumerEvent};
pub use producer::{Producer, ProducerEvent};
pub use session::Session;
pub use sink::{ChannelSink, Delivery, LogSink, Sink};
