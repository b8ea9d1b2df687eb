pub mod engine;
pub mod message;
pub mod topic;

pub use engine::Broker;
pub use message::Outbound;
