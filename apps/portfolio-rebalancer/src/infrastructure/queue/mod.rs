//! Queue Transport Adapters

pub mod dead_letter;
pub mod in_memory;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use dead_letter::LoggingDeadLetter;
pub use in_memory::InMemoryQueue;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaConsumer, KafkaPublisher};
