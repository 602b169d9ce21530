pub mod aggregate;
pub mod attempt;
pub mod config;
pub mod decoder;
pub mod projection;
pub mod replay;
pub mod snapshot;

pub use aggregate::{AggregateSet, MergeMode, MessageAggregate, merge};
pub use attempt::{DeliveryAttempt, Message, TimeWindow};
pub use config::{CacheConfig, FetchConfig, ReplayConfig};
pub use decoder::{DecodeFailure, DecodeReport, DocumentIdMap, decode_documents};
