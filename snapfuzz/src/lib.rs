//! Library half of the `snapfuzz` binary, split out so the coordinator loop
//! and wire protocol can be exercised by black-box integration tests.

pub mod cli;
pub mod coordinator;
pub mod targets;
pub mod worker;
