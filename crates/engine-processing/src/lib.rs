pub mod chunk;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod job;
