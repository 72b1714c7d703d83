pub mod parser;
pub mod processor;
pub mod worker;

pub use parser::parse_logs;
pub use processor::Processor;
pub use worker::{ChainWorker, IndexMessage};
