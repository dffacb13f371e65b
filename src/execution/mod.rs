pub mod format;
pub mod retrieval;
pub mod stats;
pub mod upload;
