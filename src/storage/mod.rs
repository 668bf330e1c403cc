pub mod layout;
pub mod segment;
pub mod segment_writer;
pub mod segment_reader;
pub mod manifest;
pub mod file_lock;
pub mod merge_policy;
