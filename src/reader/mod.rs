pub mod snapshot_reader;
pub mod freshness;
