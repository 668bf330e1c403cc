pub mod executor;
pub mod fuzzy;
pub mod prefix;
pub mod results;
