pub mod lowercase;
pub mod stopword;
pub mod length;
