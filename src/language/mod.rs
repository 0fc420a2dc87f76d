pub mod errors;
pub mod interface;
pub mod sequence;
pub mod types;
pub mod wire;
