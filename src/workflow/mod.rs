pub mod branch;
pub mod tracking;
