pub mod benchmark;
pub mod questions;
pub mod solve;
