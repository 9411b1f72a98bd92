//! API handlers module

pub mod browse;
pub mod health;
pub mod records;
