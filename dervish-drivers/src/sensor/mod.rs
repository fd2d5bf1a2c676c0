//! Temperature sensor implementations

pub mod ntc100k;

pub use ntc100k::Ntc100k;
