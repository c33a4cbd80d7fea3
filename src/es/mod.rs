mod r#impl;
pub mod inmemory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub mod storage;
pub use r#impl::*;
