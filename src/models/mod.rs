mod client;

pub use client::{ClientRecord, NewClient};
