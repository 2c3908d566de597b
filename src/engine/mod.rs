pub mod feed;
pub mod filter;
pub mod monitor;
pub mod scoring;
