pub mod cli;
pub mod dashboard;
pub mod distribution;
pub mod error;
pub mod geo;
pub mod hospitals;
pub mod lookup;
pub mod payments;
pub mod prices;
pub mod query;
pub mod server;
pub mod storage;
pub mod store;
pub mod visible;

#[cfg(test)]
mod test_support;
