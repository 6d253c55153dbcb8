pub mod app;
pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod exploit;
pub mod miner;
pub mod output;
pub mod prober;
pub mod runner;
pub mod scope;
pub mod session;
pub mod wordlist;

#[cfg(test)]
mod tests;
