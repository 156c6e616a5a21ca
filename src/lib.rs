pub mod cli;
pub mod collaborators;
pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod intake;
pub mod ledger;
pub mod logging;
pub mod protocol;
pub mod ranker;
pub mod server;
pub mod types;
