//! Sweeps recent Octopus Energy bills into Splitwise, a MongoDB ledger and an
//! object-store archive.
pub mod config;
pub mod models;
pub mod services;
pub mod startup;
pub mod sync;
