// Library for the binary and integration tests

pub mod aggregator;
pub mod attribution;
pub mod cli;
pub mod collector;
pub mod config;
pub mod docker_repo;
pub mod error;
pub mod gpu_repo;
pub mod models;
pub mod natural;
pub mod registry;
pub mod routes;
pub mod sysinfo_repo;
