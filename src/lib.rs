pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod resources;
pub mod rpc;
pub mod server;
