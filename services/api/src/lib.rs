pub mod adapters;
pub mod config;
pub mod error;
pub mod sweep;
pub mod web;
