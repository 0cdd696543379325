pub mod config;
pub mod context;
pub mod database;
pub mod entity;
pub mod error;
pub mod legacy;
pub mod migration;
pub mod report;
pub mod tags;
