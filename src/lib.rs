pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod models;
pub mod runs;
pub mod storage;
pub mod tools;
