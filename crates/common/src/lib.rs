pub mod config;
pub mod db;
pub mod error;
pub mod funnel;
pub mod observability;
pub mod types;
