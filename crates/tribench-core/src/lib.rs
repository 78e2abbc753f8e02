pub mod backend;
pub mod cache;
pub mod classify;
pub mod complexity;
pub mod config;
pub mod corpus;
pub mod harness;
pub mod model;
pub mod providers;
pub mod ratelimit;
pub mod report;
pub mod router;
pub mod schema;
pub mod storage;
pub mod strategy;
