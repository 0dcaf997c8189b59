pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod policy;
pub mod recipes;
pub mod response;
pub mod reviews;
pub mod state;
pub mod storage;
pub mod store;
pub mod validation;
