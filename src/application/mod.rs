//! Application services layer scaffolding.

pub mod accounts;
pub mod admin;
pub mod comments;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod repos;
