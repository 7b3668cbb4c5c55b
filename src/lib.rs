//! Blogicum: a small multi-user blogging service.
//!
//! Users write posts (optionally scheduled for future publication), browse
//! them by category or author profile, and comment on them. The crate is
//! organized in layers: `domain` holds the entities and the visibility and
//! ownership policy, `application` the services and repository traits,
//! `infra` the Postgres and HTTP adapters, and `presentation` the askama
//! view models.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
