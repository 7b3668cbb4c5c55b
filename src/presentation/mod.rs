//! Presentation layer: askama view models and render helpers.

pub mod admin;
pub mod views;
