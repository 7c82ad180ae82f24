//! HTTP handlers, one router per resource.

pub mod auth;
pub mod comments;
pub mod health;
pub mod images;
pub mod notes;
pub mod users;
