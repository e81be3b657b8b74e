//! API route modules

pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod reviews;
pub mod submissions;
pub mod users;
pub mod ws;
