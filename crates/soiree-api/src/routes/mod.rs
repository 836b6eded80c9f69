pub mod auth;
pub mod comments;
pub mod events;
pub mod polls;
pub mod todos;
pub mod users;
pub mod webhooks;
