pub mod auth;
pub mod history;
pub mod notifier;
pub mod outbox;
pub mod residents;
pub mod services;
pub mod traits;
pub mod validation;
