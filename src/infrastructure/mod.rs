pub mod database;
pub mod entities;
pub mod mailer;
pub mod repositories;
pub mod settings;
pub mod sms;
pub mod traits;
