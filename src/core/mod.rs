pub mod chat;
pub mod services;
pub mod traits;
