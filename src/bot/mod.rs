//! Traffic assistant bot: intent classification, Telegram and store clients.

pub mod engine;
pub mod message;
pub mod models;
pub mod responder;
pub mod store;
pub mod telegram;

pub use engine::Engine;
pub use store::FirestoreClient;
pub use telegram::TelegramClient;
