pub mod message_service;
pub mod response_service;

pub use message_service::{Decision, IncomingMessage, MessageService, PromptLine, StatusSnapshot};
pub use response_service::ResponseService;
