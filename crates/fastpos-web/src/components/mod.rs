//! UI Components

mod chat_panel;
mod chatbot;
mod faq;
mod lead_form;
mod playground;

pub use chat_panel::ChatPanel;
pub use chatbot::FloatingChatbot;
pub use faq::Faq;
pub use lead_form::LeadFormModal;
pub use playground::Playground;
