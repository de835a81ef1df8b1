//! Coach — the hair-care chat: bounded history, prompt rendering and staged
//! sentence-by-sentence reply delivery.

pub mod handlers;
pub mod history;
pub mod message;
pub mod prompt;
pub mod session;
pub mod stager;
pub mod text;
