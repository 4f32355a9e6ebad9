// AI search mapper module
// Responsible for OpenAI request -> AI search payload and AI search stream -> TranslatedChunk

pub mod card;
pub mod models;
pub mod request;
pub mod streaming;

pub use card::{format_card, render_card};
pub use models::*;
pub use request::*;
pub use streaming::{LineDecoder, StreamingState, ThinkingState, TranslatedChunk};
