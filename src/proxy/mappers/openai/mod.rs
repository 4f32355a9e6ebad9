// OpenAI mapper module
// Responsible for TranslatedChunk -> OpenAI SSE / chat.completion conversion

pub mod models;
pub mod response;
pub mod streaming;

pub use models::*;
pub use response::*;
pub use streaming::*;
