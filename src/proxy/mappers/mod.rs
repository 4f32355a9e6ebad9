// Protocol mappers
// aisearch: upstream wire format and stream state machine
// openai: client-facing OpenAI wire format

pub mod aisearch;
pub mod openai;
