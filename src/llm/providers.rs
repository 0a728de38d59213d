mod gigachat;
mod openai_compat;

pub use gigachat::GigaChatProvider;
pub use openai_compat::OpenAiCompatProvider;
