//! Prompt templates for the three summarization roles.

/// System instructions shared by every role.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that helps people summarize information.\n\
You reply in the style of a literary critic.\n\
Strictly ignore Project Gutenberg and ignore copyright notices in the summary output.";

/// Which part of a strategy a prompt serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptRole {
    /// Whole document in one request.
    Stuff,
    /// One chunk, optionally with accumulated context.
    Chunk,
    /// Condensation of concatenated partial summaries.
    Final,
}

impl PromptRole {
    /// Short label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stuff => "stuff",
            Self::Chunk => "chunk",
            Self::Final => "final",
        }
    }
}

/// Render the user prompt for a role.
///
/// `context` is only consulted by [`PromptRole::Chunk`]; the other roles ignore it.
pub fn render(role: PromptRole, context: &str, content: &str) -> String {
    match role {
        PromptRole::Stuff => format!(
            "Please provide a concise summary in strictly no more than 10 one sentence bullet points, \
starting with an introduction and ending with a conclusion, of the following text\n\
TEXT: {content}\n"
        ),
        PromptRole::Final => format!(
            "Please provide a concise summary in strictly no more than 10 one sentence bullet points, \
starting with an introduction and ending with a conclusion, of the following text delimited by triple backquotes.\n\n\
```Text:{content}```\n\n\
Output starts with SUMMARY:\n"
        ),
        PromptRole::Chunk => format!(
            "Taking the following context delimited by triple backquotes into consideration\n\n\
```{context}```\n\n\
Write a concise summary of the following text delimited by triple backquotes.\n\n\
```{content}```\n\n\
Output starts with CONCISE SUB-SUMMARY:\n"
        ),
    }
}
