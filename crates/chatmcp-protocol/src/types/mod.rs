//! MCP payload types, organized by the feature area they belong to.

pub mod capabilities;
pub mod completion;
pub mod content;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use capabilities::{
    ClientCapabilities, Implementation, InitializeRequestParams, InitializeResult,
    LoggingCapability, PromptsCapability, ResourcesCapability, ServerCapabilities,
    ToolsCapability, PROTOCOL_VERSION,
};
pub use completion::{
    CompleteRequestParams, CompleteResult, Completion, CompletionArgument, CompletionContext,
    CompletionReference,
};
pub use content::{ContentBlock, ResourceContents};
pub use prompts::{
    GetPromptRequestParams, GetPromptResult, ListPromptsResult, Prompt, PromptArgument,
    PromptMessage, PromptRole,
};
pub use resources::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceRequestParams,
    ReadResourceResult, Resource, ResourceTemplate,
};
pub use tools::{
    CallToolRequestParams, CallToolResult, ListToolsResult, Tool, ToolAnnotations,
    ToolInputSchema, ToolOutputSchema,
};
