//! Example plugins shipped with this binary: one module per chat-platform
//! surface area, each a self-contained bundle of tools/resources/prompts.

pub mod channel_tools;
pub mod guild_tools;
pub mod mod_prompts;
pub mod user_resources;

pub use channel_tools::ChannelToolsPlugin;
pub use guild_tools::GuildToolsPlugin;
pub use mod_prompts::ModerationPromptsPlugin;
pub use user_resources::UserResourcesPlugin;
