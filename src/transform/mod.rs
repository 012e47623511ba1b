pub mod emoji;
pub mod irc_to_slack;
pub mod slack_to_irc;

pub use emoji::EmojiTable;
pub use slack_to_irc::{EntityResolver, SlackToIrcRenderer};
