pub use self::parser::{Config, IrcConfig, LoggingConfig, RelayConfig, SlackConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
