//! Command implementations.

pub mod caption;
pub mod config;
pub mod text;

pub use self::caption::execute_caption;
pub use self::config::execute_config;
pub use self::text::execute_text;
