mod helpers;
mod secret;

pub use helpers::{env_flag, env_u64, parse_boolean_flag};
pub use secret::Secret;
