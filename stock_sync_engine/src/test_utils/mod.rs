pub mod fake_platform;
pub mod prepare_env;
