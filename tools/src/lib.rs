pub mod config;

pub use config::ToolConfig;

/// Initialise `env_logger` with an `info` default, overridable through `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
