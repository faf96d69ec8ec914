/// Initialize logging with the given default level. Respects `RUST_LOG`
/// overrides.
pub fn init_logging(default_level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

pub mod buttons;
pub mod context;
pub mod display;
pub mod frame;
pub mod probe;
pub mod render;
pub mod scheduler;
pub mod state;

pub use state::FilterState;
