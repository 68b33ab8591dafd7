// src/logging.rs

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the global logger once; later calls are ignored.
///
/// Filter precedence: `filter` (from config), then `RUST_LOG`, then `info`.
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                let _ = filter;
                std::panic::set_hook(Box::new(console_error_panic_hook::hook));
                if console_log::init_with_level(log::Level::Warn).is_err() {
                    return;
                }
            } else {
                let mut builder = env_logger::Builder::new();
                if let Some(filter) = filter {
                    builder.parse_filters(filter);
                } else if let Ok(filter) = std::env::var("RUST_LOG") {
                    builder.parse_filters(&filter);
                } else {
                    builder.filter_level(log::LevelFilter::Info);
                }
                // A test harness may already have installed a logger.
                if builder.try_init().is_err() {
                    return;
                }
            }
        }
        log::debug!("logging initialized");
    });
}
