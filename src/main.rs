mod ui;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use mariposa::config;

const DEFAULT_LOG_FILTER: &str = "mariposa=info";

/// `RUST_LOG` when it parses, the crate's info level otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let config = config::load_config();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Método de Mariposa")
            .with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Método de Mariposa",
        options,
        Box::new(move |_cc| Ok(Box::new(ui::app::MariposaApp::new(&config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_level_is_kept() {
        let filter = log_filter(Some("mariposa=debug")).to_string().to_lowercase();
        assert_eq!(filter, "mariposa=debug");
    }

    #[test]
    fn unset_or_blank_rust_log_uses_info() {
        assert_eq!(log_filter(None).to_string().to_lowercase(), DEFAULT_LOG_FILTER);
        assert_eq!(log_filter(Some("  ")).to_string().to_lowercase(), DEFAULT_LOG_FILTER);
    }
}
