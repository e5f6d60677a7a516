use dealbot_core::config::{AppConfig, LoadOptions};
use dealbot_core::Catalogs;

/// Prints the dropdown catalogs in catalog order. Falls back to the built-in
/// defaults when no valid configuration is available.
pub fn run() -> String {
    let (catalogs, source) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (
            Catalogs::from_entries(config.catalog.stages, config.catalog.pipelines),
            "configured",
        ),
        Err(_) => (Catalogs::default(), "built-in defaults"),
    };

    let mut lines = vec![format!("dropdown catalogs ({source}):")];
    lines.push(format!("  stage: {}", catalogs.stages.render()));
    lines.push(format!("  pipeline: {}", catalogs.pipelines.render()));
    lines.join("\n")
}
