// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::services::{PaginationRecognizer, TopicListParser};
use crate::utils::html::parse_selector;
use crate::utils::log;

/// Validate the configuration file and compile every selector it names.
///
/// A missing file validates the built-in defaults.
pub fn run_validate(config_path: &Path) -> Result<Config> {
    log::header("Validating configuration");

    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        log::warn(&format!(
            "{} not found, validating defaults",
            config_path.display()
        ));
        Config::default()
    };

    match check(&config) {
        Ok(()) => {
            log::success("Config OK");
            log::sub_item(&format!("User agent: {}", config.crawler.user_agent));
            log::sub_item(&format!("Timeout: {}s", config.crawler.timeout_secs));
            log::sub_item(&format!("Max concurrent: {}", config.crawler.max_concurrent));
            log::sub_item(&format!(
                "Sweep: {} back to {} every {} days",
                config.sweep.latest_date, config.sweep.min_date, config.sweep.step_days
            ));
            log::sub_item(&format!(
                "Registry: {} forums x {} styles x pages {}..{}",
                config.forums.len(),
                config.styles.len(),
                config.sweep.page_from,
                config.sweep.page_to
            ));
            log::sub_item(&format!(
                "Selectors: {} topic layouts, {} pagination patterns",
                config.selectors.topics.layouts.len(),
                config.selectors.pagination.len()
            ));
            Ok(config)
        }
        Err(e) => {
            log::error(&format!("Validation failed: {}", e));
            Err(e)
        }
    }
}

fn check(config: &Config) -> Result<()> {
    config.validate()?;
    TopicListParser::new(&config.selectors.topics, &config.archive.web_root)?;
    PaginationRecognizer::new(&config.selectors.pagination)?;
    for selector in config.selectors.thread.all() {
        parse_selector(selector)?;
    }
    Ok(())
}
