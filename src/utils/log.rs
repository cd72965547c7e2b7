// src/utils/log.rs

//! Pipeline logging helpers with consistent formatting.
//!
//! Everything goes through the `log` facade, so the backend (and its level
//! filter) is chosen by the binary.

/// Width of separator lines.
const RULE_WIDTH: usize = 60;

/// Log a debug message
pub fn debug(message: &str) {
    log::debug!("{}", message);
}

/// Log an info message
pub fn info(message: &str) {
    log::info!("{}", message);
}

/// Log a warning message
pub fn warn(message: &str) {
    log::warn!("{}", message);
}

/// Log an error message
pub fn error(message: &str) {
    log::error!("{}", message);
}

/// Log a success message
pub fn success(message: &str) {
    log::info!("[OK] {}", message);
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("{}", format_step(step_num, total, message));
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}

fn format_step(step_num: usize, total: usize, message: &str) -> String {
    format!("[STEP {}/{}] {}", step_num, total, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_step() {
        assert_eq!(format_step(2, 3, "Topics"), "[STEP 2/3] Topics");
    }
}
