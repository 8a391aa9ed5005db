// src/utils/log.rs

//! Section and summary formatting on top of the `log` facade.
//!
//! Pipeline steps open with a header and close with a summary block so a run
//! reads as a sequence of clearly delimited sections.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for line in summary_lines(items) {
        log::info!("{}", line);
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(key, _)| key.chars().count()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| {
            let pad = width - key.chars().count();
            format!("    {}:{} {}", key, " ".repeat(pad), value)
        })
        .collect()
}
