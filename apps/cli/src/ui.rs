use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vidbrief_core::format::format_duration;

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn finish(spinner: &ProgressBar, msg: &str, started: Instant) {
    spinner.finish_with_message(format!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    ));
}

pub fn fail(spinner: &ProgressBar, msg: &str) {
    spinner.finish_with_message(format!("{} {}", style("✗").red().bold(), msg));
}

pub fn cached(msg: &str) {
    println!("{} {} {}", style("✓").green().bold(), msg, style("(cached)").dim());
}

pub fn done(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", style("!").yellow().bold(), msg);
}

pub fn rule() {
    println!("{}", style("─".repeat(60)).dim());
}

/// Run `fut` behind a spinner, marking it done or failed.
pub async fn step<T, E, F>(running: &str, finished: impl FnOnce(&T) -> String, fut: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let spinner = create_spinner(running);
    match fut.await {
        Ok(value) => {
            finish(&spinner, &finished(&value), started);
            Ok(value)
        }
        Err(err) => {
            fail(&spinner, &format!("{running} failed: {err}"));
            Err(err)
        }
    }
}
