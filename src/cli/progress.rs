//! Progress bar and summary reporting for CLI precaching.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{InstallStats, PrecacheProgress, UrlList, format_bytes, format_duration};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates the precache progress bar.
fn make_precache_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} resources - {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar
}

/// [`PrecacheProgress`] implementation driving an indicatif bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Creates a bar sized for `total` resources.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            bar: make_precache_bar(total as u64),
        }
    }

    /// Finishes and clears the bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PrecacheProgress for BarProgress {
    fn on_resource_start(&self, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_resource_cached(&self, url: &str, bytes: u64) {
        self.bar.inc(1);
        self.bar
            .println(format!("  {} {url} ({})", style("✓").green(), format_bytes(bytes)));
    }

    fn on_resource_error(&self, url: &str, error: &str) {
        self.bar
            .println(format!("  {} {url}: {error}", style("✗").red()));
    }
}

/// Prints the resources about to be precached.
pub fn print_url_list(urls: &UrlList, offline_included: bool) {
    println!("\n{SEPARATOR}");
    println!("Resources to precache:");
    println!("{SEPARATOR}");
    for url in urls {
        println!("  {url}");
    }
    println!("{SEPARATOR}");
    print!("  {} resource(s)", urls.len());
    if offline_included {
        print!(" + offline fallback");
    }
    println!("\n{SEPARATOR}\n");
}

/// Prints a summary of a completed install.
pub fn print_summary(store_name: &str, stats: &InstallStats) {
    println!("\n{SEPARATOR}");
    println!("{}", style("Precache Summary").bold());
    println!("{SEPARATOR}");
    println!("  Cache store:       {store_name}");
    println!("  Resources cached:  {}", stats.resources_cached);
    println!("  Total size:        {}", format_bytes(stats.total_bytes));
    println!("  Total time:        {}", format_duration(stats.elapsed));
    println!(
        "  Average speed:     {}/s",
        format_bytes(stats.average_speed())
    );
    println!("{SEPARATOR}");
}
