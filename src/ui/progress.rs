use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Whole-number percentage, 100 when there is nothing to do.
pub fn percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let clamped = current.min(total);
    ((clamped * 100) / total) as u8
}

/// Draw a one-shot progress line on stderr.
///
/// The bar is created, positioned and left on screen; nothing is kept
/// between calls.
pub fn render_bar(current: usize, total: usize, label: &str, color: bool) {
    let template = if color {
        "{prefix:>7.cyan.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}"
    } else {
        "{prefix:>7} [{bar:30}] {pos}/{len} {msg}"
    };
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

    let bar = ProgressBar::new(total.max(1) as u64).with_style(style);
    bar.set_prefix(format!("{}%", percent(current, total)));
    bar.set_position(current.min(total.max(1)) as u64);
    bar.set_message(label.to_string());
    bar.abandon();
}

/// Advisory animation shown while a blocking step runs.
///
/// The spinner is ticked by a tokio task that is aborted when the spinner is
/// stopped or dropped. It never touches run state. Outside a tokio runtime no
/// animation is drawn.
pub struct Spinner {
    bar: ProgressBar,
    ticker: Option<JoinHandle<()>>,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
        );
        bar.set_message(message.into());

        let ticker = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let bar = bar.clone();
            handle.spawn(async move {
                let mut interval = tokio::time::interval(SPINNER_TICK);
                loop {
                    interval.tick().await;
                    bar.tick();
                }
            })
        });

        Self { bar, ticker }
    }

    /// Stop ticking and clear the line.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
        assert_eq!(percent(9, 4), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_spinner_outside_runtime() {
        let spinner = Spinner::start("working");
        assert!(spinner.ticker.is_none());
        spinner.stop();
    }

    #[tokio::test]
    async fn test_spinner_ticker_is_aborted() {
        let spinner = Spinner::start("working");
        assert!(spinner.ticker.is_some());
        drop(spinner);
    }

    #[test]
    fn test_render_bar_is_self_contained() {
        render_bar(1, 3, "mise", false);
        render_bar(0, 0, "nothing", true);
    }
}
