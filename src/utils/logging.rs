//! Logging Module
//!
//! Installs the `tracing` subscriber for the CLI and reports per-epoch
//! progress from the training loop.

use std::io::IsTerminal;
use std::time::Instant;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Subscriber settings derived from the command line
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Show the module path of each event
    pub show_targets: bool,
    /// Colour output; off when stdout is piped
    pub ansi: bool,
}

impl LogConfig {
    /// `--verbose` turns on debug events and module paths
    pub fn for_cli(verbose: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::INFO },
            show_targets: verbose,
            ansi: std::io::stdout().is_terminal(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::for_cli(false)
    }
}

/// Install the global tracing subscriber
///
/// Fails if a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_ansi(config.ansi)
        .with_target(config.show_targets)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Epoch timing and metric lines for the training loop
pub struct TrainingLogger {
    total_epochs: usize,
    current: usize,
    run_started: Instant,
    epoch_started: Instant,
}

impl TrainingLogger {
    pub fn new(total_epochs: usize) -> Self {
        let now = Instant::now();
        Self {
            total_epochs,
            current: 0,
            run_started: now,
            epoch_started: now,
        }
    }

    /// Zero-based epoch index
    pub fn start_epoch(&mut self, epoch: usize) {
        self.current = epoch;
        self.epoch_started = Instant::now();
        tracing::debug!("Epoch {}/{} started", epoch + 1, self.total_epochs);
    }

    /// Seconds left at the mean epoch duration so far
    pub fn eta_secs(&self) -> f64 {
        let done = self.current + 1;
        let remaining = self.total_epochs.saturating_sub(done);
        remaining as f64 * self.run_started.elapsed().as_secs_f64() / done as f64
    }

    pub fn end_epoch(
        &self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: Option<f64>,
        val_accuracy: Option<f64>,
    ) {
        let validation = match (val_loss, val_accuracy) {
            (Some(loss), Some(acc)) => {
                format!(" | val_loss: {:.4} | val_acc: {:.2}%", loss, acc * 100.0)
            }
            _ => String::new(),
        };

        tracing::info!(
            "Epoch {}/{} in {:.1}s | loss: {:.4} | acc: {:.2}%{} | ETA: {:.0}s",
            self.current + 1,
            self.total_epochs,
            self.epoch_started.elapsed().as_secs_f64(),
            train_loss,
            train_accuracy * 100.0,
            validation,
            self.eta_secs()
        );
    }

    pub fn log_complete(&self) {
        tracing::info!(
            "Training complete: {} epochs in {:.1}s",
            self.total_epochs,
            self.run_started.elapsed().as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verbosity() {
        let quiet = LogConfig::for_cli(false);
        assert_eq!(quiet.level, Level::INFO);
        assert!(!quiet.show_targets);

        let verbose = LogConfig::for_cli(true);
        assert_eq!(verbose.level, Level::DEBUG);
        assert!(verbose.show_targets);
    }

    #[test]
    fn test_eta_after_last_epoch_is_zero() {
        let mut logger = TrainingLogger::new(3);
        logger.start_epoch(2);
        assert_eq!(logger.eta_secs(), 0.0);

        // an index past the planned total must not underflow
        logger.start_epoch(5);
        assert_eq!(logger.eta_secs(), 0.0);
        logger.end_epoch(0.5, 0.75, Some(0.6), Some(0.7));
    }
}
