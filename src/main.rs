use std::sync::atomic::{AtomicBool, Ordering};

use arbor::cli::commands::Cli;
use arbor::cli::handlers;
use arbor::io::config_io;
use clap::Parser;

static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

/// Log to the systemd journal (`journalctl -t arbor -f`). arbor's own
/// targets go through at info (debug when asked), everything else at warn.
/// Without a journal, logging stays off.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("arbor") {
                let max = if DEBUG_LOGGING.load(Ordering::Relaxed) {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    DEBUG_LOGGING.store(debug, Ordering::Relaxed);
    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier("arbor".to_string());
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match config_io::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }

    init_logging(cli.debug || config.log.debug);

    if let Err(e) = handlers::dispatch(cli, &config).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
