use log::{Level, Log, Record};
use std::fmt::{Arguments, Debug, Formatter};
use std::sync::Arc;

pub(crate) const LOG_TARGET: &str = "docmigrate";

/// Routes driver log records to an injected logger or to the global one.
///
/// Verbose records are dropped unless verbose logging is enabled.
#[derive(Clone, Default)]
pub(crate) struct DriverLogger {
    logger: Option<Arc<dyn Log>>,
    verbose: bool,
}

impl DriverLogger {
    pub(crate) fn new(logger: Option<Arc<dyn Log>>, verbose: bool) -> Self {
        DriverLogger { logger, verbose }
    }

    pub(crate) fn error(&self, args: Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub(crate) fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub(crate) fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub(crate) fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    /// Logs at info level when verbose logging is enabled.
    pub(crate) fn verbose(&self, args: Arguments<'_>) {
        if self.verbose {
            self.log(Level::Info, args);
        }
    }

    fn log(&self, level: Level, args: Arguments<'_>) {
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(LOG_TARGET)
            .module_path_static(Some(module_path!()))
            .build();

        match &self.logger {
            Some(logger) => {
                if logger.enabled(record.metadata()) {
                    logger.log(&record);
                }
            }
            None => {
                if level <= log::max_level() {
                    log::logger().log(&record);
                }
            }
        }
    }
}

impl Debug for DriverLogger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverLogger")
            .field("injected", &self.logger.is_some())
            .field("verbose", &self.verbose)
            .finish()
    }
}
