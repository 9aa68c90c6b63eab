use std::fmt;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Приемник сообщений пула. Пул знает только об этом интерфейсе,
/// маршрутизация и форматирование остаются на стороне реализации.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    #[inline]
    fn log(&self, level: Level, message: &str) {
        self(level, message)
    }
}


/// Пересылает сообщения в `tracing`. Используется по умолчанию.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Trace => tracing::trace!("{}", message),
            Level::Debug => tracing::debug!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            // в tracing нет отдельного fatal
            Level::Error | Level::Fatal => {
                let fatal = level == Level::Fatal;
                tracing::error!(fatal, "{}", message)
            }
        }
    }
}


#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    #[inline]
    fn log(&self, _level: Level, _message: &str) {}
}
