use std::{
    collections::TryReserveError,
    fmt,
    sync::Arc,
};
use thiserror::Error;


/// Ошибки конструирования пула и постановки задач в очередь.
/// Возвращаются вызывающему сразу, в отличие от [`TaskError`].
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool size must be at least 1")]
    InvalidPoolSize,
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to reserve a queue slot: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("pool is shut down")]
    ShutDown,
}


/// Ошибка конкретной задачи, хранится в ResultHandle до чтения
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task failed: {0}")]
    Failed(Arc<anyhow::Error>),
    #[error("task was discarded before it ran")]
    Discarded,
}

impl TaskError {
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        TaskError::Failed(Arc::new(err.into()))
    }

    /// Доступ к исходной ошибке задачи, если она типа `E`
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            TaskError::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        matches!(self, TaskError::Discarded)
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
