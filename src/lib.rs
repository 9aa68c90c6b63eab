//! Пул из фиксированного числа потоков с общей FIFO-очередью задач
//!
//! # Features
//! - Неблокирующая постановка задач с handle'ом на результат
//! - Глобальный FIFO-порядок выдачи задач воркерам
//! - Паники и ошибки задач сохраняются в handle, воркер продолжает работу
//! - Блокирующее, неблокирующее и async-чтение результата
//! - Явный идемпотентный shutdown (также в `Drop`), оставшиеся в очереди задачи выбрасываются
//! - Внедряемый приемник сообщений вместо глобального логгера
//!
//! ```no_run
//! use workpool::WorkerPool;
//!
//! let pool = WorkerPool::new(4)?;
//! let handle = pool.submit_with(|a: i32, b: i32| a + b, (2, 3))?;
//! assert_eq!(handle.read().unwrap(), 5);
//! pool.shutdown();
//! # Ok::<(), workpool::PoolError>(())
//! ```

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod sink;
pub mod task;

pub use errors::{PoolError, TaskError, TaskResult};
pub use handle::{ResultHandle, SharedHandle};
pub use pool::{Config, WorkerPool};
pub use sink::{Level, LogSink};
