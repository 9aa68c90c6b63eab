use super::{
    errors::{PoolError, TaskError, TaskResult},
    handle::{result_channel, ResultHandle},
    model::{Outcome, PoolMetrics},
    queue::TaskQueue,
    sink::{Level, LogSink, TracingSink},
    task::{BoundTask, BoxedWorkItem, Callable, WorkItem},
};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle, ThreadId},
};
use crossbeam::utils::CachePadded;


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "workpool-worker".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self {
            num_threads: num_cpus::get(),
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 2, // потоки часто спят на I/O
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}


#[derive(Default)]
struct Counters {
    active: CachePadded<AtomicUsize>,
    submitted: CachePadded<AtomicUsize>,
    completed: CachePadded<AtomicUsize>,
    failed: CachePadded<AtomicUsize>,
    discarded: CachePadded<AtomicUsize>,
}

/// Состояние, которое делят воркеры и продюсеры
struct Shared {
    queue: TaskQueue,
    sink: Arc<dyn LogSink>,
    counters: Counters,
    next_task_id: AtomicU64,
}

impl Shared {
    #[inline]
    fn log(&self, level: Level, message: impl AsRef<str>) {
        self.sink.log(level, message.as_ref());
    }
}


/// Пул из фиксированного числа OS-потоков с общей FIFO-очередью.
///
/// Задачи выдаются воркерам строго в порядке постановки; порядок
/// завершения между разными воркерами не гарантируется.
///
/// # Остановка
///
/// [`shutdown`](Self::shutdown) (и `Drop`) дожидается завершения уже
/// выполняющихся задач, но задачи, оставшиеся в очереди, **не выполняются**:
/// они выбрасываются, а их handle'ы получают [`TaskError::Discarded`].
/// Доставка at-most-once; если нужна полная отработка очереди, дождитесь
/// всех handle'ов до вызова `shutdown`.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
    config: Config,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_config(Config::default().with_threads(num_threads))
    }

    pub fn with_config(config: Config) -> Result<Self, PoolError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: Config, sink: Arc<dyn LogSink>) -> Result<Self, PoolError> {
        if config.num_threads == 0 {
            return Err(PoolError::InvalidPoolSize);
        }

        let shared = Arc::new(Shared {
            queue: TaskQueue::new(),
            sink,
            counters: Counters::default(),
            next_task_id: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(config.num_threads);
        for index in 0..config.num_threads {
            match Self::spawn_worker(&config, &shared, index) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    shared.log(Level::Fatal, format!("failed to spawn worker {}: {}", index, source));
                    // Уже запущенные потоки останавливаем до возврата ошибки
                    shared.queue.close();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }

        let worker_ids = workers.iter().map(|h| h.thread().id()).collect();
        shared.log(Level::Info, format!("started pool with {} workers", config.num_threads));

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_ids,
            config,
        })
    }

    fn spawn_worker(config: &Config, shared: &Arc<Shared>, index: usize) -> std::io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name_prefix, index));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = shared.clone();
        builder.spawn(move || worker_loop(shared, index))
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.config.num_threads
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ставит замыкание в очередь и сразу возвращает handle на результат.
    /// Паника внутри замыкания попадет в handle как [`TaskError::Panicked`].
    pub fn submit<F, T>(&self, func: F) -> Result<ResultHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit_task(move || Ok(func()))
    }

    /// Как [`submit`](Self::submit), но аргументы передаются кортежем
    /// и перемещаются в задачу в момент вызова.
    pub fn submit_with<F, Args>(&self, func: F, args: Args) -> Result<ResultHandle<F::Output>, PoolError>
    where
        F: Callable<Args>,
        Args: Send + 'static,
        F::Output: Send + 'static,
    {
        self.submit_task(move || Ok(func.call_with(args)))
    }

    /// Для замыканий, возвращающих `Result`: `Err(e)` становится
    /// [`TaskError::Failed`] с исходной ошибкой внутри.
    pub fn submit_fallible<F, T, E>(&self, func: F) -> Result<ResultHandle<T>, PoolError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        self.submit_task(move || func().map_err(TaskError::failed))
    }

    /// Ставит в очередь произвольный [`WorkItem`] без handle'а
    pub fn enqueue<W: WorkItem>(&self, item: W) -> Result<(), PoolError> {
        self.push(Box::new(item))
    }

    fn submit_task<F, T>(&self, func: F) -> Result<ResultHandle<T>, PoolError>
    where
        F: FnOnce() -> TaskResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (writer, handle) = result_channel();
        self.push(Box::new(BoundTask::new(func, writer)))?;
        Ok(handle)
    }

    fn push(&self, item: BoxedWorkItem) -> Result<(), PoolError> {
        // счетчик растет до того, как задачу увидят воркеры
        let counters = &self.shared.counters;
        counters.submitted.fetch_add(1, Ordering::Relaxed);
        let depth = match self.shared.queue.push(item) {
            Ok(depth) => depth,
            Err(err) => {
                counters.submitted.fetch_sub(1, Ordering::Relaxed);
                return Err(err);
            }
        };
        let id = self.shared.next_task_id.fetch_add(1, Ordering::Relaxed);
        self.shared.log(Level::Trace, format!("task {} queued, depth {}", id, depth));
        Ok(())
    }

    /// Останавливает пул и ждет завершения всех воркеров.
    ///
    /// Задачи, не взятые воркерами, выбрасываются; возвращается их число.
    /// Повторные вызовы ничего не делают и возвращают 0. При вызове из
    /// задачи этого же пула поток-вызывающий себя не ждет.
    pub fn shutdown(&self) -> usize {
        let pending = self.shared.queue.close();
        let discarded = pending.len();
        // handle'ы выброшенных задач получают Discarded
        drop(pending);

        if discarded > 0 {
            self.shared.counters.discarded.fetch_add(discarded, Ordering::Release);
            self.shared.log(Level::Warning, format!("discarding {} pending tasks", discarded));
        }

        if self.worker_ids.contains(&thread::current().id()) {
            self.shared.log(Level::Debug, "shutdown requested from a worker thread, not joining");
            return discarded;
        }

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if workers.is_empty() {
            return discarded;
        }
        for handle in workers.drain(..) {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.join().is_err() {
                self.shared.log(Level::Error, format!("worker {} terminated abnormally", name));
            }
        }
        self.shared.log(Level::Info, "pool shut down");
        discarded
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.queue.is_closed()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        let counters = &self.shared.counters;
        // Итоговые счетчики читаются раньше submitted, иначе снимок
        // может показать больше завершенных задач, чем принятых
        let completed_tasks = counters.completed.load(Ordering::Acquire);
        let failed_tasks = counters.failed.load(Ordering::Acquire);
        let discarded_tasks = counters.discarded.load(Ordering::Acquire);
        PoolMetrics {
            workers: self.config.num_threads,
            active_tasks: counters.active.load(Ordering::Relaxed),
            queued_tasks: self.shared.queue.len(),
            total_submitted: counters.submitted.load(Ordering::Relaxed),
            completed_tasks,
            failed_tasks,
            discarded_tasks,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}


fn worker_loop(shared: Arc<Shared>, index: usize) {
    shared.log(Level::Debug, format!("worker {} started", index));

    // pop() отпускает мьютекс очереди до выполнения задачи
    while let Some(item) = shared.queue.pop() {
        shared.counters.active.fetch_add(1, Ordering::Relaxed);
        // пользовательский WorkItem может паниковать мимо handle'а
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| item.execute()))
            .unwrap_or(Outcome::Failed);
        shared.counters.active.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Outcome::Completed => shared.counters.completed.fetch_add(1, Ordering::Release),
            Outcome::Failed => shared.counters.failed.fetch_add(1, Ordering::Release),
        };
        shared.log(Level::Trace, format!("worker {} finished a task", index));
    }

    shared.log(Level::Debug, format!("worker {} stopped", index));
}
