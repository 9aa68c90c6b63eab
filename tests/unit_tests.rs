#[cfg(test)]
mod tests {
    use workpool::{
        handle::result_channel,
        model::Outcome,
        sink::NullSink,
        task::WorkItem,
        Config,
        Level,
        PoolError,
        TaskError,
        WorkerPool,
    };
    use std::{
        fmt,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc, Arc, Mutex,
        },
        thread,
        time::{Duration, Instant},
    };

    fn quiet_pool(threads: usize) -> WorkerPool {
        WorkerPool::with_sink(Config::default().with_threads(threads), Arc::new(NullSink)).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingSink {
        fn has(&self, level: Level, needle: &str) -> bool {
            self.records
                .lock()
                .unwrap()
                .iter()
                .any(|(l, m)| *l == level && m.contains(needle))
        }
    }

    impl workpool::LogSink for RecordingSink {
        fn log(&self, level: Level, message: &str) {
            self.records.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[derive(Debug, PartialEq)]
    struct ParseFailure(String);

    impl fmt::Display for ParseFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "cannot parse {:?}", self.0)
        }
    }

    impl std::error::Error for ParseFailure {}

    #[test]
    fn test_zero_size_is_rejected() {
        println!("\n=== TEST: Пул нулевого размера ===");
        let result = WorkerPool::with_sink(Config::default().with_threads(0), Arc::new(NullSink));
        assert!(matches!(result, Err(PoolError::InvalidPoolSize)));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        println!("\n=== TEST: Ошибка запуска потока ===");
        // стек такого размера ОС выделить не может
        let config = Config::default().with_threads(2).with_stack_size(1usize << 46);
        let result = WorkerPool::with_sink(config, Arc::new(NullSink));

        match result {
            Err(PoolError::Spawn { index, .. }) => assert_eq!(index, 0),
            Err(e) => panic!("Ожидали Spawn, получили: {:?}", e),
            Ok(_) => panic!("Пул не должен был запуститься"),
        }
    }

    #[test]
    fn test_identity_results() {
        println!("\n=== TEST: 4 воркера, 100 identity-задач ===");
        let pool = quiet_pool(4);

        let handles: Vec<_> = (0..100)
            .map(|i| pool.submit_with(|x: usize| x, (i,)).unwrap())
            .collect();

        let mut results: Vec<usize> = handles.into_iter().map(|h| h.read().unwrap()).collect();
        results.sort_unstable();

        assert_eq!(results, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_fifo_with_single_worker() {
        println!("\n=== TEST: FIFO порядок на одном воркере ===");
        let pool = quiet_pool(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let order = order.clone();
                pool.submit(move || order.lock().unwrap().push(i)).unwrap()
            })
            .collect();

        for handle in handles {
            handle.read().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_second_task_waits_for_first() {
        println!("\n=== TEST: B ждет завершения A на одном воркере ===");
        let pool = quiet_pool(1);
        let a_done = Arc::new(AtomicBool::new(false));

        let start = Instant::now();
        let flag = a_done.clone();
        let a = pool.submit(move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            1
        }).unwrap();
        let flag = a_done.clone();
        let b = pool.submit(move || (flag.load(Ordering::SeqCst), 2)).unwrap();

        let (a_was_done, b_value) = b.read().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(a_was_done, "B не должна стартовать раньше завершения A");
        assert_eq!(b_value, 2);
        assert_eq!(a.read().unwrap(), 1);
    }

    #[test]
    fn test_multiple_arguments_are_bound() {
        let pool = quiet_pool(2);

        let none = pool.submit_with(|| "no args", ()).unwrap();
        let pair = pool.submit_with(|a: i32, b: i32| a * b, (6, 7)).unwrap();
        let owned = pool
            .submit_with(|s: String, n: usize, sep: char| vec![s; n].join(&sep.to_string()), ("ab".to_string(), 3, '-'))
            .unwrap();

        assert_eq!(none.read().unwrap(), "no args");
        assert_eq!(pair.read().unwrap(), 42);
        assert_eq!(owned.read().unwrap(), "ab-ab-ab");
    }

    #[test]
    fn test_arguments_outlive_producer_scope() {
        let pool = quiet_pool(1);

        let handle = {
            let data = vec![1, 2, 3, 4];
            pool.submit_with(|v: Vec<i32>| v.iter().sum::<i32>(), (data,)).unwrap()
        };

        assert_eq!(handle.read().unwrap(), 10);
    }

    #[test]
    fn test_panic_is_captured_and_worker_survives() {
        println!("\n=== TEST: Паника в задаче ===");
        let pool = quiet_pool(1);

        let bad = pool.submit(|| -> i32 { panic!("boom at task 7") }).unwrap();
        let good = pool.submit(|| 5).unwrap();

        match bad.read() {
            Err(TaskError::Panicked(msg)) => assert!(msg.contains("boom at task 7"), "msg: {}", msg),
            other => panic!("Ожидали панику, получили: {:?}", other.map(|_| ())),
        }
        assert_eq!(good.read().unwrap(), 5);

        pool.shutdown();
        let metrics = pool.metrics();
        assert_eq!(metrics.failed_tasks, 1);
        assert_eq!(metrics.completed_tasks, 1);
    }

    #[test]
    fn test_fallible_task_surfaces_same_error() {
        let pool = quiet_pool(2);

        let handle = pool
            .submit_fallible(|| "abc".parse::<u32>().map_err(|_| ParseFailure("abc".into())))
            .unwrap();
        let ok = pool.submit_fallible(|| "12".parse::<u32>()).unwrap();

        let err = handle.read().unwrap_err();
        assert_eq!(err.downcast_ref::<ParseFailure>(), Some(&ParseFailure("abc".into())));
        assert!(err.to_string().contains("cannot parse"));
        assert_eq!(ok.read().unwrap(), 12);
    }

    #[test]
    fn test_try_read_not_ready_then_ready() {
        let pool = quiet_pool(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let blocker = pool.submit(move || release_rx.recv().is_ok()).unwrap();
        let handle = pool.submit(|| 99).unwrap();

        let handle = match handle.try_read() {
            Err(handle) => handle,
            Ok(_) => panic!("Результат не мог быть готов"),
        };
        assert!(!handle.is_ready());

        release_tx.send(()).unwrap();
        assert!(blocker.read().unwrap());
        assert_eq!(handle.read().unwrap(), 99);
    }

    #[test]
    fn test_shared_handle_reads_many_times() {
        let pool = quiet_pool(2);
        let shared = pool.submit(|| "shared".to_string()).unwrap().share();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let h = shared.clone();
                thread::spawn(move || h.read().unwrap())
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), "shared");
        }
        assert_eq!(shared.try_read().unwrap().unwrap(), "shared");
        assert_eq!(shared.read().unwrap(), "shared");
    }

    #[test]
    fn test_dropped_writer_reports_discarded() {
        let (writer, handle) = result_channel::<u8>();
        drop(writer);
        assert!(handle.read().unwrap_err().is_discarded());

        let (writer, handle) = result_channel();
        writer.write(Ok(3u8));
        assert_eq!(handle.try_read().ok().unwrap().unwrap(), 3);
    }

    #[test]
    fn test_awaited_handle_is_no_longer_ready() {
        let pool = quiet_pool(1);
        let mut handle = pool.submit(|| 7).unwrap();

        assert_eq!(futures::executor::block_on(&mut handle).unwrap(), 7);
        assert!(!handle.is_ready());

        let shared = handle.share();
        assert!(!shared.is_ready());
        assert!(shared.try_read().is_none());
        assert!(shared.read().unwrap_err().is_discarded());
    }

    #[test]
    fn test_shutdown_discards_pending_tasks() {
        println!("\n=== TEST: Shutdown с задачами в очереди ===");
        let pool = quiet_pool(1);
        let (started_tx, started_rx) = mpsc::channel();
        let executed = Arc::new(AtomicUsize::new(0));

        let running = pool.submit(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            "finished"
        }).unwrap();
        started_rx.recv().unwrap();

        let pending: Vec<_> = (0..50)
            .map(|_| {
                let executed = executed.clone();
                pool.submit(move || executed.fetch_add(1, Ordering::SeqCst)).unwrap()
            })
            .collect();

        let start = Instant::now();
        let discarded = pool.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));

        assert_eq!(discarded, 50);
        assert_eq!(running.read().unwrap(), "finished");
        assert_eq!(executed.load(Ordering::SeqCst), 0);
        for handle in pending {
            assert!(matches!(handle.read(), Err(TaskError::Discarded)));
        }
        assert_eq!(pool.metrics().discarded_tasks, 50);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_rejects_submissions() {
        let pool = quiet_pool(3);
        assert_eq!(pool.shutdown(), 0);
        assert_eq!(pool.shutdown(), 0);
        assert!(pool.is_shut_down());
        assert!(matches!(pool.submit(|| 1), Err(PoolError::ShutDown)));
        assert_eq!(pool.metrics().total_submitted, 0);
    }

    #[test]
    fn test_drop_waits_for_running_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel();
        {
            let pool = quiet_pool(2);
            let flag = finished.clone();
            pool.submit(move || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(30));
                flag.store(true, Ordering::SeqCst);
            }).unwrap();
            started_rx.recv().unwrap();
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shutdown_from_worker_does_not_deadlock() {
        let pool = Arc::new(quiet_pool(2));
        let inner = pool.clone();

        let handle = pool.submit(move || inner.shutdown()).unwrap();
        assert_eq!(handle.read().unwrap(), 0);

        pool.shutdown();
        assert!(pool.is_shut_down());
    }

    struct CountingItem(Arc<AtomicUsize>);

    impl WorkItem for CountingItem {
        fn execute(self: Box<Self>) -> Outcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            Outcome::Completed
        }
    }

    struct PanickingItem;

    impl WorkItem for PanickingItem {
        fn execute(self: Box<Self>) -> Outcome {
            panic!("custom item failure");
        }
    }

    #[test]
    fn test_custom_work_items() {
        let pool = quiet_pool(1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.enqueue(PanickingItem).unwrap();
        for _ in 0..10 {
            pool.enqueue(CountingItem(counter.clone())).unwrap();
        }
        let last = pool.submit(|| ()).unwrap();
        last.read().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
        pool.shutdown();
        assert_eq!(pool.metrics().failed_tasks, 1);
    }

    #[test]
    fn test_sink_receives_lifecycle_messages() {
        let sink = Arc::new(RecordingSink::default());
        let pool = WorkerPool::with_sink(Config::default().with_threads(2), sink.clone()).unwrap();

        pool.submit(|| 1).unwrap().read().unwrap();
        pool.shutdown();

        assert!(sink.has(Level::Info, "started pool with 2 workers"));
        assert!(sink.has(Level::Debug, "worker 0 started"));
        assert!(sink.has(Level::Trace, "task 0 queued"));
        assert!(sink.has(Level::Debug, "worker 1 stopped"));
        assert!(sink.has(Level::Info, "pool shut down"));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let sink = move |level: Level, _: &str| {
            if level == Level::Info {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        };

        let pool = WorkerPool::with_sink(Config::default().with_threads(1), Arc::new(sink)).unwrap();
        pool.shutdown();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_thread_names_follow_config() {
        let pool = WorkerPool::with_sink(
            Config::default().with_threads(1).with_thread_name_prefix("calc"),
            Arc::new(NullSink),
        ).unwrap();

        let name = pool.submit(|| thread::current().name().map(str::to_string)).unwrap();
        assert_eq!(name.read().unwrap().as_deref(), Some("calc-0"));
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_handle_can_be_awaited() {
        let pool = quiet_pool(2);

        let handle = pool.submit(|| {
            thread::sleep(Duration::from_millis(10));
            "async"
        }).unwrap();

        assert_eq!(handle.await.unwrap(), "async");
    }
}
