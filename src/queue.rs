use super::{
    errors::PoolError,
    task::BoxedWorkItem,
};
use std::{
    collections::VecDeque,
    mem,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};


struct QueueState {
    items: VecDeque<BoxedWorkItem>,
    stopping: bool,
}

/// Неограниченная FIFO-очередь задач.
///
/// Очередь и флаг остановки меняются только под одним мьютексом,
/// с ним же работает condvar, поэтому пробуждения не теряются.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Добавляет задачу в конец и будит одного ожидающего воркера.
    /// Возвращает длину очереди после вставки.
    pub fn push(&self, item: BoxedWorkItem) -> Result<usize, PoolError> {
        let depth = {
            let mut state = self.lock();
            if state.stopping {
                return Err(PoolError::ShutDown);
            }
            state.items.try_reserve(1)?;
            state.items.push_back(item);
            state.items.len()
        };
        self.available.notify_one();
        Ok(depth)
    }

    /// Блокирует до появления задачи. `None` означает остановку:
    /// после нее оставшиеся задачи уже не выдаются.
    pub fn pop(&self) -> Option<BoxedWorkItem> {
        let state = self.lock();
        let mut state = self
            .available
            .wait_while(state, |s| s.items.is_empty() && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);

        if state.stopping {
            return None;
        }
        state.items.pop_front()
    }

    /// Выставляет флаг остановки, будит всех воркеров и отдает
    /// невыполненные задачи. Повторный вызов возвращает пустой список.
    pub fn close(&self) -> Vec<BoxedWorkItem> {
        let pending = {
            let mut state = self.lock();
            if state.stopping {
                return Vec::new();
            }
            state.stopping = true;
            mem::take(&mut state.items)
        };
        self.available.notify_all();
        pending.into()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().stopping
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}
