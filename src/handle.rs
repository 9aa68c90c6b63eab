use super::errors::{TaskError, TaskResult};
use std::{
    future::Future,
    mem,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};
use crossbeam::utils::Backoff;
use futures::task::AtomicWaker;


enum SlotState<T> {
    Pending,
    Ready(TaskResult<T>),
    Taken,
}

/// Общая ячейка между writer'ом (воркер) и reader'ами (продюсер)
struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: AtomicBool,
    fulfilled: Condvar,
    waker: AtomicWaker,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: AtomicBool::new(false),
            fulfilled: Condvar::new(),
            waker: AtomicWaker::new(),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Повторная запись не перезаписывает результат.
    fn fulfill(&self, result: TaskResult<T>) -> Result<(), TaskResult<T>> {
        {
            let mut state = self.lock();
            if !matches!(*state, SlotState::Pending) {
                return Err(result);
            }
            *state = SlotState::Ready(result);
            self.ready.store(true, Ordering::Release);
        }
        self.fulfilled.notify_all();
        self.waker.wake();
        Ok(())
    }

    #[inline]
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    // Короткий спин перед парковкой на condvar
    fn spin_until_ready(&self) {
        let backoff = Backoff::new();
        while !self.is_ready() && !backoff.is_completed() {
            backoff.snooze();
        }
    }

    fn wait_ready(&self) -> MutexGuard<'_, SlotState<T>> {
        self.spin_until_ready();
        let state = self.lock();
        self.fulfilled
            .wait_while(state, |s| matches!(s, SlotState::Pending))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Забирает результат; после этого слот больше не считается готовым
    fn take_ready(&self, state: &mut SlotState<T>) -> Option<TaskResult<T>> {
        match mem::replace(state, SlotState::Taken) {
            SlotState::Ready(result) => {
                self.ready.store(false, Ordering::Release);
                Some(result)
            }
            other => {
                *state = other;
                None
            }
        }
    }
}


/// Создает связанную пару writer/handle для одной задачи
pub fn result_channel<T>() -> (ResultWriter<T>, ResultHandle<T>) {
    let slot = Arc::new(Slot::new());
    (
        ResultWriter { slot: Some(slot.clone()) },
        ResultHandle { slot },
    )
}


/// Сторона воркера. Записывает результат ровно один раз:
/// `write` потребляет writer, а drop без записи отдает reader'ам
/// [`TaskError::Discarded`], чтобы ожидание не зависло навсегда.
pub struct ResultWriter<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> ResultWriter<T> {
    pub fn write(mut self, result: TaskResult<T>) {
        if let Some(slot) = self.slot.take() {
            let rejected = slot.fulfill(result).is_err();
            debug_assert!(!rejected, "result handle fulfilled twice");
        }
    }
}

impl<T> Drop for ResultWriter<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let _ = slot.fulfill(Err(TaskError::Discarded));
        }
    }
}


/// Handle на результат задачи.
///
/// Поддерживает блокирующее чтение ([`read`](Self::read)), неблокирующую
/// попытку ([`try_read`](Self::try_read)) и `.await` из async-кода.
/// Для чтения несколькими потребителями используйте [`share`](Self::share).
pub struct ResultHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> ResultHandle<T> {
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// Блокирует до выполнения задачи и забирает результат
    pub fn read(self) -> TaskResult<T> {
        let mut state = self.slot.wait_ready();
        self.slot.take_ready(&mut state).unwrap_or(Err(TaskError::Discarded))
    }

    /// Возвращает handle обратно, если результат еще не готов
    pub fn try_read(self) -> Result<TaskResult<T>, Self> {
        if !self.slot.is_ready() {
            return Err(self);
        }
        let taken = self.slot.take_ready(&mut self.slot.lock());
        match taken {
            Some(result) => Ok(result),
            None => Err(self),
        }
    }

    /// Если результат уже забран через `.await`, shared-handle
    /// не будет готов, а `read` вернет [`TaskError::Discarded`].
    pub fn share(self) -> SharedHandle<T>
    where
        T: Clone,
    {
        SharedHandle { slot: self.slot }
    }
}

impl<T> Future for ResultHandle<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.slot.take_ready(&mut this.slot.lock()) {
            return Poll::Ready(result);
        }
        this.slot.waker.register(cx.waker());
        match this.slot.take_ready(&mut this.slot.lock()) {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}


/// Клонируемый handle: каждый reader получает копию результата
pub struct SharedHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Clone> SharedHandle<T> {
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    pub fn read(&self) -> TaskResult<T> {
        match &*self.slot.wait_ready() {
            SlotState::Ready(result) => result.clone(),
            _ => Err(TaskError::Discarded),
        }
    }

    /// `None`, пока задача не выполнена
    pub fn try_read(&self) -> Option<TaskResult<T>> {
        if !self.slot.is_ready() {
            return None;
        }
        match &*self.slot.lock() {
            SlotState::Ready(result) => Some(result.clone()),
            _ => None,
        }
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        Self { slot: self.slot.clone() }
    }
}
