use super::{
    errors::{TaskError, TaskResult},
    handle::ResultWriter,
    model::Outcome,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};


/// Единица отложенной работы, которую хранит очередь.
///
/// Воркер вызывает `execute` ровно один раз; реализация сама отвечает за
/// доставку результата и не должна паниковать наружу.
pub trait WorkItem: Send + 'static {
    fn execute(self: Box<Self>) -> Outcome;
}

pub type BoxedWorkItem = Box<dyn WorkItem>;


/// Замыкание вместе с writer'ом его результата
pub struct BoundTask<F, T> {
    func: F,
    writer: ResultWriter<T>,
}

impl<F, T> BoundTask<F, T>
where
    F: FnOnce() -> TaskResult<T> + Send + 'static,
    T: Send + 'static,
{
    pub fn new(func: F, writer: ResultWriter<T>) -> Self {
        Self { func, writer }
    }
}

impl<F, T> WorkItem for BoundTask<F, T>
where
    F: FnOnce() -> TaskResult<T> + Send + 'static,
    T: Send + 'static,
{
    fn execute(self: Box<Self>) -> Outcome {
        let BoundTask { func, writer } = *self;
        let result = panic::catch_unwind(AssertUnwindSafe(func))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));

        let outcome = if result.is_ok() { Outcome::Completed } else { Outcome::Failed };
        writer.write(result);
        outcome
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}


/// Вызываемое значение с набором аргументов, упакованных в кортеж.
/// Реализовано для `FnOnce` арности 0..=6: `pool.submit_with(f, (a, b))`.
pub trait Callable<Args>: Send + 'static {
    type Output;

    fn call_with(self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Callable<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Ret + Send + 'static,
        {
            type Output = Ret;

            #[inline]
            #[allow(non_snake_case)]
            fn call_with(self, ($($arg,)*): ($($arg,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);
