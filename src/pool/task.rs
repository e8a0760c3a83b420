//! Tasks and their one-shot completion handles

use std::mem;
use std::sync::{Arc, Condvar, Mutex};

use error::{RenderError, RenderResult};

/// A unit of work runnable on the pool. The argument is the id of the
/// worker the task ends up running on.
pub type Task<T> = Box<dyn FnOnce(u32) -> T + Send + 'static>;

/// Creates a task from a function which takes no arguments, ignoring the
/// worker id.
pub fn make_task<T, F>(f: F) -> Task<T> where F: FnOnce() -> T + Send + 'static {
    Box::new(move |_| f())
}

enum State<T> {
    Pending,
    Ready(T),
    Broken,
    Taken,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    done: Condvar,
}

/// Write half of a one-shot channel between a task and whoever submitted
/// it. Dropping the promise without setting a value breaks the paired
/// handle, which is how waiters learn their task was discarded at pool
/// shutdown.
pub struct TaskPromise<T> {
    shared: Arc<Shared<T>>,
    fulfilled: bool,
}

impl<T> TaskPromise<T> {
    /// Deliver the task's result, waking every waiter.
    pub fn set(mut self, value: T) {
        self.fulfilled = true;

        let mut state = self.shared.state.lock().unwrap();
        *state = State::Ready(value);
        self.shared.done.notify_all();
    }
}

impl<T> Drop for TaskPromise<T> {
    fn drop(&mut self) {
        if self.fulfilled {
            return;
        }

        let mut state = self.shared.state.lock().unwrap();
        if let State::Pending = *state {
            *state = State::Broken;
            self.shared.done.notify_all();
        }
    }
}

/// Read half of the one-shot channel; the "future" of a submitted task.
pub struct TaskHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has either delivered a result or been
    /// abandoned.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while let State::Pending = *state {
            state = self.shared.done.wait(state).unwrap();
        }
    }

    /// Block until the task completes and take its result. Fails with
    /// `TaskFailed` if the task was discarded before it could run.
    pub fn get(self) -> RenderResult<T> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            match mem::replace(&mut *state, State::Taken) {
                State::Ready(value) => return Ok(value),
                State::Broken | State::Taken => return Err(RenderError::TaskFailed),
                State::Pending => {
                    *state = State::Pending;
                    state = self.shared.done.wait(state).unwrap();
                }
            }
        }
    }
}

/// Creates a connected promise/handle pair for one task result.
pub fn task_promise<T>() -> (TaskPromise<T>, TaskHandle<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending),
        done: Condvar::new(),
    });

    let promise = TaskPromise {
        shared: shared.clone(),
        fulfilled: false,
    };

    (promise, TaskHandle { shared })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use error::RenderError;

    #[test]
    fn handle_receives_value_across_threads() {
        let (promise, handle) = task_promise();

        let worker = thread::spawn(move || promise.set(42));

        assert_eq!(handle.get().unwrap(), 42);
        worker.join().unwrap();
    }

    #[test]
    fn dropped_promise_breaks_the_handle() {
        let (promise, handle) = task_promise::<u32>();
        drop(promise);

        assert_eq!(handle.get(), Err(RenderError::TaskFailed));
    }

    #[test]
    fn wait_returns_once_fulfilled() {
        let (promise, handle) = task_promise();
        promise.set(1u32);

        handle.wait();
        assert_eq!(handle.get().unwrap(), 1);
    }
}
