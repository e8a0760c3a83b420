//! Fixed-size worker thread pool
//!
//! Every worker owns two task sources: an external queue other threads
//! submit into, and a local deque only the worker itself ever touches.
//! Tasks submitted from inside the pool can ride the local deque and skip
//! all synchronization, which is what keeps follow-up work (like the
//! rasterizer's bisected triangles) on a warm cache.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use parallel::SharedCell;

pub mod queue;
pub mod task;

pub use self::queue::WorkQueue;
pub use self::task::{make_task, task_promise, Task, TaskHandle, TaskPromise};

/// A task as the workers see it. `Exit` is the poison value that ends a
/// worker's loop at pool shutdown.
enum WorkerTask {
    Run(Box<dyn FnOnce(u32) + Send + 'static>),
    Exit,
}

struct WorkerShared {
    external: WorkQueue<WorkerTask>,
    local: SharedCell<VecDeque<WorkerTask>>,
}

impl WorkerShared {
    fn new() -> WorkerShared {
        WorkerShared {
            external: WorkQueue::new(),
            local: SharedCell::new(VecDeque::new()),
        }
    }

    /// Pops this worker's next task, draining the local deque before
    /// blocking on the external queue.
    ///
    /// Only the owning worker thread may call this.
    fn next_task(&self) -> WorkerTask {
        // Safety: the local deque belongs to the thread running this
        // worker's loop, which is the same thread that can push to it
        // through `submit_task`.
        if let Some(task) = unsafe { (*self.local.get()).pop_front() } {
            return task;
        }

        // A steal pass over the other workers' external queues would go
        // here; round-robin distribution keeps them busy enough without
        // one.
        self.external.dequeue()
    }

    /// Pushes a task onto the local deque.
    ///
    /// Only the owning worker thread may call this.
    fn push_local(&self, task: WorkerTask) {
        // Safety: same single-thread discipline as `next_task`.
        unsafe { (*self.local.get()).push_back(task) }
    }
}

struct Worker {
    shared: Arc<WorkerShared>,
    thread: Option<JoinHandle<()>>,
}

fn worker_loop(shared: &WorkerShared, id: u32, started: TaskPromise<ThreadId>) {
    started.set(thread::current().id());

    loop {
        match shared.next_task() {
            WorkerTask::Run(task) => task(id),
            WorkerTask::Exit => break,
        }
    }
}

/// A pool of worker threads consuming submitted tasks.
///
/// The worker count is fixed at construction. Tasks are non-preemptive
/// and run to completion on whichever worker picked them up; there is no
/// cancellation. Shutdown happens at drop, which poisons every worker and
/// joins it; tasks still queued at that point are discarded and their
/// handles broken.
pub struct ThreadPool {
    workers: Vec<Worker>,
    worker_ids: HashMap<ThreadId, u32>,
    next_worker: AtomicU32,
}

impl ThreadPool {
    /// Creates a new pool with the given number of workers. Returns once
    /// every worker thread is up and registered.
    pub fn new(size: u32) -> ThreadPool {
        assert!(size >= 1, "thread pool must have at least one worker");

        let mut workers = Vec::with_capacity(size as usize);
        let mut started = Vec::with_capacity(size as usize);

        for id in 0..size {
            let shared = Arc::new(WorkerShared::new());
            let (promise, handle) = task_promise();

            let thread_shared = shared.clone();
            let thread = thread::spawn(move || worker_loop(&thread_shared, id, promise));

            workers.push(Worker { shared, thread: Some(thread) });
            started.push(handle);
        }

        let mut worker_ids = HashMap::new();
        for (id, handle) in started.into_iter().enumerate() {
            let thread_id = handle.get().expect("worker thread exited before registering");
            worker_ids.insert(thread_id, id as u32);
        }

        ThreadPool {
            workers,
            worker_ids,
            next_worker: AtomicU32::new(0),
        }
    }

    /// Creates a new pool with the default concurrency.
    pub fn create() -> ThreadPool {
        ThreadPool::new(ThreadPool::default_concurrency())
    }

    /// The default concurrency for a pool: the host's hardware
    /// concurrency, or 4 if that cannot be read.
    pub fn default_concurrency() -> u32 {
        match thread::available_parallelism() {
            Ok(count) => count.get() as u32,
            Err(_) => 4,
        }
    }

    /// Returns the number of workers in this pool.
    pub fn size(&self) -> u32 {
        self.workers.len() as u32
    }

    /// Returns the id of the calling worker, if the caller is running
    /// inside the pool.
    pub fn current_tid(&self) -> Option<u32> {
        self.worker_ids.get(&thread::current().id()).cloned()
    }

    fn next_worker(&self) -> u32 {
        self.next_worker.fetch_add(1, Ordering::AcqRel) % self.size()
    }

    fn package<T>(task: Task<T>) -> (WorkerTask, TaskHandle<T>) where T: Send + 'static {
        let (promise, handle) = task_promise();
        (WorkerTask::Run(Box::new(move |id| promise.set(task(id)))), handle)
    }

    /// Submits a task to the given worker. The worker id must be in
    /// `[0, size)`.
    pub fn submit_task_for<T>(&self, tid: u32, task: Task<T>) -> TaskHandle<T> where T: Send + 'static {
        let (task, handle) = ThreadPool::package(task);
        self.workers[tid as usize].shared.external.enqueue(task);
        handle
    }

    /// Submits a task to the pool.
    ///
    /// If the caller is already running on one of the pool's workers and
    /// `allow_local` is set, the task goes onto that worker's local deque
    /// and is guaranteed to execute on the same worker. Otherwise a worker
    /// is picked by round-robin and the task is submitted externally.
    pub fn submit_task<T>(&self, task: Task<T>, allow_local: bool) -> TaskHandle<T> where T: Send + 'static {
        if allow_local {
            if let Some(tid) = self.current_tid() {
                let (task, handle) = ThreadPool::package(task);
                self.workers[tid as usize].shared.push_local(task);
                return handle;
            }
        }

        self.submit_task_for(self.next_worker(), task)
    }

    /// Convenience method to submit a batch of tasks, spreading them over
    /// the workers.
    ///
    /// When called from inside the pool the first task lands on the
    /// calling worker's local deque, biasing the batch towards the queue
    /// with no synchronization overhead.
    pub fn submit_all<T>(&self, tasks: Vec<Task<T>>) -> Vec<TaskHandle<T>> where T: Send + 'static {
        let mut handles = Vec::with_capacity(tasks.len());

        if let Some(current) = self.current_tid() {
            let mut tid = current;
            for task in tasks {
                handles.push(self.submit_task(task, tid == current));
                tid = (tid + 1) % self.size();
            }
        } else {
            for task in tasks {
                handles.push(self.submit_task(task, false));
            }
        }

        handles
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for worker in self.workers.iter_mut() {
            worker.shared.external.enqueue(WorkerTask::Exit);

            if let Some(thread) = worker.thread.take() {
                // A worker that panicked already broke its tasks' handles;
                // nothing useful to do with the error here.
                let _ = thread.join();
            }
        }
    }
}
