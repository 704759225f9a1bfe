use {
    super::super::Client,
    crate::misc::unpoison,
    std::{
        collections::VecDeque,
        sync::{Condvar, Mutex, MutexGuard},
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
};

struct PoolState {
    running: bool,
    generation: u64,
    queue: VecDeque<Client>,
    started: usize,
}

/// State shared by every clone of a server: the run flag, the queue of accepted connections
/// waiting for a worker, the start-up handshake counter and the acceptor thread.
///
/// Every start of the server is a new *generation*. Server threads remember the generation they
/// were started for and treat any other one as a stop, so a thread left over from an earlier run
/// never serves a later one.
///
/// The mutex is only ever held for bookkeeping, never across socket I/O or a handler.
pub(crate) struct ServerComponent {
    pool: Mutex<PoolState>,
    run_cv: Condvar,
    start_cv: Condvar,
    acceptor: Mutex<Option<JoinHandle<()>>>,
}
impl Default for ServerComponent {
    fn default() -> Self {
        Self {
            pool: Mutex::new(PoolState {
                running: false,
                generation: 0,
                queue: VecDeque::new(),
                started: 0,
            }),
            run_cv: Condvar::new(),
            start_cv: Condvar::new(),
            acceptor: Mutex::new(None),
        }
    }
}

impl ServerComponent {
    fn lock(&self) -> MutexGuard<'_, PoolState> { self.pool.lock().unwrap_or_else(unpoison) }

    pub(crate) fn is_running(&self) -> bool { self.lock().running }

    /// Whether `generation` is the one currently running.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let pool = self.lock();
        pool.running && pool.generation == generation
    }

    /// Starts a new generation and returns it. The acceptor of the previous one, if it was never
    /// joined, is waited for first.
    ///
    /// # Panics
    /// If the server is already running.
    pub(crate) fn begin(&self) -> u64 {
        assert!(!self.is_running(), "server is already running");
        if self.join_acceptor().is_err() {
            tracing::warn!("acceptor of the previous run had panicked");
        }
        let mut pool = self.lock();
        assert!(!pool.running, "server is already running");
        pool.running = true;
        pool.generation = pool.generation.wrapping_add(1);
        pool.started = 0;
        pool.generation
    }

    /// Called by every freshly started server thread.
    pub(crate) fn check_in(&self, generation: u64) {
        let mut pool = self.lock();
        if pool.generation != generation {
            return;
        }
        pool.started = pool.started.saturating_add(1);
        drop(pool);
        self.start_cv.notify_all();
    }
    /// Blocks until `count` threads of `generation` have checked in, or until that generation is
    /// no longer running.
    pub(crate) fn wait_started(&self, generation: u64, count: usize) {
        let mut pool = self.lock();
        while pool.running && pool.generation == generation && pool.started < count {
            pool = self.start_cv.wait(pool).unwrap_or_else(unpoison);
        }
    }

    /// Appends a connection to the queue and wakes up one worker. The connection is dropped if
    /// `generation` is no longer running.
    pub(crate) fn push(&self, generation: u64, client: Client) -> bool {
        let mut pool = self.lock();
        if !(pool.running && pool.generation == generation) {
            return false;
        }
        pool.queue.push_back(client);
        drop(pool);
        self.run_cv.notify_one();
        true
    }

    /// Waits for the oldest queued connection. Returns `None` once `generation` has stopped.
    pub(crate) fn next(&self, generation: u64) -> Option<Client> {
        let mut pool = self.lock();
        loop {
            if !(pool.running && pool.generation == generation) {
                return None;
            }
            if let Some(client) = pool.queue.pop_front() {
                return Some(client);
            }
            pool = self.run_cv.wait(pool).unwrap_or_else(unpoison);
        }
    }

    /// Sleeps for `timeout`, waking up early if `generation` stops.
    pub(crate) fn pause(&self, generation: u64, timeout: Duration) {
        let deadline = Instant::now().checked_add(timeout);
        let mut pool = self.lock();
        while pool.running && pool.generation == generation {
            let now = Instant::now();
            let left = match deadline {
                Some(deadline) if deadline > now => deadline.duration_since(now),
                Some(_) => return,
                None => timeout,
            };
            pool = self.run_cv.wait_timeout(pool, left).unwrap_or_else(unpoison).0;
        }
    }

    /// Flips the run flag off, wakes up every waiter and returns the connections that were still
    /// queued.
    pub(crate) fn stop(&self) -> VecDeque<Client> { self.halt(self.lock()) }
    /// Like [`stop`](Self::stop), but only if `generation` is the one running. Used by server
    /// threads that cannot go on.
    pub(crate) fn abandon(&self, generation: u64) {
        let pool = self.lock();
        if !(pool.running && pool.generation == generation) {
            return;
        }
        let discarded = self.halt(pool);
        if !discarded.is_empty() {
            tracing::warn!(count = discarded.len(), "closing queued connections no worker got to");
        }
    }
    fn halt(&self, mut pool: MutexGuard<'_, PoolState>) -> VecDeque<Client> {
        pool.running = false;
        let discarded = std::mem::take(&mut pool.queue);
        drop(pool);
        self.run_cv.notify_all();
        self.start_cv.notify_all();
        discarded
    }

    pub(crate) fn set_acceptor(&self, handle: JoinHandle<()>) {
        *self.acceptor.lock().unwrap_or_else(unpoison) = Some(handle);
    }
    /// Waits for the acceptor thread, if there is one.
    pub(crate) fn join_acceptor(&self) -> thread::Result<()> {
        let handle = self.acceptor.lock().unwrap_or_else(unpoison).take();
        match handle {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
impl ServerComponent {
    pub(crate) fn queue_len(&self) -> usize { self.lock().queue.len() }
}
