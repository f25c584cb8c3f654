//! Bounded cache of compiled value programs
//!
//! Servers rotate through a handful of value strings, so compiled programs
//! are memoised by their canonical text. When an insert pushes the cache over its
//! capacity the oldest entries are dropped by a background worker fed
//! through a work queue; the inserting caller never waits for it.

use super::formula::ValueProgram;
use super::program::CompiledProgram;
use crate::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<CompiledProgram>>,
    order: VecDeque<String>,
}

impl CacheState {
    fn evict_over(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                log::debug!("Evicted compiled formula '{}'", oldest);
            }
        }
    }
}

enum Job {
    Evict,
    Flush(Sender<()>),
}

/// Thread-safe formula cache with asynchronous oldest-first eviction
#[derive(Debug)]
pub struct FormulaCache {
    state: Arc<Mutex<CacheState>>,
    capacity: usize,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl FormulaCache {
    /// Create a cache holding at most `capacity` programs once evictions settle
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let state = Arc::new(Mutex::new(CacheState::default()));
        let (tx, rx) = mpsc::channel::<Job>();

        let worker_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name("formula-cache-evict".into())
            .spawn(move || {
                for job in rx {
                    match job {
                        Job::Evict => worker_state.lock().evict_over(capacity),
                        Job::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            });

        let (jobs, worker) = match spawned {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                log::warn!("Could not start eviction worker, evicting inline: {}", e);
                (None, None)
            }
        };

        FormulaCache {
            state,
            capacity,
            jobs,
            worker,
        }
    }

    /// Return the compiled program for `text`, compiling it on a miss
    ///
    /// Entries are keyed by the canonical form of the program, so different
    /// spellings of one value string share an entry.
    pub fn get_or_compile(&self, text: &str) -> Result<Arc<CompiledProgram>> {
        let text = text.trim();

        // Server value strings are usually already canonical
        if let Some(program) = self.state.lock().entries.get(text) {
            log::debug!("Formula cache hit for '{}'", text);
            return Ok(Arc::clone(program));
        }

        let program = ValueProgram::parse(text)?;
        let key = program.to_string();
        if key != text {
            if let Some(existing) = self.state.lock().entries.get(&key) {
                log::debug!("Formula cache hit for '{}' as '{}'", text, key);
                return Ok(Arc::clone(existing));
            }
        }

        log::debug!("Formula cache miss for '{}'", key);
        let compiled = Arc::new(CompiledProgram::compile(&program));

        let over_capacity = {
            let mut state = self.state.lock();
            // Another caller may have compiled the same program meanwhile
            if let Some(existing) = state.entries.get(&key) {
                return Ok(Arc::clone(existing));
            }
            state.entries.insert(key.clone(), Arc::clone(&compiled));
            state.order.push_back(key);
            state.entries.len() > self.capacity
        };

        if over_capacity {
            self.schedule_eviction();
        }

        Ok(compiled)
    }

    fn schedule_eviction(&self) {
        let sent = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(Job::Evict).is_ok())
            .unwrap_or(false);
        if !sent {
            self.state.lock().evict_over(self.capacity);
        }
    }

    /// Wait until every eviction queued so far has been applied
    pub fn flush(&self) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        if jobs.send(Job::Flush(tx)).is_ok() {
            let _ = rx.recv();
        }
    }

    /// Whether a program for `text` is resident
    pub fn contains(&self, text: &str) -> bool {
        match ValueProgram::parse(text) {
            Ok(program) => self.state.lock().entries.contains_key(&program.to_string()),
            Err(_) => false,
        }
    }

    /// Number of resident programs
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity the cache is trimmed back to
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every resident program
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}

impl Drop for FormulaCache {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
