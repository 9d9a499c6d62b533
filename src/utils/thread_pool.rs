/*
** Copyright (C) 2026 Sylvain Fargier
**
** This software is provided 'as-is', without any express or implied
** warranty.  In no event will the authors be held liable for any damages
** arising from the use of this software.
**
** Permission is granted to anyone to use this software for any purpose,
** including commercial applications, and to alter it and redistribute it
** freely, subject to the following restrictions:
**
** 1. The origin of this software must not be misrepresented; you must not
**    claim that you wrote the original software. If you use this software
**    in a product, an acknowledgment in the product documentation would be
**    appreciated but is not required.
** 2. Altered source versions must be plainly marked as such, and must not be
**    misrepresented as being the original software.
** 3. This notice may not be removed or altered from any source distribution.
**
** Created on: 2026-10-19T13:02:11
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Context, Result};
use std::{
    collections::VecDeque,
    ops::Deref,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed size pool of worker threads
///
/// Workers are joined when the pool is dropped, pending tasks are run first.
pub struct ThreadPool {
    core: Arc<ThreadPoolCore>,
    workers: Vec<Worker>,
}

impl Deref for ThreadPool {
    type Target = Arc<ThreadPoolCore>;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl ThreadPool {
    #[tracing::instrument()]
    pub fn new(num_threads: usize) -> Result<ThreadPool> {
        let core = Arc::new(ThreadPoolCore {
            running: AtomicBool::new(true),
            cond: Condvar::new(),
            queue: Mutex::new(VecDeque::new()),
        });
        let mut workers = Vec::with_capacity(num_threads);
        for id in 1..=num_threads {
            workers.push(Worker::new(id, Arc::clone(&core))?);
            tracing::trace!(id, "worker created");
        }
        Ok(ThreadPool { core, workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    #[tracing::instrument(skip(self))]
    pub fn join(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        {
            let _guard = self.queue();
            self.cond.notify_all();
        }
        self.workers.clear();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();
    }
}

pub struct ThreadPoolCore {
    running: AtomicBool,
    cond: Condvar,
    queue: Mutex<VecDeque<Task>>,
}

impl ThreadPoolCore {
    /// Queue a task, returns `false` once the pool is stopped
    #[tracing::instrument(level = "TRACE", skip(self, fun))]
    pub fn spawn<T>(&self, fun: T) -> bool
    where
        T: FnOnce() + Send + 'static,
    {
        if !self.running.load(Ordering::Relaxed) {
            tracing::error!("thread pool stopped, not spawning");
            return false;
        }
        self.queue().push_back(Box::new(fun));
        self.cond.notify_one();
        true
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Worker(Option<JoinHandle<()>>);

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            if let Err(error) = handle.join() {
                tracing::error!(?error, "worker error");
            }
            tracing::trace!("worker thread joined");
        }
    }
}

impl Worker {
    fn new(id: usize, core: Arc<ThreadPoolCore>) -> Result<Worker> {
        let join_handle = std::thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || {
                tracing::trace!(id, "worker thread enter");
                let mut guard = core.queue();
                loop {
                    match guard.pop_front() {
                        Some(task) => {
                            drop(guard);
                            if let Err(error) = std::panic::catch_unwind(AssertUnwindSafe(task)) {
                                tracing::warn!(id, ?error, "worker task panicked");
                            }
                            guard = core.queue();
                        }
                        None => {
                            if !core.running.load(Ordering::Relaxed) {
                                break;
                            }
                            guard = core
                                .cond
                                .wait(guard)
                                .unwrap_or_else(PoisonError::into_inner);
                        }
                    }
                }
                tracing::trace!(id, "worker thread exit");
            })
            .context("failed to spawn worker thread")?;
        Ok(Worker(Some(join_handle)))
    }
}
