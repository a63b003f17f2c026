//! In-process scheduler simulator.
//!
//! Implements [`HookRegistry`] with a single extension slot, the way a small
//! RTOS exposes one user extension table, and drives whatever hooks are
//! installed from a workload thread that round-robins a handful of synthetic
//! tasks through switch/begin/exit transitions. This is the host used by the
//! `schedtrace` binary and the integration tests; a real deployment would
//! implement [`HookRegistry`] over the actual scheduler's extension API.

use super::{HookRegistry, RegistryError, SchedulerHooks};
use crate::domain::{TaskContext, TaskId};
use log::debug;
use schedtrace_common::{
    STATE_DELAYING, STATE_WAITING_FOR_EVENT, STATE_WAITING_FOR_MESSAGE,
    STATE_WAITING_FOR_SEMAPHORE,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

struct Registration {
    name: String,
    hooks: Arc<dyn SchedulerHooks>,
}

/// A host scheduler with one extension slot and a synthetic workload.
#[derive(Clone, Default)]
pub struct SimScheduler {
    slot: Arc<Mutex<Option<Registration>>>,
}

impl SimScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently installed hooks, if any.
    fn hooks(&self) -> Option<Arc<dyn SchedulerHooks>> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|r| Arc::clone(&r.hooks))
    }

    /// Spawn a workload thread that emits one transition roughly every
    /// `pace`, cycling `tasks` synthetic tasks. Returns a handle that stops
    /// the thread and reports how many upcalls were driven.
    #[must_use]
    pub fn spawn_workload(&self, tasks: u32, pace: Duration) -> WorkloadHandle {
        let tasks = tasks.max(2);
        let stop = Arc::new(AtomicBool::new(false));
        let driven = Arc::new(AtomicU64::new(0));
        let host = self.clone();
        let stop_flag = Arc::clone(&stop);
        let driven_count = Arc::clone(&driven);

        let handle = std::thread::spawn(move || {
            let mut rng = Xorshift::new(0x5eed_5eed);
            let mut current = TaskId(1);

            // Every task begins once before it can be switched to.
            if let Some(hooks) = host.hooks() {
                for id in 1..=tasks {
                    hooks.on_begin(TaskId(id), TaskContext::ready(priority_for(id)));
                    driven_count.fetch_add(1, Ordering::Relaxed);
                }
            }

            while !stop_flag.load(Ordering::Acquire) {
                if let Some(hooks) = host.hooks() {
                    let next = TaskId(1 + rng.next_below(tasks));
                    if next != current {
                        hooks.on_switch(current, next, context_for(&mut rng, next));
                        driven_count.fetch_add(1, Ordering::Relaxed);
                        current = next;
                    }
                } else {
                    debug!("workload idle: no hooks installed");
                }
                std::thread::sleep(pace);
            }

            if let Some(hooks) = host.hooks() {
                for id in 1..=tasks {
                    hooks.on_exit(TaskId(id), TaskContext::ready(priority_for(id)));
                    driven_count.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        WorkloadHandle { stop, driven, handle }
    }
}

impl HookRegistry for SimScheduler {
    fn register(&self, name: &str, hooks: Arc<dyn SchedulerHooks>) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) if existing.name == name => {
                Err(RegistryError::AlreadyRegistered(name.to_string()))
            }
            Some(_) => Err(RegistryError::TooManyRegistrations),
            None => {
                *slot = Some(Registration { name: name.to_string(), hooks });
                Ok(())
            }
        }
    }

    fn deregister(&self, name: &str) -> Result<(), RegistryError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) if existing.name == name => {
                *slot = None;
                Ok(())
            }
            _ => Err(RegistryError::InvalidName(name.to_string())),
        }
    }
}

/// Stops the workload thread on demand.
pub struct WorkloadHandle {
    stop: Arc<AtomicBool>,
    driven: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl WorkloadHandle {
    /// Signal the thread, wait for it, and return the number of upcalls driven.
    pub fn stop(self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.handle.join().ok();
        self.driven.load(Ordering::Acquire)
    }

    /// Upcalls driven so far, without stopping.
    #[must_use]
    pub fn driven(&self) -> u64 {
        self.driven.load(Ordering::Acquire)
    }
}

fn priority_for(id: u32) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let p = 100 + (id % 32) as u8;
    p
}

/// What the incoming task looks like to the scheduler. Mostly ready; a slice
/// of transitions show a wait condition so state decoding gets exercised.
fn context_for(rng: &mut Xorshift, task: TaskId) -> TaskContext {
    let prio = priority_for(task.0);
    match rng.next_below(8) {
        0 => TaskContext::waiting(STATE_WAITING_FOR_SEMAPHORE, 0x1a01_0000 | task.0, prio),
        1 => TaskContext::waiting(STATE_WAITING_FOR_MESSAGE, 0x2201_0000 | task.0, prio),
        2 => TaskContext::waiting(STATE_WAITING_FOR_EVENT, 0, prio),
        3 => TaskContext::waiting(STATE_DELAYING, 0, prio),
        _ => TaskContext::ready(prio),
    }
}

/// Tiny deterministic PRNG; good enough to vary synthetic transitions.
struct Xorshift(u64);

impl Xorshift {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_below(&mut self, bound: u32) -> u32 {
        (self.next() % u64::from(bound)) as u32
    }
}
