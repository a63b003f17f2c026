//! Host scheduler collaborator contracts.
//!
//! The capture engine never talks to a scheduler directly; it installs three
//! callbacks through a [`HookRegistry`] and the host invokes them on every
//! task transition. [`SimScheduler`] is the in-process stand-in used by the
//! demo binary and the tests.

pub mod sim;

use crate::domain::{TaskContext, TaskId};
use std::sync::Arc;
use thiserror::Error;

pub use sim::{SimScheduler, WorkloadHandle};

/// The three producer entry points, invoked synchronously by the host at the
/// moment of the corresponding transition.
///
/// Contract for implementors of the host side: upcalls for one scheduler are
/// serialized. Contract for implementors of the hooks: return promptly and
/// never block — there is no room for an error return in this path.
pub trait SchedulerHooks: Send + Sync {
    /// `from` is being switched out, `to` switched in; `ctx` describes `to`.
    fn on_switch(&self, from: TaskId, to: TaskId, ctx: TaskContext);

    /// `task` starts executing for the first time.
    fn on_begin(&self, task: TaskId, ctx: TaskContext);

    /// `task` exits.
    fn on_exit(&self, task: TaskId, ctx: TaskContext);
}

/// Host outcomes for hook (de)registration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("an extension table named \"{0}\" is already installed")]
    AlreadyRegistered(String),

    #[error("host extension slots exhausted")]
    TooManyRegistrations,

    #[error("invalid extension name \"{0}\"")]
    InvalidName(String),
}

/// Registration surface the host scheduler exposes to the engine.
///
/// Registrations are identified by a fixed name so a host can refuse a
/// duplicate install of the same extension.
pub trait HookRegistry: Send + Sync {
    /// Install `hooks` under `name`.
    fn register(&self, name: &str, hooks: Arc<dyn SchedulerHooks>) -> Result<(), RegistryError>;

    /// Remove the registration installed under `name`.
    fn deregister(&self, name: &str) -> Result<(), RegistryError>;
}
