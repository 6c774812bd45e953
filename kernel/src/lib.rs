//! `slug-kernel`: a capability-secured actor microkernel hosting the slug
//! language toolchain's scripting services (lexer, parser, evaluator,
//! module loader, REPL) as isolated, policy-checked actors.
//!
//! Structured the way the teacher's `airssys-rt` lays out its actor
//! runtime: small, single-purpose modules for identity, rights, errors,
//! wire messages, mailboxes, capabilities, policy, actor records, the
//! name registry, single-shot futures, and finally the kernel that ties
//! them together.

pub mod actor;
pub mod capability;
pub mod config;
pub mod error;
pub mod future;
pub mod id;
pub mod kernel;
pub mod mailbox;
pub mod message;
pub mod policy;
pub mod prelude;
pub mod registry;
pub mod rights;

pub use actor::{ActorContext, ActorState, ControlSignal, Handler, HandlerFactory};
pub use capability::{Capability, CapabilityId, Scope};
pub use config::KernelConfig;
pub use error::KernelError;
pub use future::Future;
pub use id::ActorId;
pub use kernel::Kernel;
pub use message::Message;
pub use policy::OperationMap;
pub use rights::Rights;
