//! Reflection over downleveled JavaScript bundles
//!
//! Recovers the declarations a compiler needs from already-compiled code:
//! classes emitted as IIFEs, decorators stored in static properties or
//! `__decorate` calls, constructor parameters, members and module exports.
//! Three hosts answer the same [`ReflectionHost`] questions:
//!
//! - [`EsmReflectionHost`] for ES modules and scripts,
//! - [`UmdReflectionHost`] for files wrapped in the universal module wrapper,
//! - [`DelegatingReflectionHost`] which picks one of the two per file.

mod delegating;
mod dts;
mod error;
mod esm;
pub mod host;
pub mod index;
mod model;
pub mod patterns;
pub mod umd;
mod umd_host;

pub use delegating::DelegatingReflectionHost;
pub use error::ReflectionError;
pub use esm::EsmReflectionHost;
pub use host::ReflectionHost;
pub use model::*;
pub use umd::{parse_wrapper, FactoryBranch, UmdImport, UmdModule};
pub use umd_host::UmdReflectionHost;
