//! ward-core - Core Data Types
//!
//! Pure data structures with no behavior beyond construction and
//! rendering. `ward-engine` and `ward-dsl` both depend on this crate;
//! it contains no access-control logic and no I/O.

mod error;
mod identity;
mod principal;
mod right;
mod value;

pub use error::*;
pub use identity::*;
pub use principal::*;
pub use right::*;
pub use value::*;
