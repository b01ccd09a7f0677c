//! Container instance model
//!
//! Record types, the string codec used against the backend, the key schema
//! and the validation helpers. Nothing in here holds state.

mod codec;
mod keys;
mod record;
mod validation;


pub use codec::*;
pub use keys::*;
pub use record::ContainerInstance;
pub use record::InstanceDetail;
pub use record::UNVERSIONED_SENTINEL;
pub use validation::*;
