//! quadmap-encode: turning records into graph mutations.
//!
//! Descriptors are resolved once per record type and cached; encoding a
//! record then yields the set and delete quads for an insert or update.

pub mod blank;
pub mod codec;
pub mod encoder;
pub mod facet;
pub mod password;
pub mod resolver;

pub use blank::{BlankNodeGenerator, CounterBlankNodes, UuidBlankNodes};
pub use encoder::{Encoded, Encoder, MutationMode};
pub use facet::encode_facet;
pub use password::{BcryptHasher, HashError, PasswordHasher};
pub use resolver::{resolve, DescriptorCache, ResolvedType};
