/// SkyLens Identity Core
///
/// Identity resolution and batching for the SkyLens ATProto social-graph
/// inspector: turns a user-supplied handle-or-DID string into a resolved
/// account profile via a chain of fallback network lookups, request
/// de-duplication, time-windowed batch coalescing, and a shared result cache.
///
/// The UI layer consumes two surfaces: [`IdentityResolver::resolve`] for
/// lookups, and the pure conversion functions in [`identifier`] for building
/// display links and copy-to-clipboard values.

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod identifier;
pub mod profile;
pub mod resolver;
pub mod transport;

pub use config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use identifier::Identifier;
pub use profile::{Label, ResolvedProfile};
pub use resolver::{HandleResolver, IdentityResolver};
pub use transport::{HttpTransport, IdentityTransport};
