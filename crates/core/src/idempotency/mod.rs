//! Idempotency tokens.
//!
//! A caller may attach an opaque token to any processing request. The first
//! request bearing a token creates an entry and records its response; every
//! later request with the same token receives that response verbatim and has
//! no ledger effect, whatever its body says.

mod guard;
mod record;

pub use guard::IdempotencyGuard;
pub use record::{CREATED, IdempotencyRecord};
