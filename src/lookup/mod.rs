//! Rate-limited, bounded-concurrency license lookups against pkg.go.dev.
//!
//! - [`rate`]: token bucket gating how fast lookups start.
//! - [`gate`]: semaphore bounding how many lookups are in flight.
//! - [`transport`]: the HTTP seam, pinned to the lookup host.
//! - [`page`]: extraction of license fields from the licenses page.
//! - [`worker`]: one module's fetch-and-extract, always yielding a result.
//! - [`dispatch`]: drives workers over a module list into a [`ResultStream`].

pub mod dispatch;
pub mod gate;
pub mod page;
pub mod rate;
pub mod stream;
pub mod transport;
pub mod worker;

pub use dispatch::Fetcher;
pub use stream::ResultStream;
