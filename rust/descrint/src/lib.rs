//! Quantized descriptor codec.
//!
//! A descriptor of `size` floats is stored as a 16-byte [`header::DescrHeader`]
//! followed by `size` codes of `depth` bits each (4 to 8), packed eight at a
//! time. Cosine distances are computed on the packed form: only the integer
//! correlation of the codes is evaluated per pair, the rest comes from the
//! headers.
//!
//! [`DescrInt`] binds a (size, depth) pair to the best backend of the running
//! CPU and exposes every operation.

pub mod backend;
pub mod bitpack;
pub mod config;
pub mod correlate;
pub mod decode;
pub mod depth;
pub mod encode;
pub mod engine;
pub mod error;
pub mod header;
pub mod mxn;
pub mod unpack;

pub use backend::{Backend, BackendProfile, CacheBudget, MicroTile};
pub use config::EngineConfig;
pub use depth::Depth;
pub use engine::{DescrInt, MAX_SIZE};
pub use error::EngineError;
pub use header::{DescrHeader, HEADER_SIZE};
pub use mxn::MacroPolicy;
