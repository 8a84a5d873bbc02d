
pub mod bch;
pub mod freq_sync;
pub mod gf;
pub mod plframe;
pub mod tracing_init;

pub use bch::{BchCode, BchDecoder, BchEncoder, DecodeOutcome};
pub use freq_sync::{FreqSync, FINE_FOFFSET_CEIL};
