// rsfec - systematic Reed-Solomon forward error correction over GF(2^m).
//
// This library contains the finite-field table and bulk-multiply layer,
// dense linear algebra over the field, and the codec layer that ties
// both into a systematic MDS erasure code: any k of the n encoded
// symbols recover the k source symbols.

pub mod codec;
pub mod error;
pub mod gf;
pub mod simd;

mod matrix;

pub use codec::{Codec, Codec16, Codec8};
pub use error::FecError;
pub use gf::{init, GfElement, GfTables};
pub use simd::SimdMode;

use simd::FeatureDetector;

/// Provides global access to detected CPU features.
pub fn cpu_features() -> &'static FeatureDetector {
    FeatureDetector::instance()
}
