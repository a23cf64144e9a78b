// Copyright (c) 2025, The rsfec Project Authors.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
//       notice, this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above
//       copyright notice, this list of conditions and the following disclaimer
//       in the documentation and/or other materials provided with the
//       distribution.
//
//     * Neither the name of the copyright holder nor the names of its
//       contributors may be used to endorse or promote products derived from
//       this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! # SIMD selection
//!
//! Runtime CPU feature detection and the knob that selects between the
//! split-table kernels and the plain table-lookup loops. Detection runs
//! once per process; everything downstream consumes the cached result.

use log::debug;
use once_cell::sync::Lazy;

#[cfg(target_arch = "aarch64")]
use std::arch::is_aarch64_feature_detected;
#[cfg(target_arch = "x86_64")]
use std::arch::is_x86_feature_detected;

/// CPU features relevant to the bulk-multiply kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuFeature {
    /// x86-64 SSSE3, for the 16-byte `pshufb` nibble lookups.
    Ssse3,
    /// AArch64 NEON, for the `tbl` equivalent of the same technique.
    Neon,
}

/// Singleton holding the detected CPU features.
///
/// Detection is performed exactly once; the first caller pays for it.
#[derive(Debug)]
pub struct FeatureDetector {
    ssse3: bool,
    neon: bool,
}

static DETECTOR: Lazy<FeatureDetector> = Lazy::new(FeatureDetector::detect);

impl FeatureDetector {
    fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        let ssse3 = is_x86_feature_detected!("ssse3");
        #[cfg(not(target_arch = "x86_64"))]
        let ssse3 = false;

        #[cfg(target_arch = "aarch64")]
        let neon = is_aarch64_feature_detected!("neon");
        #[cfg(not(target_arch = "aarch64"))]
        let neon = false;

        debug!("detected CPU features: ssse3={} neon={}", ssse3, neon);
        FeatureDetector { ssse3, neon }
    }

    /// Returns a static reference to the `FeatureDetector` singleton.
    pub fn instance() -> &'static Self {
        &DETECTOR
    }

    /// Checks if a specific CPU feature is supported.
    pub fn has_feature(&self, feature: CpuFeature) -> bool {
        match feature {
            CpuFeature::Ssse3 => self.ssse3,
            CpuFeature::Neon => self.neon,
        }
    }

    /// True when a 16-byte shuffle unit usable by the split-table
    /// kernels is present.
    pub fn shuffle_unit(&self) -> bool {
        self.ssse3 || self.neon
    }
}

/// How a codec resolves the bulk-multiply implementation.
///
/// No observable behavior depends on which variant runs; `Scalar` exists
/// for comparison and for callers that want deterministic code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimdMode {
    /// Use the split-table kernels whenever the CPU supports them and
    /// the field is wider than 8 bits.
    #[default]
    Auto,
    /// Always use the table-lookup loops.
    Scalar,
}
