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

//! # Galois field arithmetic over GF(2^m), 2 <= m <= 16
//!
//! Addition is XOR; multiplication is polynomial multiplication modulo a
//! fixed primitive polynomial. Every operation runs on lookup tables that
//! are a pure function of the field width `m` and are built once per
//! process behind a one-shot cell: concurrent callers racing on the first
//! use all observe fully constructed tables.

pub mod addmul;
pub mod tables;

use once_cell::sync::OnceCell;
use std::fmt;

use crate::error::FecError;

/// Smallest supported field width.
pub const MIN_GF_BITS: u32 = 2;
/// Largest supported field width.
pub const MAX_GF_BITS: u32 = 16;

/// Primitive polynomials for GF(2^m), indexed by m; bit i is the
/// coefficient of x^i (Lin & Costello, Appendix A).
pub const PRIMITIVE_POLY: [u32; 17] = [
    0x00000, // no code
    0x00000, // no code
    0x00007, // 1+x+x^2
    0x0000b, // 1+x+x^3
    0x00013, // 1+x+x^4
    0x00025, // 1+x^2+x^5
    0x00043, // 1+x+x^6
    0x00089, // 1+x^3+x^7
    0x0011d, // 1+x^2+x^3+x^4+x^8
    0x00211, // 1+x^4+x^9
    0x00409, // 1+x^3+x^10
    0x00805, // 1+x^2+x^11
    0x01053, // 1+x+x^4+x^6+x^12
    0x0201b, // 1+x+x^3+x^4+x^13
    0x04443, // 1+x+x^6+x^10+x^14
    0x08003, // 1+x+x^15
    0x1100b, // 1+x+x^3+x^12+x^16
];

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Storage type of one field element: `u8` for m <= 8, `u16` above.
///
/// The trait is sealed; symbols are plain slices of the element type and
/// carry no header or framing of their own.
pub trait GfElement:
    Copy + Default + Eq + fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// Narrowest field stored in this type.
    const MIN_BITS: u32;
    /// Widest field this type can hold.
    const MAX_BITS: u32;

    fn from_word(w: u16) -> Self;
    fn word(self) -> u16;

    #[doc(hidden)]
    fn addmul(tables: &GfTables, dst: &mut [Self], src: &[Self], c: u16, simd: bool);
}

impl GfElement for u8 {
    const MIN_BITS: u32 = 2;
    const MAX_BITS: u32 = 8;

    #[inline]
    fn from_word(w: u16) -> Self {
        w as u8
    }

    #[inline]
    fn word(self) -> u16 {
        self as u16
    }

    fn addmul(tables: &GfTables, dst: &mut [u8], src: &[u8], c: u16, _simd: bool) {
        tables.addmul_u8(dst, src, c);
    }
}

impl GfElement for u16 {
    const MIN_BITS: u32 = 9;
    const MAX_BITS: u32 = 16;

    #[inline]
    fn from_word(w: u16) -> Self {
        w
    }

    #[inline]
    fn word(self) -> u16 {
        self
    }

    fn addmul(tables: &GfTables, dst: &mut [u16], src: &[u16], c: u16, simd: bool) {
        tables.addmul_u16(dst, src, c, simd);
    }
}

/// Eight 16-byte lanes holding, for one multiplier c, the low and high
/// product bytes of c times each 4-bit nibble position of a 16-bit
/// element.
pub(crate) type SplitTable = [[u8; 16]; 8];

/// Lookup tables for one field width, immutable after construction.
pub struct GfTables {
    pub(super) bits: u32,
    /// 2^m - 1, the order of the multiplicative group.
    pub(super) size: usize,
    /// exp[i] = alpha^i, doubled so that `exp[log x + log y]` needs no
    /// modular reduction.
    pub(super) exp: Box<[u16]>,
    /// log[alpha^i] = i; log[0] holds the sentinel 2^m - 1.
    pub(super) log: Box<[u16]>,
    /// inverse[x] = x^-1; inverse[0] is a 0 sentinel, never read on
    /// valid input.
    pub(super) inverse: Box<[u16]>,
    /// Full multiplication table, present whenever m <= 8.
    pub(super) mul: Option<Box<[u8]>>,
    /// Per-operand SIMD nibble tables, present when m > 8 and a 16-byte
    /// shuffle unit was detected.
    pub(super) split: Option<Box<[SplitTable]>>,
}

const UNINIT: OnceCell<GfTables> = OnceCell::new();
static TABLES: [OnceCell<GfTables>; (MAX_GF_BITS + 1) as usize] = [UNINIT; 17];

impl GfTables {
    /// Returns the process-wide tables for GF(2^bits), building them on
    /// first use. Safe from any thread; racing callers block until the
    /// winner has published the finished tables.
    pub fn get(bits: u32) -> Result<&'static GfTables, FecError> {
        if !(MIN_GF_BITS..=MAX_GF_BITS).contains(&bits) {
            return Err(FecError::FieldWidth { bits });
        }
        Ok(TABLES[bits as usize].get_or_init(|| tables::generate(bits)))
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// 2^m - 1.
    pub fn field_size(&self) -> usize {
        self.size
    }

    pub(crate) fn has_split_tables(&self) -> bool {
        self.split.is_some()
    }

    /// Scalar field multiplication.
    #[inline]
    pub fn mul(&self, x: u16, y: u16) -> u16 {
        if let Some(mul) = self.mul.as_deref() {
            return mul[((x as usize) << self.bits) + y as usize] as u16;
        }
        if x == 0 || y == 0 {
            return 0;
        }
        self.exp[self.log[x as usize] as usize + self.log[y as usize] as usize]
    }

    /// Multiplicative inverse; `inv(0)` returns the 0 sentinel.
    #[inline]
    pub fn inv(&self, x: u16) -> u16 {
        self.inverse[x as usize]
    }

    /// alpha^(e mod (2^m - 1)) for an arbitrary exponent.
    #[inline]
    pub(crate) fn exp_mod(&self, e: usize) -> u16 {
        self.exp[self.modnn(e) as usize]
    }

    /// e mod (2^m - 1) without a divide.
    #[inline]
    fn modnn(&self, mut x: usize) -> u16 {
        while x >= self.size {
            x -= self.size;
            x = (x >> self.bits) + (x & self.size);
        }
        x as u16
    }
}

impl fmt::Debug for GfTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfTables")
            .field("bits", &self.bits)
            .field("mul_table", &self.mul.is_some())
            .field("split_tables", &self.split.is_some())
            .finish()
    }
}

/// Idempotent table setup for GF(2^bits).
///
/// Calling this is optional; the codec constructor performs the same
/// initialization lazily. It exists so callers can pay the table-build
/// cost at a time of their choosing.
pub fn init(bits: u32) -> Result<(), FecError> {
    GfTables::get(bits).map(|_| ())
}
