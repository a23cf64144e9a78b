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

//! # Systematic Reed-Solomon erasure codec
//!
//! The encoding matrix starts from a Vandermonde-like MDS matrix and is
//! transformed into systematic form: multiplying by the inverse of its
//! top k x k block produces a generator whose first k rows are the
//! identity, so the first k encoded symbols equal the source symbols and
//! the MDS property is preserved.

use aligned_box::AlignedBox;

use crate::error::FecError;
use crate::gf::{GfElement, GfTables};
use crate::matrix::{invert_mat, invert_vdm, matmul, Matrix, SIMD_ALIGN};
use crate::simd::SimdMode;

/// Immutable descriptor of one (k, n) code over GF(2^m).
///
/// Holds the n x k systematic generator matrix; construction is the
/// expensive part, encode and decode borrow the caller's symbol buffers
/// for the duration of the call. Multiple threads may share one codec.
///
/// ```
/// use rsfec::Codec8;
///
/// let codec = Codec8::new(8, 3, 5).unwrap();
/// let src: [&[u8]; 3] = [&[0, 1, 2, 3], &[4, 5, 6, 7], &[8, 9, 10, 11]];
/// let mut parity = [0u8; 4];
/// codec.encode(&src, &mut parity, 3).unwrap();
/// ```
#[derive(Debug)]
pub struct Codec<E: GfElement> {
    tables: &'static GfTables,
    k: usize,
    n: usize,
    generator: Matrix<E>,
    simd: bool,
}

/// Codec over byte-wide fields, 2 <= m <= 8.
pub type Codec8 = Codec<u8>;
/// Codec over 16-bit fields, 9 <= m <= 16.
pub type Codec16 = Codec<u16>;

impl<E: GfElement> Codec<E> {
    /// Builds a codec for `k` source symbols and `n` total encoded
    /// symbols over GF(2^bits), with `1 <= k <= n <= 2^bits`.
    pub fn new(bits: u32, k: usize, n: usize) -> Result<Self, FecError> {
        Self::with_simd_mode(bits, k, n, SimdMode::Auto)
    }

    /// Like [`Codec::new`] but with an explicit SIMD policy. The choice
    /// never changes results, only which kernel computes them.
    pub fn with_simd_mode(
        bits: u32,
        k: usize,
        n: usize,
        mode: SimdMode,
    ) -> Result<Self, FecError> {
        if !(E::MIN_BITS..=E::MAX_BITS).contains(&bits) {
            return Err(FecError::FieldWidth { bits });
        }
        let tables = GfTables::get(bits)?;
        if k == 0 || k > n || n > tables.field_size() + 1 {
            return Err(FecError::InvalidParams { k, n, bits });
        }
        let simd = mode == SimdMode::Auto && tables.has_split_tables();

        // Fill the temporary matrix with powers of field elements. Row 0
        // is special: together with the all-ones row 1 it makes the top
        // k x k block a Vandermonde matrix on k distinct points (0 and
        // the first k-1 powers of alpha), so it is invertible and every
        // k x k submatrix of the whole is too.
        let mut tmp = Matrix::zeroed(n, k)?;
        tmp.row_mut(0)[0] = E::from_word(1);
        for r in 1..n {
            let row = tmp.row_mut(r);
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = E::from_word(tables.exp_mod((r - 1) * c));
            }
        }

        // Systematic form: invert the top k x k block (much faster than
        // general Gauss-Jordan for a Vandermonde matrix), multiply the
        // bottom n-k rows by the inverse, and put the identity on top.
        let mut generator = Matrix::zeroed(n, k)?;
        {
            let (top, bottom) = tmp.as_mut_slice().split_at_mut(k * k);
            invert_vdm(tables, top, k);
            matmul(
                tables,
                bottom,
                top,
                &mut generator.as_mut_slice()[k * k..],
                n - k,
                k,
                k,
                simd,
            );
        }
        for i in 0..k {
            generator.as_mut_slice()[i * k + i] = E::from_word(1);
        }

        Ok(Codec {
            tables,
            k,
            n,
            generator,
            simd,
        })
    }

    /// Number of source symbols.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total number of encoded symbols.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Field width in bits.
    pub fn bits(&self) -> u32 {
        self.tables.bits()
    }

    /// Produces the encoded symbol `index` into `out` from the `k`
    /// source symbols. Indices below `k` copy the corresponding source
    /// symbol; the rest are parity. All buffers must hold the same
    /// number of field elements.
    pub fn encode(&self, src: &[&[E]], out: &mut [E], index: usize) -> Result<(), FecError> {
        if index >= self.n {
            return Err(FecError::InvalidIndex {
                index,
                max: self.n - 1,
            });
        }
        if src.len() != self.k || src.iter().any(|s| s.len() != out.len()) {
            return Err(FecError::LengthMismatch);
        }

        if index < self.k {
            out.copy_from_slice(src[index]);
        } else {
            out.iter_mut().for_each(|e| *e = E::default());
            let row = self.generator.row(index);
            for (i, s) in src.iter().enumerate() {
                self.tables.addmul(out, s, row[i].word(), self.simd);
            }
        }
        Ok(())
    }

    /// Recovers the `k` source symbols in place from any `k` received
    /// encoded symbols and their indices.
    ///
    /// On success `symbols[i]` holds source symbol `i`. Both slices are
    /// reordered while decoding; on error the symbol contents are left
    /// untouched.
    pub fn decode(&self, symbols: &mut [&mut [E]], indices: &mut [usize]) -> Result<(), FecError> {
        let k = self.k;
        if symbols.len() != k || indices.len() != k {
            return Err(FecError::LengthMismatch);
        }
        let sz = symbols[0].len();
        if symbols.iter().any(|s| s.len() != sz) {
            return Err(FecError::LengthMismatch);
        }

        shuffle(symbols, indices, k)?;

        // Row i of the decode matrix is the generator row that produced
        // the symbol now sitting at position i; for source symbols that
        // is a basis vector thanks to the shuffle.
        let mut dec = Matrix::zeroed(k, k)?;
        for i in 0..k {
            let index = indices[i];
            let row = dec.row_mut(i);
            if index < k {
                row[i] = E::from_word(1);
            } else if index < self.n {
                row.copy_from_slice(self.generator.row(index));
            } else {
                return Err(FecError::InvalidIndex {
                    index,
                    max: self.n - 1,
                });
            }
        }
        invert_mat(self.tables, dec.as_mut_slice(), k, self.simd)?;

        // Rebuild the missing source symbols into fresh buffers first;
        // every received symbol is still an input until all rows are
        // done.
        let mut recovered: Vec<(usize, AlignedBox<[E]>)> = Vec::new();
        for row in 0..k {
            if indices[row] >= k {
                let mut fresh: AlignedBox<[E]> =
                    AlignedBox::slice_from_value(SIMD_ALIGN, sz, E::default())
                        .map_err(|_| FecError::Allocation)?;
                let coeffs = dec.row(row);
                for col in 0..k {
                    self.tables
                        .addmul(&mut fresh, &*symbols[col], coeffs[col].word(), self.simd);
                }
                recovered.push((row, fresh));
            }
        }
        for (row, fresh) in recovered {
            symbols[row].copy_from_slice(&fresh);
        }
        Ok(())
    }
}

/// Moves every received source symbol to the position named by its
/// index, cycle by cycle. A swap target that already holds its own index
/// means a duplicate.
fn shuffle<E: GfElement>(
    symbols: &mut [&mut [E]],
    indices: &mut [usize],
    k: usize,
) -> Result<(), FecError> {
    let mut i = 0;
    while i < k {
        if indices[i] >= k || indices[i] == i {
            i += 1;
        } else {
            let c = indices[i];
            if indices[c] == c {
                return Err(FecError::DuplicateIndex { index: c });
            }
            indices.swap(i, c);
            symbols.swap(i, c);
        }
    }
    Ok(())
}
