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

//! Dense linear algebra over GF(2^m): matrix storage, matrix product,
//! Gauss-Jordan inversion and the fast Vandermonde inverse.

use std::fmt;

use aligned_box::AlignedBox;
use log::debug;
use rayon::prelude::*;

use crate::error::FecError;
use crate::gf::{GfElement, GfTables};

/// Base-address alignment for buffers consumed by the SIMD kernels.
pub(crate) const SIMD_ALIGN: usize = 16;

/// Dense row-major rectangular matrix of field elements.
pub(crate) struct Matrix<E: GfElement> {
    rows: usize,
    cols: usize,
    data: AlignedBox<[E]>,
}

impl<E: GfElement> fmt::Debug for Matrix<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &&*self.data)
            .finish()
    }
}

impl<E: GfElement> Matrix<E> {
    pub(crate) fn zeroed(rows: usize, cols: usize) -> Result<Self, FecError> {
        let data = AlignedBox::slice_from_value(SIMD_ALIGN, rows * cols, E::default())
            .map_err(|_| FecError::Allocation)?;
        Ok(Matrix { rows, cols, data })
    }

    pub(crate) fn row(&self, r: usize) -> &[E] {
        debug_assert!(r < self.rows);
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub(crate) fn row_mut(&mut self, r: usize) -> &mut [E] {
        debug_assert!(r < self.rows);
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub(crate) fn as_slice(&self) -> &[E] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [E] {
        &mut self.data
    }
}

/// `C = A * B` where A is n x k, B is k x m and C is n x m, all row
/// major. The inner pass is row-scaled accumulation so it runs on the
/// bulk `addmul`; output rows are independent and computed in parallel.
pub(crate) fn matmul<E: GfElement>(
    tables: &GfTables,
    a: &[E],
    b: &[E],
    c: &mut [E],
    n: usize,
    k: usize,
    m: usize,
    simd: bool,
) {
    debug_assert_eq!(a.len(), n * k);
    debug_assert_eq!(b.len(), k * m);
    debug_assert_eq!(c.len(), n * m);

    c.iter_mut().for_each(|e| *e = E::default());
    c.par_chunks_mut(m).enumerate().for_each(|(row, out)| {
        let arow = &a[row * k..(row + 1) * k];
        for (i, aij) in arow.iter().enumerate() {
            let aij = aij.word();
            if aij != 0 {
                tables.addmul(out, &b[i * m..(i + 1) * m], aij, simd);
            }
        }
    });
}

/// In-place Gauss-Jordan inversion of the k x k matrix in `src`
/// (adapted from Numerical Recipes). Fails on a singular matrix.
pub(crate) fn invert_mat<E: GfElement>(
    tables: &GfTables,
    src: &mut [E],
    k: usize,
    simd: bool,
) -> Result<(), FecError> {
    debug_assert_eq!(src.len(), k * k);

    let mut indxc = vec![0usize; k];
    let mut indxr = vec![0usize; k];
    // Marks elements already used as pivots.
    let mut ipiv = vec![0u32; k];
    let mut id_row = vec![E::default(); k];
    let mut pivot_copy = vec![E::default(); k];

    for col in 0..k {
        // Zeroing column `col`: try the diagonal first, then scan for
        // any usable nonzero element.
        let mut irow = usize::MAX;
        let mut icol = usize::MAX;
        if ipiv[col] != 1 && src[col * k + col].word() != 0 {
            irow = col;
            icol = col;
        } else {
            'scan: for row in 0..k {
                if ipiv[row] == 1 {
                    continue;
                }
                for ix in 0..k {
                    match ipiv[ix] {
                        0 => {
                            if src[row * k + ix].word() != 0 {
                                irow = row;
                                icol = ix;
                                break 'scan;
                            }
                        }
                        1 => {}
                        _ => {
                            debug!("singular matrix: pivot column reused");
                            return Err(FecError::SingularMatrix);
                        }
                    }
                }
            }
        }
        if icol == usize::MAX {
            debug!("singular matrix: no pivot in column {col}");
            return Err(FecError::SingularMatrix);
        }

        ipiv[icol] += 1;
        // Swap rows so the pivot lands on the diagonal.
        if irow != icol {
            for ix in 0..k {
                src.swap(irow * k + ix, icol * k + ix);
            }
        }
        indxr[col] = irow;
        indxc[col] = icol;

        let pivot = icol * k;
        let c = src[pivot + icol].word();
        if c == 0 {
            debug!("singular matrix: zero pivot at {icol}");
            return Err(FecError::SingularMatrix);
        }
        if c != 1 {
            let c = tables.inv(c);
            src[pivot + icol] = E::from_word(1);
            for ix in 0..k {
                let v = src[pivot + ix].word();
                src[pivot + ix] = E::from_word(tables.mul(c, v));
            }
        }

        // Remove multiples of the pivot row from every other row. When
        // the pivot row is a basis vector the whole pass is a no-op.
        id_row[icol] = E::from_word(1);
        if src[pivot..pivot + k] != id_row[..] {
            pivot_copy.copy_from_slice(&src[pivot..pivot + k]);
            for ix in 0..k {
                if ix == icol {
                    continue;
                }
                let base = ix * k;
                let c = src[base + icol].word();
                src[base + icol] = E::default();
                if c != 0 {
                    tables.addmul(&mut src[base..base + k], &pivot_copy, c, simd);
                }
            }
        }
        id_row[icol] = E::default();
    }

    // Undo the column swaps in reverse order.
    for col in (0..k).rev() {
        if indxr[col] != indxc[col] {
            for row in 0..k {
                src.swap(row * k + indxr[col], row * k + indxc[col]);
            }
        }
    }
    Ok(())
}

/// Fast inversion of a k x k Vandermonde matrix in O(k^2), in place.
///
/// Only the second column (the evaluation points p_i, all distinct) is
/// read; the matrix is assumed to be a genuine non-singular Vandermonde
/// matrix. Works through the coefficients of P(x) = prod(x - p_i) and
/// synthetic division.
pub(crate) fn invert_vdm<E: GfElement>(tables: &GfTables, src: &mut [E], k: usize) {
    debug_assert_eq!(src.len(), k * k);
    if k == 1 {
        // Degenerate case, the matrix must be p^0 = 1.
        return;
    }

    let mut p = vec![0u16; k];
    let mut c = vec![0u16; k];
    let mut b = vec![0u16; k];
    for (i, pi) in p.iter_mut().enumerate() {
        *pi = src[i * k + 1].word();
    }

    // Coefficients of P(x), built by multiplying in one root at a time;
    // c[k] = 1 is implicit. Subtraction is addition in GF(2^m).
    c[k - 1] = p[0];
    for i in 1..k {
        let p_i = p[i];
        for j in (k - 1 - i)..(k - 1) {
            c[j] ^= tables.mul(p_i, c[j + 1]);
        }
        c[k - 1] ^= p_i;
    }

    for row in 0..k {
        // Synthetic division by (x - p_row); t accumulates P'(p_row).
        let xx = p[row];
        let mut t = 1u16;
        b[k - 1] = 1; // this is in fact c[k]
        for i in (0..k - 1).rev() {
            b[i] = c[i + 1] ^ tables.mul(xx, b[i + 1]);
            t = tables.mul(xx, t) ^ b[i];
        }
        let t_inv = tables.inv(t);
        for col in 0..k {
            src[col * k + row] = E::from_word(tables.mul(t_inv, b[col]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(k: usize) -> Vec<u8> {
        let mut m = vec![0u8; k * k];
        for i in 0..k {
            m[i * k + i] = 1;
        }
        m
    }

    #[test]
    fn matmul_by_identity() {
        let t = GfTables::get(8).unwrap();
        let a: Vec<u8> = (1..=12).collect();
        let id = identity(4);
        let mut c = vec![0u8; 12];
        matmul(t, &a, &id, &mut c, 3, 4, 4, false);
        assert_eq!(a, c);
    }

    #[test]
    fn invert_mat_roundtrip() {
        let t = GfTables::get(8).unwrap();
        // Vandermonde on distinct points is guaranteed nonsingular.
        let k = 5;
        let mut m = vec![0u8; k * k];
        for r in 0..k {
            let x = (r as u16) + 2;
            let mut v = 1u16;
            for c in 0..k {
                m[r * k + c] = v as u8;
                v = t.mul(v, x);
            }
        }
        let orig = m.clone();
        invert_mat(t, &mut m, k, false).unwrap();
        let mut prod = vec![0u8; k * k];
        matmul(t, &orig, &m, &mut prod, k, k, k, false);
        assert_eq!(prod, identity(k));
    }

    #[test]
    fn invert_mat_rejects_singular() {
        let t = GfTables::get(8).unwrap();
        // Two equal rows.
        let mut m = vec![1, 2, 3, 1, 2, 3, 4, 5, 6u8];
        assert_eq!(
            invert_mat(t, &mut m, 3, false),
            Err(FecError::SingularMatrix)
        );
    }

    #[test]
    fn invert_vdm_agrees_with_gauss_jordan() {
        let t = GfTables::get(8).unwrap();
        // The codec's Vandermonde shape: row 0 evaluates at 0, row r at
        // alpha^(r-1).
        let k = 6;
        let mut m = vec![0u8; k * k];
        m[0] = 1;
        for r in 1..k {
            for c in 0..k {
                m[r * k + c] = t.exp_mod((r - 1) * c) as u8;
            }
        }
        let mut fast = m.clone();
        invert_vdm(t, &mut fast, k);
        invert_mat(t, &mut m, k, false).unwrap();
        assert_eq!(fast, m);
    }

    #[test]
    fn invert_vdm_k1_is_identity() {
        let t = GfTables::get(8).unwrap();
        let mut m = vec![1u8];
        invert_vdm(t, &mut m, 1);
        assert_eq!(m, vec![1]);
    }

    #[test]
    fn matrix_buffers_are_aligned() {
        let m: Matrix<u16> = Matrix::zeroed(4, 8).unwrap();
        assert_eq!(m.as_slice().as_ptr() as usize % SIMD_ALIGN, 0);
        assert_eq!(m.row(3).len(), 8);
    }
}
