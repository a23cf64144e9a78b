//! Table generation for GF(2^m).
//!
//! Everything here is a pure function of the field width and the fixed
//! primitive polynomial; the result is published once per process by
//! [`GfTables::get`](super::GfTables::get).

use std::time::Instant;

use log::debug;

use super::{GfTables, SplitTable, PRIMITIVE_POLY};
use crate::simd::FeatureDetector;

pub(super) fn generate(bits: u32) -> GfTables {
    let started = Instant::now();
    let size = (1usize << bits) - 1;
    let poly = PRIMITIVE_POLY[bits as usize];

    let mut exp = vec![0u16; 2 * size].into_boxed_slice();
    let mut log = vec![0u16; size + 1].into_boxed_slice();
    let mut inverse = vec![0u16; size + 1].into_boxed_slice();

    // The first `bits` powers of alpha are plain bit shifts; alpha^bits
    // collects the polynomial terms along the way.
    let mut mask = 1u16;
    let mut alpha_m = 0u16;
    for i in 0..bits as usize {
        exp[i] = mask;
        log[mask as usize] = i as u16;
        if poly >> i & 1 == 1 {
            alpha_m ^= mask;
        }
        mask <<= 1;
    }
    exp[bits as usize] = alpha_m;
    log[alpha_m as usize] = bits as u16;

    // alpha^(i+1) is alpha^i shifted left once, folding any alpha^bits
    // term back in through the polynomial.
    let top = 1u16 << (bits - 1);
    for i in bits as usize + 1..size {
        let prev = exp[i - 1];
        exp[i] = if prev & top != 0 {
            alpha_m ^ ((prev ^ top) << 1)
        } else {
            prev << 1
        };
        log[exp[i] as usize] = i as u16;
    }
    // log(0) is undefined; the sentinel is never read on valid input.
    log[0] = size as u16;
    for i in 0..size {
        exp[i + size] = exp[i];
    }

    inverse[0] = 0;
    inverse[1] = 1;
    for i in 2..=size {
        inverse[i] = exp[size - log[i] as usize];
    }

    let mul = (bits <= 8).then(|| build_mul_table(bits, size, &exp, &log));
    let split = (bits > 8 && FeatureDetector::instance().shuffle_unit())
        .then(|| build_split_tables(size, &exp, &log));

    debug!(
        "generated GF(2^{}) tables in {:?} (split tables: {})",
        bits,
        started.elapsed(),
        split.is_some()
    );

    GfTables {
        bits,
        size,
        exp,
        log,
        inverse,
        mul,
        split,
    }
}

/// Full 2^m x 2^m product table; row and column 0 stay zero.
fn build_mul_table(bits: u32, size: usize, exp: &[u16], log: &[u16]) -> Box<[u8]> {
    let order = size + 1;
    let mut mul = vec![0u8; order * order].into_boxed_slice();
    for x in 1..order {
        let lx = log[x] as usize;
        let row = &mut mul[x << bits..(x << bits) + order];
        for (y, cell) in row.iter_mut().enumerate().skip(1) {
            *cell = exp[lx + log[y] as usize] as u8;
        }
    }
    mul
}

/// For every multiplier c, eight 16-byte lanes: low/high product bytes
/// of c times each 4-bit nibble position of a 16-bit element.
fn build_split_tables(size: usize, exp: &[u16], log: &[u16]) -> Box<[SplitTable]> {
    let mul = |x: usize, y: usize| -> u16 {
        // Nibble values above the field width never occur in valid
        // symbols; their product lanes stay zero.
        if x == 0 || y == 0 || y > size {
            0
        } else {
            exp[log[x] as usize + log[y] as usize]
        }
    };

    let mut tables = Vec::with_capacity(size + 1);
    for c in 0..=size {
        let mut t: SplitTable = [[0u8; 16]; 8];
        for j in 0..16usize {
            for (pair, shift) in [0u32, 4, 8, 12].into_iter().enumerate() {
                let v = mul(c, j << shift);
                t[2 * pair][j] = v as u8;
                t[2 * pair + 1][j] = (v >> 8) as u8;
            }
        }
        tables.push(t);
    }
    tables.into_boxed_slice()
}
