//! Bulk multiply-and-accumulate, the hot path of the codec.
//!
//! `addmul` computes `dst[i] ^= c * src[i]`. For m <= 8 it walks one row
//! of the full multiplication table. For m > 8 the scalar form uses the
//! doubled exp table; when the split tables were built, the SIMD form
//! splits every 16-bit element into four nibbles and resolves eight
//! partial products per 16 bytes with shuffle lookups. An unaligned
//! prefix on `src` and a sub-block tail are handled scalar-wise.

use super::{GfElement, GfTables};

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use super::SplitTable;

impl GfTables {
    /// `dst[i] ^= c * src[i]` for every element of the two slices.
    ///
    /// Writes only `dst`, reads only `src` and the tables; `simd` picks
    /// the kernel but never the result.
    pub fn addmul<E: GfElement>(&self, dst: &mut [E], src: &[E], c: u16, simd: bool) {
        debug_assert_eq!(dst.len(), src.len());
        if c == 0 {
            return;
        }
        E::addmul(self, dst, src, c, simd);
    }

    pub(super) fn addmul_u8(&self, dst: &mut [u8], src: &[u8], c: u16) {
        if let Some(mul) = self.mul.as_deref() {
            // One table row per multiplier; no zero test needed.
            let row = &mul[(c as usize) << self.bits..][..self.size + 1];
            for (d, &s) in dst.iter_mut().zip(src) {
                *d ^= row[s as usize];
            }
        } else {
            let row = &self.exp[self.log[c as usize] as usize..];
            for (d, &s) in dst.iter_mut().zip(src) {
                if s != 0 {
                    *d ^= row[self.log[s as usize] as usize] as u8;
                }
            }
        }
    }

    pub(super) fn addmul_u16(&self, dst: &mut [u16], src: &[u16], c: u16, simd: bool) {
        if simd {
            if let Some(split) = self.split.as_deref() {
                #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
                {
                    self.addmul_u16_split(dst, src, c, &split[c as usize]);
                    return;
                }
                #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
                let _ = split;
            }
        }
        self.addmul_u16_scalar(dst, src, c);
    }

    fn addmul_u16_scalar(&self, dst: &mut [u16], src: &[u16], c: u16) {
        let row = &self.exp[self.log[c as usize] as usize..];
        for (d, &s) in dst.iter_mut().zip(src) {
            if s != 0 {
                *d ^= row[self.log[s as usize] as usize];
            }
        }
    }

    /// Peels the unaligned head and the sub-block tail off the 16-byte
    /// aligned body the kernel consumes.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    fn addmul_u16_split(&self, dst: &mut [u16], src: &[u16], c: u16, table: &SplitTable) {
        #[cfg(target_arch = "x86_64")]
        const BLOCK: usize = 8;
        #[cfg(target_arch = "aarch64")]
        const BLOCK: usize = 16;

        let mis = src.as_ptr() as usize & 15;
        let head = if mis == 0 {
            0
        } else {
            ((16 - mis) >> 1).min(src.len())
        };
        let (src_head, src_rest) = src.split_at(head);
        let (dst_head, dst_rest) = dst.split_at_mut(head);
        self.addmul_u16_scalar(dst_head, src_head, c);

        let body = src_rest.len() - src_rest.len() % BLOCK;
        // SAFETY: split tables exist only when the shuffle unit was
        // detected at init time; `body` is a whole number of kernel
        // blocks and `src_rest` starts on a 16-byte boundary.
        unsafe {
            #[cfg(target_arch = "x86_64")]
            addmul_split_ssse3(&mut dst_rest[..body], &src_rest[..body], table);
            #[cfg(target_arch = "aarch64")]
            addmul_split_neon(&mut dst_rest[..body], &src_rest[..body], table);
        }
        self.addmul_u16_scalar(&mut dst_rest[body..], &src_rest[body..], c);
    }
}

/// Eight 16-bit lanes per iteration. Each lane is split into four
/// nibbles; each nibble selects a low-byte and a high-byte partial
/// product from the precomputed tables, and the eight partials XOR into
/// the accumulator.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "ssse3")]
unsafe fn addmul_split_ssse3(dst: &mut [u16], src: &[u16], table: &SplitTable) {
    use std::arch::x86_64::*;

    let t0 = _mm_loadu_si128(table[0].as_ptr() as *const __m128i);
    let t1 = _mm_loadu_si128(table[1].as_ptr() as *const __m128i);
    let t2 = _mm_loadu_si128(table[2].as_ptr() as *const __m128i);
    let t3 = _mm_loadu_si128(table[3].as_ptr() as *const __m128i);
    let t4 = _mm_loadu_si128(table[4].as_ptr() as *const __m128i);
    let t5 = _mm_loadu_si128(table[5].as_ptr() as *const __m128i);
    let t6 = _mm_loadu_si128(table[6].as_ptr() as *const __m128i);
    let t7 = _mm_loadu_si128(table[7].as_ptr() as *const __m128i);
    let nibble = _mm_set1_epi8(0x0f);
    let low_byte = _mm_set1_epi16(0x00ff);

    let blocks = dst.len() / 8;
    let sp = src.as_ptr() as *const __m128i;
    let dp = dst.as_mut_ptr() as *mut __m128i;
    for i in 0..blocks {
        let data = _mm_load_si128(sp.add(i));
        let mut lo = _mm_and_si128(data, nibble);
        let mut hi = _mm_and_si128(_mm_srli_epi16(data, 4), nibble);

        // Low byte of every element.
        let mut acc = _mm_and_si128(_mm_shuffle_epi8(t0, lo), low_byte);
        acc = _mm_xor_si128(acc, _mm_slli_epi16(_mm_shuffle_epi8(t1, lo), 8));
        acc = _mm_xor_si128(acc, _mm_and_si128(_mm_shuffle_epi8(t2, hi), low_byte));
        acc = _mm_xor_si128(acc, _mm_slli_epi16(_mm_shuffle_epi8(t3, hi), 8));

        // High byte of every element.
        lo = _mm_srli_epi16(lo, 8);
        hi = _mm_srli_epi16(hi, 8);
        acc = _mm_xor_si128(acc, _mm_and_si128(_mm_shuffle_epi8(t4, lo), low_byte));
        acc = _mm_xor_si128(acc, _mm_slli_epi16(_mm_shuffle_epi8(t5, lo), 8));
        acc = _mm_xor_si128(acc, _mm_and_si128(_mm_shuffle_epi8(t6, hi), low_byte));
        acc = _mm_xor_si128(acc, _mm_slli_epi16(_mm_shuffle_epi8(t7, hi), 8));

        let cur = _mm_loadu_si128(dp.add(i) as *const __m128i);
        _mm_storeu_si128(dp.add(i), _mm_xor_si128(cur, acc));
    }
}

/// Sixteen 16-bit lanes per iteration. `vld2` deinterleaves the low and
/// high bytes so each table lookup runs on a full 16-byte register.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn addmul_split_neon(dst: &mut [u16], src: &[u16], table: &SplitTable) {
    use std::arch::aarch64::*;

    let t0 = vld1q_u8(table[0].as_ptr());
    let t1 = vld1q_u8(table[1].as_ptr());
    let t2 = vld1q_u8(table[2].as_ptr());
    let t3 = vld1q_u8(table[3].as_ptr());
    let t4 = vld1q_u8(table[4].as_ptr());
    let t5 = vld1q_u8(table[5].as_ptr());
    let t6 = vld1q_u8(table[6].as_ptr());
    let t7 = vld1q_u8(table[7].as_ptr());
    let nibble = vdupq_n_u8(0x0f);

    let blocks = dst.len() / 16;
    for i in 0..blocks {
        let sp = src.as_ptr().add(i * 16) as *const u8;
        let dp = dst.as_mut_ptr().add(i * 16) as *mut u8;

        let data = vld2q_u8(sp);
        let lo0 = vandq_u8(data.0, nibble);
        let hi0 = vshrq_n_u8(data.0, 4);
        let lo1 = vandq_u8(data.1, nibble);
        let hi1 = vshrq_n_u8(data.1, 4);

        let out_lo = veorq_u8(
            veorq_u8(vqtbl1q_u8(t0, lo0), vqtbl1q_u8(t2, hi0)),
            veorq_u8(vqtbl1q_u8(t4, lo1), vqtbl1q_u8(t6, hi1)),
        );
        let out_hi = veorq_u8(
            veorq_u8(vqtbl1q_u8(t1, lo0), vqtbl1q_u8(t3, hi0)),
            veorq_u8(vqtbl1q_u8(t5, lo1), vqtbl1q_u8(t7, hi1)),
        );

        let cur = vld2q_u8(dp as *const u8);
        vst2q_u8(
            dp,
            uint8x16x2_t(veorq_u8(cur.0, out_lo), veorq_u8(cur.1, out_hi)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::GfTables;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn addmul_ref_u16(t: &GfTables, dst: &mut [u16], src: &[u16], c: u16) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d ^= t.mul(c, s);
        }
    }

    fn addmul_ref_u8(t: &GfTables, dst: &mut [u8], src: &[u8], c: u16) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d ^= t.mul(c, s as u16) as u8;
        }
    }

    #[test]
    fn addmul_u8_matches_reference() {
        let t = GfTables::get(8).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0usize, 1, 3, 16, 17, 100] {
            let src: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let init: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            for c in [0u16, 1, 2, 0x53, 0xff] {
                let mut got = init.clone();
                let mut want = init.clone();
                t.addmul(&mut got, &src, c, false);
                addmul_ref_u8(t, &mut want, &src, c);
                assert_eq!(got, want, "len={len} c={c}");
            }
        }
    }

    #[test]
    fn addmul_u16_scalar_matches_reference() {
        let t = GfTables::get(16).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for len in [0usize, 1, 7, 8, 9, 64, 1001] {
            let src: Vec<u16> = (0..len).map(|_| rng.gen()).collect();
            let init: Vec<u16> = (0..len).map(|_| rng.gen()).collect();
            for c in [0u16, 1, 0x100, 0xabcd, 0xffff] {
                let mut got = init.clone();
                let mut want = init.clone();
                t.addmul(&mut got, &src, c, false);
                addmul_ref_u16(t, &mut want, &src, c);
                assert_eq!(got, want, "len={len} c={c}");
            }
        }
    }

    /// The SIMD kernel must agree with the scalar loop at every length,
    /// including ones that exercise the alignment prefix and the tail.
    #[test]
    fn addmul_u16_simd_matches_scalar() {
        let t = GfTables::get(16).unwrap();
        let mut rng = StdRng::seed_from_u64(13);
        // Offset into a larger buffer shifts the src base address so the
        // unaligned-prefix path runs as well.
        for offset in 0..4usize {
            for len in [1usize, 5, 8, 15, 16, 31, 64, 1000, 1023] {
                let raw: Vec<u16> = (0..len + offset).map(|_| rng.gen()).collect();
                let src = &raw[offset..];
                let init: Vec<u16> = (0..len).map(|_| rng.gen()).collect();
                for c in [1u16, 0x1b, 0x8000, 0xfffe] {
                    let mut got = init.clone();
                    let mut want = init.clone();
                    t.addmul(&mut got, src, c, true);
                    t.addmul(&mut want, src, c, false);
                    assert_eq!(got, want, "offset={offset} len={len} c={c}");
                }
            }
        }
    }

    #[test]
    fn addmul_with_zero_multiplier_is_a_no_op() {
        let t = GfTables::get(12).unwrap();
        let src = vec![0x0fffu16; 32];
        let mut dst = vec![0x0123u16; 32];
        t.addmul(&mut dst, &src, 0, true);
        assert!(dst.iter().all(|&x| x == 0x0123));
    }
}
