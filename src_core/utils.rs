use core::sync::atomic::{AtomicU32, Ordering};

use crate::math::Real;

/// Number of worker identities needed to cover `len` particles through
/// [`resequence_index`] with the given stride.
pub fn resequenced_len(len: u32, skip: u32) -> u32 {
    if len == 0 || skip <= 1 {
        return len;
    }
    let rows = (len + skip - 1) / skip;
    rows * skip
}

/// Stride-based worker-to-particle permutation.
///
/// Reads the worker id as `(q, r)` in a `skip × rows` layout and transposes
/// it, so workers that are adjacent in dispatch order touch particles
/// `skip` apart. Identities past the ragged tail map to `None`. This is a
/// contention heuristic only; any bijection would preserve correctness.
#[inline(always)]
pub fn resequence_index(id: u32, skip: u32, len: u32) -> Option<u32> {
    if len == 0 {
        return None;
    }
    if skip <= 1 {
        return if id < len { Some(id) } else { None };
    }

    let rows = (len + skip - 1) / skip;
    let q = id / rows;
    let r = id % rows;
    let out = r * skip + q;
    if out < len {
        Some(out)
    } else {
        None
    }
}

/// Lock-free floating accumulation through the bit representation:
/// read, add, compare-and-swap, retry on conflict. Returns the value
/// observed immediately before the successful update.
///
/// This is the accumulation primitive for targets without a native atomic
/// float-add; the retry loop is unbounded but starvation-tolerant, since a
/// failed exchange means another worker made progress.
#[inline(always)]
pub fn atomic_f32_add(target: &AtomicU32, rhs: Real) -> Real {
    let mut current = target.load(Ordering::Relaxed);
    loop {
        let new = Real::from_bits(current) + rhs;
        match target.compare_exchange_weak(
            current,
            new.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return Real::from_bits(current),
            Err(actual) => current = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resequence_is_a_bijection() {
        for (len, skip) in [(100u32, 16u32), (97, 16), (5, 16), (64, 8), (1, 4), (33, 1)] {
            let padded = resequenced_len(len, skip);
            assert!(padded >= len);

            let mut seen = std::vec![false; len as usize];
            for id in 0..padded {
                if let Some(out) = resequence_index(id, skip, len) {
                    assert!(!seen[out as usize], "index {} produced twice", out);
                    seen[out as usize] = true;
                }
            }
            assert!(seen.iter().all(|s| *s), "len {} skip {}", len, skip);
        }
    }

    #[test]
    fn resequence_spreads_adjacent_workers() {
        let skip = 16;
        let len = 256;
        let a = resequence_index(0, skip, len).unwrap();
        let b = resequence_index(1, skip, len).unwrap();
        assert_eq!(b - a, skip);
    }

    #[test]
    fn atomic_add_accumulates_under_contention() {
        use std::sync::atomic::AtomicU32;

        let target = AtomicU32::new(0.0f32.to_bits());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        atomic_f32_add(&target, 0.25);
                    }
                });
            }
        });

        let total = f32::from_bits(target.load(std::sync::atomic::Ordering::Relaxed));
        assert_eq!(total, 8.0 * 1000.0 * 0.25);
    }
}
