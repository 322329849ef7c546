//! Bit-serial modular arithmetic.
//!
//! [`mul_mod`] is the multiply-reduce the hardware implements: it walks the
//! multiplier bits most-significant first and never forms a double-width
//! product. [`exp_mod`] is the serial square-and-multiply engine built on it.
//! [`reference_pow`] is the independent checker used when reporting; it
//! shares no code with the bit-serial path.

/// Largest modulus the bit-serial multiplier accepts.
///
/// With reduced operands the per-bit update peaks at `2r + b < 3n`, so any
/// modulus at or below this bound keeps the update inside `u64`.
pub const MAX_MODULUS: u64 = u64::MAX / 3;

/// Number of significant bits in `x` (0 for 0).
pub fn bit_len(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

/// Bit-serial multiply-reduce: `(a * b) mod n` without a wide product.
///
/// Walks the bits of `a` from most significant to least, keeping the running
/// value reduced with at most two conditional subtractions per bit. Operands
/// must already be reduced (`a, b < n`) and `n` must lie in
/// `2..=MAX_MODULUS`; the pipeline guarantees both by construction.
pub fn mul_mod(a: u64, b: u64, n: u64) -> u64 {
    debug_assert!(n >= 2 && n <= MAX_MODULUS, "modulus out of range: {n}");
    debug_assert!(a < n && b < n, "unreduced operands: a={a} b={b} n={n}");

    let mut r: u64 = 0;
    for i in (0..bit_len(a)).rev() {
        r <<= 1;
        if (a >> i) & 1 == 1 {
            r += b;
        }
        // Both comparisons must admit equality: a running value of exactly
        // n reduces to zero, and a strict test would let n escape the loop.
        if r >= n {
            r -= n;
        }
        if r >= n {
            r -= n;
        }
        debug_assert!(r < n);
    }
    r
}

/// Serial square-and-multiply over the whole exponent, bottom bit first.
///
/// This is the single-pass engine the sliced pipeline must agree with; it
/// reduces through [`mul_mod`] only.
pub fn exp_mod(m: u64, e: u64, n: u64) -> u64 {
    debug_assert!(n >= 2 && n <= MAX_MODULUS, "modulus out of range: {n}");

    let mut acc: u64 = 1;
    let mut base = m % n;
    for i in 0..bit_len(e) {
        if (e >> i) & 1 == 1 {
            acc = mul_mod(acc, base, n);
        }
        base = mul_mod(base, base, n);
    }
    acc
}

/// Independent reference exponentiation over widening `u128` arithmetic.
///
/// Deliberately shares nothing with the bit-serial path, so a defect there
/// cannot hide in here.
pub fn reference_pow(m: u64, e: u64, n: u64) -> u64 {
    if n <= 1 {
        return 0;
    }
    let n = u128::from(n);
    let mut acc: u128 = 1;
    let mut base = u128::from(m) % n;
    let mut e = e;
    while e > 0 {
        if e & 1 == 1 {
            acc = acc * base % n;
        }
        base = base * base % n;
        e >>= 1;
    }
    acc as u64
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bit_len_counts_significant_bits() {
        assert_eq!(bit_len(0), 0);
        assert_eq!(bit_len(1), 1);
        assert_eq!(bit_len(0b1011), 4);
        assert_eq!(bit_len(u64::MAX), 64);
    }

    #[test]
    fn mul_mod_boundary_operands() {
        let n = 25_553;
        assert_eq!(mul_mod(0, 17, n), 0);
        assert_eq!(mul_mod(17, 0, n), 0);
        assert_eq!(mul_mod(0, 0, n), 0);
        assert_eq!(mul_mod(n - 1, n - 1, n), 1);
        assert_eq!(mul_mod(1, n - 1, n), n - 1);
    }

    #[test]
    fn mul_mod_reduces_running_value_equal_to_modulus() {
        // 2 * (n / 2) hits r == n on the last bit for any even n. A strict
        // comparison in the reduction step would return n instead of 0.
        for n in [4u64, 100, 25_552, 65_536] {
            assert_eq!(mul_mod(2, n / 2, n), 0, "n = {n}");
        }
        // Same trip one bit earlier: 4 * 25 doubles through 50 -> 100.
        assert_eq!(mul_mod(4, 25, 100), 0);
    }

    #[test]
    fn mul_mod_exhaustive_small_moduli() {
        for n in 2u64..=48 {
            for a in 0..n {
                for b in 0..n {
                    assert_eq!(mul_mod(a, b, n), a * b % n, "a={a} b={b} n={n}");
                }
            }
        }
    }

    #[test]
    fn exp_mod_known_vectors() {
        // 22^54 mod 123 = 121, the worked example from the hardware bench.
        assert_eq!(exp_mod(22, 54, 123), 121);
        assert_eq!(exp_mod(5, 0, 7), 1);
        assert_eq!(exp_mod(0, 9, 7), 0);
        assert_eq!(exp_mod(14, 1, 7), 0);
    }

    #[test]
    fn reference_pow_survives_degenerate_moduli() {
        assert_eq!(reference_pow(5, 3, 1), 0);
        assert_eq!(reference_pow(5, 0, 2), 1);
    }

    fn reduced_pair() -> impl Strategy<Value = (u64, u64, u64)> {
        (2u64..=MAX_MODULUS).prop_flat_map(|n| (0..n, 0..n, Just(n)).prop_map(|(a, b, n)| (a, b, n)))
    }

    proptest! {
        #[test]
        fn mul_mod_matches_wide_reference((a, b, n) in reduced_pair()) {
            let wide = (u128::from(a) * u128::from(b) % u128::from(n)) as u64;
            prop_assert_eq!(mul_mod(a, b, n), wide);
        }

        #[test]
        fn exp_mod_matches_reference(m in 0u64..1 << 32, e in 0u64..1 << 20, n in 2u64..1 << 32) {
            prop_assert_eq!(exp_mod(m, e, n), reference_pow(m, e, n));
        }
    }
}
