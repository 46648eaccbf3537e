use std::cmp::Ordering;

// 2**63, the first float past the range of i64.
const I64_UPPER_BOUND: f64 = 9223372036854775808_f64;

/// Compares an integer against a float exactly. Casting the integer to f64 would lose precision
/// past 2**53 and make e.g. 2**53 + 1 compare equal to 2**53.
pub(crate) fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= I64_UPPER_BOUND {
        return Some(Ordering::Less);
    }
    if f < -I64_UPPER_BOUND {
        return Some(Ordering::Greater);
    }

    let whole = f.trunc();
    let fract = f - whole;
    let ordering = i.cmp(&(whole as i64)).then_with(|| {
        if fract > 0.0 {
            Ordering::Less
        } else if fract < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    Some(ordering)
}

pub(crate) fn int_eq_float(i: i64, f: f64) -> bool {
    cmp_int_float(i, f) == Some(Ordering::Equal)
}
