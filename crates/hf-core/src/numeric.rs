use crate::HfError;

/// Floating point type used for every continuous quantity.
pub type Real = f64;

/// Reject NaN and infinities produced while building a model.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, HfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HfError::NonFinite { what, value: v })
    }
}

/// Truncate `v` towards negative infinity keeping `digits` decimal places.
///
/// `truncate_to_digits(0.316227766, 5) == 0.31622`.
pub fn truncate_to_digits(v: Real, digits: u32) -> Real {
    let scale = 10f64.powi(digits as i32);
    (scale * v).floor() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_values_must_be_finite() {
        assert_eq!(ensure_finite(48.0, "E").unwrap(), 48.0);
        let err = ensure_finite(Real::INFINITY, "alpha").unwrap_err();
        assert!(format!("{err}").contains("alpha"));
    }

    #[test]
    fn truncation_of_hysteresis_width() {
        assert_eq!(truncate_to_digits(0.1f64.sqrt(), 5), 0.31622);
        assert_eq!(truncate_to_digits(2.0, 3), 2.0);
        assert_eq!(truncate_to_digits(-0.12345, 2), -0.13);
    }
}
