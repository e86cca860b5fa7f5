//! Closed floating-point intervals with tolerance-expanding arithmetic.
//!
//! A [`Range`] is the value type of range parameters in designs (a voltage of
//! `[4.5, 5.5]`, a current draw of `[0, 0.1]`). Both ends are inclusive.
//! Arithmetic rounds toward the extremes: the result of combining two ranges
//! contains every result of combining values drawn from each operand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Errors from constructing or combining ranges.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    /// The lower bound exceeds the upper bound, or a bound is NaN.
    #[error("invalid range with lower {lower} > upper {upper}")]
    Inverted {
        /// The requested lower bound.
        lower: f64,
        /// The requested upper bound.
        upper: f64,
    },
    /// Two ranges share no value.
    #[error("disjoint ranges {0} and {1}")]
    Disjoint(Range, Range),
    /// A division of a zero bound by a zero bound.
    #[error("0/0 in range division")]
    ZeroOverZero,
}

/// A closed interval `[lower, upper]` over `f64`.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Range {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Inclusive upper bound.
    pub upper: f64,
}

impl Range {
    /// Creates a range, rejecting inverted or NaN bounds.
    pub fn new(lower: f64, upper: f64) -> Result<Self, RangeError> {
        if lower <= upper {
            Ok(Self { lower, upper })
        } else {
            Err(RangeError::Inverted { lower, upper })
        }
    }

    /// A range containing exactly one value.
    pub fn exact(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// The range of every real value.
    pub fn all() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// From `lower` to positive infinity.
    pub fn from_lower(lower: f64) -> Self {
        Self {
            lower,
            upper: f64::INFINITY,
        }
    }

    /// From negative infinity to `upper`.
    pub fn from_upper(upper: f64) -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper,
        }
    }

    /// A symmetric tolerance around `center`, e.g. `0.05` for +/-5%.
    pub fn from_tolerance(center: f64, tolerance: f64) -> Result<Self, RangeError> {
        Self::from_asymmetric_tolerance(center, -tolerance, tolerance)
    }

    /// An asymmetric tolerance: `center * (1 + negative)` to `center * (1 + positive)`.
    pub fn from_asymmetric_tolerance(
        center: f64,
        negative: f64,
        positive: f64,
    ) -> Result<Self, RangeError> {
        let a = center * (1.0 + negative);
        let b = center * (1.0 + positive);
        Self::new(a.min(b), a.max(b))
    }

    /// Midpoint of the range.
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Distance between the bounds.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether the range holds a single value.
    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }

    /// Whether `value` lies within the range.
    pub fn contains_value(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Whether `other` is a subset of this range.
    pub fn contains(&self, other: &Range) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// Whether the two ranges share at least one value.
    pub fn intersects(&self, other: &Range) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }

    /// The values common to both ranges.
    pub fn intersect(&self, other: &Range) -> Result<Range, RangeError> {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        if lower <= upper {
            Ok(Range { lower, upper })
        } else {
            Err(RangeError::Disjoint(*self, *other))
        }
    }

    /// The smallest range containing both ranges.
    pub fn hull(&self, other: &Range) -> Range {
        Range {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Multiplies both bounds by a scalar, flipping for negative scalars.
    pub fn scale(&self, factor: f64) -> Range {
        if factor >= 0.0 {
            Range {
                lower: self.lower * factor,
                upper: self.upper * factor,
            }
        } else {
            Range {
                lower: self.upper * factor,
                upper: self.lower * factor,
            }
        }
    }

    /// Divides by a scalar.
    ///
    /// Division by zero maps to the infinities by the sign of the bounds. A range
    /// touching zero divided by zero is an error.
    pub fn checked_div_scalar(&self, divisor: f64) -> Result<Range, RangeError> {
        if divisor != 0.0 {
            return Ok(self.scale(1.0 / divisor));
        }
        if self.lower > 0.0 {
            Ok(Range::exact(f64::INFINITY))
        } else if self.upper < 0.0 {
            Ok(Range::exact(f64::NEG_INFINITY))
        } else if self.lower < 0.0 && self.upper > 0.0 {
            Ok(Range::all())
        } else {
            Err(RangeError::ZeroOverZero)
        }
    }

    /// Divides by another range using the corner quotients.
    ///
    /// A zero divisor bound contributes an infinity signed by the numerator bound
    /// and by the side the divisor approaches zero from; a zero numerator bound
    /// over a zero divisor bound is an error. A divisor with zero strictly
    /// inside it reaches quotients of both signs without bound, so the result
    /// is [`Range::all`].
    pub fn checked_div(&self, divisor: &Range) -> Result<Range, RangeError> {
        if divisor.is_exact() {
            return self.checked_div_scalar(divisor.lower);
        }
        if divisor.lower < 0.0 && divisor.upper > 0.0 {
            if self.lower == 0.0 || self.upper == 0.0 {
                return Err(RangeError::ZeroOverZero);
            }
            return Ok(Range::all());
        }
        // a non-exact divisor touching zero lies on one side of it
        let approach = if divisor.upper > 0.0 { 1.0 } else { -1.0 };
        let mut corners = [0.0f64; 4];
        let mut i = 0;
        for n in [self.lower, self.upper] {
            for d in [divisor.lower, divisor.upper] {
                corners[i] = if d == 0.0 {
                    if n == 0.0 {
                        return Err(RangeError::ZeroOverZero);
                    }
                    f64::INFINITY.copysign(n * approach)
                } else {
                    n / d
                };
                i += 1;
            }
        }
        Ok(Range::from_corners(&corners))
    }

    /// The reciprocal `1 / self`.
    pub fn invert(&self) -> Result<Range, RangeError> {
        Range::exact(1.0).checked_div(self)
    }

    /// Clamps a value into this range.
    pub fn bound(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }

    fn from_corners(corners: &[f64]) -> Range {
        let lower = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Range { lower, upper }
    }
}

impl Add for Range {
    type Output = Range;

    fn add(self, rhs: Range) -> Range {
        Range {
            lower: self.lower + rhs.lower,
            upper: self.upper + rhs.upper,
        }
    }
}

impl Sub for Range {
    type Output = Range;

    fn sub(self, rhs: Range) -> Range {
        self + (-rhs)
    }
}

impl Neg for Range {
    type Output = Range;

    fn neg(self) -> Range {
        Range {
            lower: -self.upper,
            upper: -self.lower,
        }
    }
}

impl Mul for Range {
    type Output = Range;

    fn mul(self, rhs: Range) -> Range {
        Range::from_corners(&[
            self.lower * rhs.lower,
            self.lower * rhs.upper,
            self.upper * rhs.lower,
            self.upper * rhs.upper,
        ])
    }
}

impl Mul<f64> for Range {
    type Output = Range;

    fn mul(self, rhs: f64) -> Range {
        self.scale(rhs)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(lower: f64, upper: f64) -> Range {
        Range::new(lower, upper).unwrap()
    }

    #[test]
    fn rejects_inverted() {
        assert!(matches!(
            Range::new(2.0, 1.0),
            Err(RangeError::Inverted { .. })
        ));
        assert!(Range::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn tolerance() {
        let t = Range::from_tolerance(10.0, 0.1).unwrap();
        assert!((t.lower - 9.0).abs() < 1e-9);
        assert!((t.upper - 11.0).abs() < 1e-9);
        assert!((t.center() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn add_and_sub() {
        assert_eq!(r(0.0, 1.0) + r(0.0, 2.0), r(0.0, 3.0));
        assert_eq!(r(5.0, 6.0) - r(1.0, 2.0), r(3.0, 5.0));
        assert_eq!(-r(1.0, 2.0), r(-2.0, -1.0));
    }

    #[test]
    fn mul_uses_corners() {
        assert_eq!(r(-1.0, 2.0) * r(3.0, 4.0), r(-4.0, 8.0));
        assert_eq!(r(1.0, 2.0) * -2.0, r(-4.0, -2.0));
    }

    #[test]
    fn div_by_scalar_zero() {
        assert_eq!(
            r(1.0, 2.0).checked_div_scalar(0.0).unwrap(),
            Range::exact(f64::INFINITY)
        );
        assert_eq!(r(-1.0, 2.0).checked_div_scalar(0.0).unwrap(), Range::all());
        assert_eq!(
            r(0.0, 2.0).checked_div_scalar(0.0),
            Err(RangeError::ZeroOverZero)
        );
        assert_eq!(r(2.0, 4.0).checked_div_scalar(-2.0).unwrap(), r(-2.0, -1.0));
    }

    #[test]
    fn div_by_range() {
        assert_eq!(r(2.0, 4.0).checked_div(&r(1.0, 2.0)).unwrap(), r(1.0, 4.0));
        let open = r(1.0, 2.0).checked_div(&r(0.0, 1.0)).unwrap();
        assert_eq!(open, r(1.0, f64::INFINITY));
        assert_eq!(
            r(0.0, 1.0).checked_div(&r(0.0, 1.0)),
            Err(RangeError::ZeroOverZero)
        );
    }

    #[test]
    fn div_by_range_spanning_zero() {
        assert_eq!(r(1.0, 2.0).checked_div(&r(-1.0, 1.0)).unwrap(), Range::all());
        assert_eq!(r(-2.0, 3.0).checked_div(&r(-1.0, 1.0)).unwrap(), Range::all());
        assert_eq!(
            r(0.0, 2.0).checked_div(&r(-1.0, 1.0)),
            Err(RangeError::ZeroOverZero)
        );
    }

    #[test]
    fn invert() {
        assert_eq!(r(2.0, 4.0).invert().unwrap(), r(0.25, 0.5));
        assert_eq!(r(0.0, 2.0).invert().unwrap(), r(0.5, f64::INFINITY));
        assert_eq!(r(-2.0, 0.0).invert().unwrap(), r(f64::NEG_INFINITY, -0.5));
        assert_eq!(r(-1.0, 1.0).invert().unwrap(), Range::all());
    }

    #[test]
    fn intersect_and_hull() {
        assert_eq!(r(0.0, 5.0).intersect(&r(3.0, 8.0)).unwrap(), r(3.0, 5.0));
        assert!(matches!(
            r(0.0, 1.0).intersect(&r(2.0, 3.0)),
            Err(RangeError::Disjoint(..))
        ));
        assert_eq!(r(0.0, 1.0).hull(&r(2.0, 3.0)), r(0.0, 3.0));
        assert!(r(0.0, 1.0).intersects(&r(1.0, 2.0)));
    }

    #[test]
    fn containment() {
        assert!(r(0.0, 10.0).contains(&r(1.0, 2.0)));
        assert!(!r(0.0, 10.0).contains(&r(-1.0, 2.0)));
        assert!(r(0.0, 10.0).contains_value(10.0));
        assert_eq!(r(0.0, 10.0).bound(12.0), 10.0);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", r(4.5, 5.5)), "[4.5, 5.5]");
    }

    #[test]
    fn serde_roundtrip() {
        let range = r(0.5, 1.5);
        let json = serde_json::to_string(&range).unwrap();
        let back: Range = serde_json::from_str(&json).unwrap();
        assert_eq!(range, back);
    }
}
