/*!
    Rational numbers for time bases and frame rates.
*/

use std::fmt;

/**
    A rational number, `num / den`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns the value as a float, or zero for a zero denominator.
    */
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /**
        Returns `den / num`. A frame rate of 25/1 inverts to a 1/25 time base.
    */
    pub const fn invert(self) -> Self {
        Self::new(self.den, self.num)
    }

    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    /**
        Rescale a timestamp from this time base to `to`, rounding to nearest.
    */
    pub fn rescale(self, value: i64, to: Rational) -> i64 {
        let numerator = value as i128 * self.num as i128 * to.den as i128;
        let denominator = self.den as i128 * to.num as i128;
        if denominator == 0 {
            return 0;
        }
        let (numerator, denominator) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        rounded as i64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
