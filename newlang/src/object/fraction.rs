//! Exact rational values: arbitrary-precision numerator over a
//! positive denominator, reduced after every operation.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::NlError;

/// A reduced fraction `num \ den` with `den > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fraction {
    num: BigInt,
    den: BigInt,
}

impl Fraction {
    /// Build and reduce; the denominator must be non-zero.
    pub fn new(num: BigInt, den: BigInt) -> Result<Fraction, NlError> {
        if den.is_zero() {
            return Err(NlError::value("fraction denominator is zero".to_string()));
        }
        let mut fraction = Fraction { num, den };
        fraction.reduce();
        Ok(fraction)
    }

    pub fn from_i64(value: i64) -> Fraction {
        Fraction {
            num: BigInt::from(value),
            den: BigInt::from(1),
        }
    }

    /// Parse the literal form `N\D`.
    pub fn parse(text: &str) -> Result<Fraction, NlError> {
        let (num, den) = text
            .split_once('\\')
            .ok_or_else(|| NlError::value(format!("malformed fraction literal '{text}'")))?;
        let num: BigInt = num
            .parse()
            .map_err(|_| NlError::value(format!("malformed fraction numerator '{num}'")))?;
        let den: BigInt = den
            .parse()
            .map_err(|_| NlError::value(format!("malformed fraction denominator '{den}'")))?;
        Fraction::new(num, den)
    }

    fn reduce(&mut self) {
        if self.den.is_negative() {
            self.num = -std::mem::take(&mut self.num);
            self.den = -std::mem::take(&mut self.den);
        }
        let gcd = self.num.gcd(&self.den);
        if !gcd.is_zero() {
            self.num /= &gcd;
            self.den /= &gcd;
        }
        if self.num.is_zero() {
            self.den = BigInt::from(1);
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    pub fn denominator(&self) -> &BigInt {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn to_f64(&self) -> f64 {
        let num = self.num.to_f64().unwrap_or(f64::NAN);
        let den = self.den.to_f64().unwrap_or(f64::NAN);
        num / den
    }

    pub fn add(&self, other: &Fraction) -> Fraction {
        let num = &self.num * &other.den + &other.num * &self.den;
        let den = &self.den * &other.den;
        Fraction::new(num, den).expect("denominators are non-zero")
    }

    pub fn sub(&self, other: &Fraction) -> Fraction {
        let num = &self.num * &other.den - &other.num * &self.den;
        let den = &self.den * &other.den;
        Fraction::new(num, den).expect("denominators are non-zero")
    }

    pub fn mul(&self, other: &Fraction) -> Fraction {
        Fraction::new(&self.num * &other.num, &self.den * &other.den)
            .expect("denominators are non-zero")
    }

    pub fn div(&self, other: &Fraction) -> Result<Fraction, NlError> {
        if other.is_zero() {
            return Err(NlError::value("division by zero fraction".to_string()));
        }
        Fraction::new(&self.num * &other.den, &self.den * &other.num)
    }

    /// `//` — the floored exact quotient, as an integer-valued
    /// fraction: floor((a·d) / (b·c)).
    pub fn floor_div(&self, other: &Fraction) -> Result<Fraction, NlError> {
        if other.is_zero() {
            return Err(NlError::value("division by zero fraction".to_string()));
        }
        let num = &self.num * &other.den;
        let den = &self.den * &other.num;
        Ok(Fraction {
            num: num.div_floor(&den),
            den: BigInt::from(1),
        })
    }

    /// `%` — remainder consistent with [`Fraction::floor_div`], so the
    /// sign follows the divisor and `a == (a // b)·b + (a % b)`.
    pub fn modulo(&self, other: &Fraction) -> Result<Fraction, NlError> {
        let quotient = self.floor_div(other)?;
        Ok(self.sub(&quotient.mul(other)))
    }

    pub fn neg(&self) -> Fraction {
        Fraction {
            num: -self.num.clone(),
            den: self.den.clone(),
        }
    }

    pub fn pow(&self, exponent: i64) -> Result<Fraction, NlError> {
        let magnitude = exponent.unsigned_abs() as u32;
        let num = self.num.pow(magnitude);
        let den = self.den.pow(magnitude);
        if exponent >= 0 {
            Fraction::new(num, den)
        } else {
            Fraction::new(den, num)
        }
    }

    /// Cross-multiply comparison; exact for any magnitudes.
    pub fn compare(&self, other: &Fraction) -> std::cmp::Ordering {
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\\{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fraction(text: &str) -> Fraction {
        Fraction::parse(text).unwrap()
    }

    #[test]
    fn always_reduced_with_positive_denominator() {
        let f = Fraction::new(BigInt::from(4), BigInt::from(-8)).unwrap();
        assert_eq!(f.to_string(), "-1\\2");
        assert_eq!(f.denominator(), &BigInt::from(2));

        let zero = Fraction::new(BigInt::from(0), BigInt::from(17)).unwrap();
        assert_eq!(zero.to_string(), "0\\1");
    }

    #[test]
    fn addition_matches_the_hundred_thirds_case() {
        let sum = fraction("100\\1").add(&fraction("1\\3"));
        assert_eq!(sum.to_string(), "301\\3");
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = fraction("1\\3");
        let b = fraction("1\\6");
        assert_eq!(a.add(&b).to_string(), "1\\2");
        assert_eq!(a.sub(&b).to_string(), "1\\6");
        assert_eq!(a.mul(&b).to_string(), "1\\18");
        assert_eq!(a.div(&b).unwrap().to_string(), "2\\1");
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!(Fraction::parse("1\\0").is_err());
        assert!(fraction("1\\3").div(&fraction("0\\5")).is_err());
        assert!(fraction("1\\3").floor_div(&fraction("0\\5")).is_err());
        assert!(fraction("1\\3").modulo(&fraction("0\\5")).is_err());
    }

    #[test]
    fn floor_division_is_exact_and_floored() {
        let half = fraction("1\\2");
        let third = fraction("1\\3");
        assert_eq!(half.floor_div(&third).unwrap().to_string(), "1\\1");
        assert_eq!(third.floor_div(&half).unwrap().to_string(), "0\\1");
        // floor, not truncation, for negative quotients
        assert_eq!(
            fraction("-1\\2").floor_div(&third).unwrap().to_string(),
            "-2\\1"
        );
        assert_eq!(
            half.floor_div(&fraction("-1\\3")).unwrap().to_string(),
            "-2\\1"
        );
    }

    #[test]
    fn modulo_pairs_with_floor_division() {
        let half = fraction("1\\2");
        let third = fraction("1\\3");
        assert_eq!(half.modulo(&third).unwrap().to_string(), "1\\6");
        assert_eq!(
            fraction("-1\\2").modulo(&third).unwrap().to_string(),
            "1\\6"
        );

        // a == (a // b)·b + (a % b)
        for (a, b) in [("7\\3", "2\\5"), ("-7\\3", "2\\5"), ("7\\3", "-2\\5")] {
            let a = fraction(a);
            let b = fraction(b);
            let rebuilt = a.floor_div(&b).unwrap().mul(&b).add(&a.modulo(&b).unwrap());
            assert_eq!(rebuilt, a);
        }
    }

    #[test]
    fn comparison_cross_multiplies() {
        assert_eq!(
            fraction("1\\3").compare(&fraction("1\\2")),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            fraction("2\\4").compare(&fraction("1\\2")),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn negative_power_inverts() {
        let f = fraction("2\\3");
        assert_eq!(f.pow(2).unwrap().to_string(), "4\\9");
        assert_eq!(f.pow(-1).unwrap().to_string(), "3\\2");
    }
}
