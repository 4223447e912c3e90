//! value.rs
//! The complex scalar carried by every number in a circuit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A complex number. Plain data, no graph awareness.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    pub re: f64,
    pub im: f64,
}

impl Value {
    pub const ZERO: Value = Value { re: 0.0, im: 0.0 };
    pub const ONE: Value = Value { re: 1.0, im: 0.0 };

    pub const fn new(re: f64, im: f64) -> Self { Self { re, im } }
    pub const fn real(re: f64) -> Self { Self { re, im: 0.0 } }

    #[inline(always)]
    pub fn shift(&mut self, d_re: f64, d_im: f64) {
        self.re += d_re;
        self.im += d_im;
    }

    #[inline(always)]
    pub fn shifted(mut self, d_re: f64, d_im: f64) -> Self {
        self.shift(d_re, d_im);
        self
    }

    /// Modulus `|z|`.
    #[inline(always)]
    pub fn norm(self) -> f64 { self.re.hypot(self.im) }

    /// Principal argument in `(-pi, pi]`.
    pub fn arg(self) -> f64 { self.im.atan2(self.re) }

    pub fn is_zero(self) -> bool { self.re == 0.0 && self.im == 0.0 }

    pub fn is_finite(self) -> bool { self.re.is_finite() && self.im.is_finite() }

    pub fn exp(self) -> Self {
        let m = self.re.exp();
        Self::new(m * self.im.cos(), m * self.im.sin())
    }

    /// Principal natural logarithm. `ln(0)` has a `-inf` real part.
    pub fn ln(self) -> Self { Self::new(self.norm().ln(), self.arg()) }

    /// Principal complex power `self ^ exponent`.
    ///
    /// A zero base is special-cased: `0 ^ 0 = 1` and `0 ^ b = 0` for any other `b`.
    pub fn powc(self, exponent: Value) -> Self {
        if self.is_zero() {
            return if exponent.is_zero() { Self::ONE } else { Self::ZERO };
        }
        (exponent * self.ln()).exp()
    }
}

impl Add for Value {
    type Output = Value;
    fn add(self, rhs: Value) -> Value { Value::new(self.re + rhs.re, self.im + rhs.im) }
}

impl Sub for Value {
    type Output = Value;
    fn sub(self, rhs: Value) -> Value { Value::new(self.re - rhs.re, self.im - rhs.im) }
}

impl Mul for Value {
    type Output = Value;
    fn mul(self, rhs: Value) -> Value {
        Value::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Div for Value {
    type Output = Value;
    /// Division by zero is not trapped; the result is non-finite.
    fn div(self, rhs: Value) -> Value {
        let denominator = rhs.re * rhs.re + rhs.im * rhs.im;
        Value::new(
            (self.re * rhs.re + self.im * rhs.im) / denominator,
            (self.im * rhs.re - self.re * rhs.im) / denominator,
        )
    }
}

impl Neg for Value {
    type Output = Value;
    fn neg(self) -> Value { Value::new(-self.re, -self.im) }
}

impl From<f64> for Value {
    fn from(re: f64) -> Self { Value::real(re) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "{:.3}-{:.3}i", self.re, -self.im)
        } else {
            write!(f, "{:.3}+{:.3}i", self.re, self.im)
        }
    }
}
