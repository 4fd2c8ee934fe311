//! Scalar trait for tensor element types and the enumerated dtype.

use faer_traits::ComplexField;
use std::fmt::{self, Debug};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

pub use faer::{c32, c64};

/// Enumerated scalar kind of a tensor's entries.
///
/// Backends map their native element types to and from this enum, so
/// comparing dtypes never requires inspecting a concrete block type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dtype {
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Dtype {
    /// Whether entries of this kind are real numbers.
    pub fn is_real(self) -> bool {
        matches!(self, Dtype::Float32 | Dtype::Float64)
    }

    /// The complex kind with the same precision.
    pub fn to_complex(self) -> Dtype {
        match self {
            Dtype::Float32 | Dtype::Complex64 => Dtype::Complex64,
            Dtype::Float64 | Dtype::Complex128 => Dtype::Complex128,
        }
    }

    /// The real kind with the same precision.
    pub fn to_real(self) -> Dtype {
        match self {
            Dtype::Float32 | Dtype::Complex64 => Dtype::Float32,
            Dtype::Float64 | Dtype::Complex128 => Dtype::Float64,
        }
    }

    /// Size of one entry in bits.
    pub fn bits(self) -> usize {
        match self {
            Dtype::Float32 => 32,
            Dtype::Float64 | Dtype::Complex64 => 64,
            Dtype::Complex128 => 128,
        }
    }

    /// The smallest kind that can represent values of both `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use symtensors::Dtype;
    ///
    /// assert_eq!(Dtype::Float32.common(Dtype::Float64), Dtype::Float64);
    /// assert_eq!(Dtype::Float64.common(Dtype::Complex64), Dtype::Complex128);
    /// ```
    pub fn common(self, other: Dtype) -> Dtype {
        let is_real = self.is_real() && other.is_real();
        let double = matches!(self.to_real(), Dtype::Float64) || matches!(other.to_real(), Dtype::Float64);
        match (is_real, double) {
            (true, false) => Dtype::Float32,
            (true, true) => Dtype::Float64,
            (false, false) => Dtype::Complex64,
            (false, true) => Dtype::Complex128,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Complex64 => "complex64",
            Dtype::Complex128 => "complex128",
        };
        f.write_str(name)
    }
}

/// Trait for scalar types supported by symtensors.
///
/// This trait wraps faer's `ComplexField` so that every element type can be
/// handed to faer's kernels directly, and adds the arithmetic and conversion
/// helpers used by the block and symmetry backends. Real-valued quantities
/// (norms, tolerances, singular value magnitudes) are always `f64`.
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// The dtype tag for this element type.
    const DTYPE: Dtype;

    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    fn from_f64(value: f64) -> Self;

    /// Convert from a complex number, dropping the imaginary part for real types.
    fn from_c64(value: c64) -> Self;

    fn to_c64(self) -> c64;

    fn conjugate(self) -> Self;

    fn real_part(self) -> f64;

    fn imag_part(self) -> f64;

    /// Squared modulus `|x|^2`.
    fn abs_sqr(self) -> f64 {
        let re = self.real_part();
        let im = self.imag_part();
        re * re + im * im
    }

    /// Modulus `|x|`.
    fn magnitude(self) -> f64 {
        self.abs_sqr().sqrt()
    }

    /// Convert to another scalar type through `c64`.
    fn cast<U: Scalar>(self) -> U {
        U::from_c64(self.to_c64())
    }
}

macro_rules! impl_real_scalar {
    ($t:ty, $dtype:expr) => {
        impl Scalar for $t {
            const DTYPE: Dtype = $dtype;

            fn one() -> Self {
                1.0
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn from_c64(value: c64) -> Self {
                value.re as $t
            }

            fn to_c64(self) -> c64 {
                c64::new(self as f64, 0.0)
            }

            fn conjugate(self) -> Self {
                self
            }

            fn real_part(self) -> f64 {
                self as f64
            }

            fn imag_part(self) -> f64 {
                0.0
            }

            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }
        }
    };
}

macro_rules! impl_complex_scalar {
    ($t:ty, $re:ty, $dtype:expr) => {
        impl Scalar for $t {
            const DTYPE: Dtype = $dtype;

            fn one() -> Self {
                <$t>::new(1.0, 0.0)
            }

            fn from_f64(value: f64) -> Self {
                <$t>::new(value as $re, 0.0)
            }

            fn from_c64(value: c64) -> Self {
                <$t>::new(value.re as $re, value.im as $re)
            }

            fn to_c64(self) -> c64 {
                c64::new(self.re as f64, self.im as f64)
            }

            fn conjugate(self) -> Self {
                <$t>::new(self.re, -self.im)
            }

            fn real_part(self) -> f64 {
                self.re as f64
            }

            fn imag_part(self) -> f64 {
                self.im as f64
            }
        }
    };
}

impl_real_scalar!(f32, Dtype::Float32);
impl_real_scalar!(f64, Dtype::Float64);
impl_complex_scalar!(c32, f32, Dtype::Complex64);
impl_complex_scalar!(c64, f64, Dtype::Complex128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_is_real() {
        assert!(<f64 as ComplexField>::IS_REAL);
        assert!(f64::DTYPE.is_real());
    }

    #[test]
    fn test_c64_is_not_real() {
        assert!(!<c64 as ComplexField>::IS_REAL);
        assert_eq!(c64::DTYPE, Dtype::Complex128);
    }

    #[test]
    fn test_zero_one() {
        assert_eq!(f64::zero(), 0.0);
        assert_eq!(f32::one(), 1.0);
        assert_eq!(c64::zero(), c64::new(0.0, 0.0));
        assert_eq!(c32::one(), c32::new(1.0, 0.0));
    }

    #[test]
    fn test_conjugate_and_modulus() {
        let z = c64::new(3.0, -4.0);
        assert_eq!(z.conjugate(), c64::new(3.0, 4.0));
        assert_eq!(z.abs_sqr(), 25.0);
        assert_eq!(z.magnitude(), 5.0);
        assert_eq!((-2.5f64).magnitude(), 2.5);
    }

    #[test]
    fn test_cast_drops_imaginary_part() {
        let z = c64::new(1.5, 2.0);
        let x: f64 = z.cast();
        assert_eq!(x, 1.5);
        let w: c32 = 2.0f64.cast();
        assert_eq!(w, c32::new(2.0, 0.0));
    }

    #[test]
    fn test_dtype_common() {
        assert_eq!(Dtype::Float32.common(Dtype::Float32), Dtype::Float32);
        assert_eq!(Dtype::Float32.common(Dtype::Complex64), Dtype::Complex64);
        assert_eq!(Dtype::Complex64.common(Dtype::Float64), Dtype::Complex128);
        assert_eq!(Dtype::Float64.to_complex(), Dtype::Complex128);
        assert_eq!(Dtype::Complex64.to_real(), Dtype::Float32);
        assert_eq!(Dtype::Complex128.bits(), 128);
        assert_eq!(Dtype::Float64.to_string(), "float64");
    }
}
