//! Typed configuration values shared by the backends and the tensor facade.

use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

/// Driver used for matrix singular value decompositions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SvdAlgorithm {
    /// faer's divide-and-conquer driver.
    #[default]
    Default,
    /// One-sided Jacobi rotations; slower but converges for any finite input.
    Fallback,
    /// Try [`SvdAlgorithm::Default`], retry with [`SvdAlgorithm::Fallback`] on failure.
    Robust,
    /// Same as `Robust` without logging the retry.
    RobustSilent,
}

impl FromStr for SvdAlgorithm {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gesdd" | "default" => Ok(SvdAlgorithm::Default),
            "gesvd" | "fallback" | "jacobi" => Ok(SvdAlgorithm::Fallback),
            "robust" => Ok(SvdAlgorithm::Robust),
            "robust_silent" => Ok(SvdAlgorithm::RobustSilent),
            other => Err(TensorError::UnknownSvdAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SvdAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SvdAlgorithm::Default => "gesdd",
            SvdAlgorithm::Fallback => "gesvd",
            SvdAlgorithm::Robust => "robust",
            SvdAlgorithm::RobustSilent => "robust_silent",
        };
        f.write_str(name)
    }
}

/// Relative and absolute tolerance for approximate comparisons.
///
/// Two values `a`, `b` are close when `|a - b| <= atol + rtol * |b|`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    #[inline]
    pub fn is_close(&self, diff: f64, reference: f64) -> bool {
        diff <= self.atol + self.rtol * reference
    }
}

/// Options passed to a block backend on construction.
///
/// Part of the backend cache key, so two backends with different options
/// are distinct instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockBackendOptions {
    /// Number of threads faer kernels may use. `1` runs sequentially.
    pub threads: usize,
}

impl Default for BlockBackendOptions {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl BlockBackendOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub(crate) fn parallelism(&self) -> faer::Par {
        if self.threads <= 1 {
            faer::Par::Seq
        } else {
            faer::Par::rayon(self.threads)
        }
    }
}

/// Family of block backend.
///
/// `Gpu`, `Tpu` and `Torch` are reserved names; requesting them yields
/// [`TensorError::NotImplemented`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockBackendKind {
    #[default]
    Faer,
    Naive,
    Gpu,
    Tpu,
    Torch,
}

impl BlockBackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockBackendKind::Faer => "faer",
            BlockBackendKind::Naive => "naive",
            BlockBackendKind::Gpu => "gpu",
            BlockBackendKind::Tpu => "tpu",
            BlockBackendKind::Torch => "torch",
        }
    }

    pub fn is_implemented(self) -> bool {
        matches!(self, BlockBackendKind::Faer | BlockBackendKind::Naive)
    }
}

impl FromStr for BlockBackendKind {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faer" | "cpu" => Ok(BlockBackendKind::Faer),
            "naive" => Ok(BlockBackendKind::Naive),
            "gpu" => Ok(BlockBackendKind::Gpu),
            "tpu" => Ok(BlockBackendKind::Tpu),
            "torch" => Ok(BlockBackendKind::Torch),
            other => Err(TensorError::UnknownBackend {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BlockBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for [`Tensor::combine_legs`](crate::Tensor::combine_legs).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CombineOptions {
    /// Final position of each combined leg. Defaults to the position of
    /// the smallest axis in each group.
    pub new_axes: Option<Vec<usize>>,
    /// Duality flag of each new composite leg. Defaults to the duality of
    /// the first leg in each group.
    pub product_spaces_dual: Option<Vec<bool>>,
}

impl CombineOptions {
    pub fn with_new_axes(mut self, new_axes: Vec<usize>) -> Self {
        self.new_axes = Some(new_axes);
        self
    }

    pub fn with_product_spaces_dual(mut self, dual: Vec<bool>) -> Self {
        self.product_spaces_dual = Some(dual);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svd_algorithm_names() {
        assert_eq!("gesdd".parse::<SvdAlgorithm>().unwrap(), SvdAlgorithm::Default);
        assert_eq!("gesvd".parse::<SvdAlgorithm>().unwrap(), SvdAlgorithm::Fallback);
        assert_eq!("robust".parse::<SvdAlgorithm>().unwrap(), SvdAlgorithm::Robust);
        assert_eq!(
            "robust_silent".parse::<SvdAlgorithm>().unwrap(),
            SvdAlgorithm::RobustSilent
        );
        assert!(matches!(
            "lapack".parse::<SvdAlgorithm>(),
            Err(TensorError::UnknownSvdAlgorithm { .. })
        ));
        assert_eq!(SvdAlgorithm::RobustSilent.to_string(), "robust_silent");
    }

    #[test]
    fn test_tolerance_builder() {
        let tol = Tolerance::default().with_rtol(0.0).with_atol(1e-3);
        assert!(tol.is_close(5e-4, 100.0));
        assert!(!tol.is_close(2e-3, 100.0));
    }

    #[test]
    fn test_block_backend_names() {
        assert_eq!("cpu".parse::<BlockBackendKind>().unwrap(), BlockBackendKind::Faer);
        assert_eq!("naive".parse::<BlockBackendKind>().unwrap(), BlockBackendKind::Naive);
        assert!(!"torch".parse::<BlockBackendKind>().unwrap().is_implemented());
        assert!(matches!(
            "numpy".parse::<BlockBackendKind>(),
            Err(TensorError::UnknownBackend { .. })
        ));
    }

    #[test]
    fn test_threads_clamped() {
        let opts = BlockBackendOptions::default().with_threads(0);
        assert_eq!(opts.threads, 1);
        assert!(matches!(opts.parallelism(), faer::Par::Seq));
    }
}
