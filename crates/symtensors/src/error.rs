//! Error types for symtensors.

use thiserror::Error;

/// Errors that can occur in tensor, backend and operator routines.
#[derive(Debug, Error)]
pub enum TensorError {
    // construction validity
    /// Number of labels differs from the number of legs.
    #[error("expected {legs} labels (one per leg), got {labels}")]
    LabelCountMismatch { legs: usize, labels: usize },

    /// The same label appears on two legs.
    #[error("duplicate label {label:?}")]
    DuplicateLabel { label: String },

    /// A sector has the wrong number of entries for its symmetry.
    #[error("sector {sector} has length {actual}, but {symmetry} expects {expected}")]
    SectorLengthMismatch {
        sector: String,
        symmetry: String,
        expected: usize,
        actual: usize,
    },

    /// A sector is not a valid irrep label of its symmetry.
    #[error("invalid sector {sector} for symmetry {symmetry}")]
    InvalidSector { sector: String, symmetry: String },

    /// A symmetry group is malformed, for example `ZN(0)`.
    #[error("invalid symmetry {symmetry}: {message}")]
    InvalidSymmetry { symmetry: String, message: String },

    /// A multiplicity is zero or sector and multiplicity counts differ.
    #[error("invalid multiplicities: {message}")]
    InvalidMultiplicity { message: String },

    /// Shape mismatch between two blocks or a block and its legs.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Data length does not match the requested shape.
    #[error("data length mismatch: expected {expected} elements, got {actual}")]
    DataLengthMismatch { expected: usize, actual: usize },

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for {ndim} legs")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },

    // compatibility
    /// Two legs that should be contracted are not dual to each other.
    #[error("legs are not contractible: {left} vs {right}")]
    IncompatibleLegs { left: String, right: String },

    /// Objects built on different symmetries were combined.
    #[error("symmetry mismatch: {expected} vs {actual}")]
    SymmetryMismatch { expected: String, actual: String },

    /// Tensors entering an elementwise operation have different legs or labels.
    #[error("leg mismatch: {message}")]
    LegMismatch { message: String },

    /// A dense array has weight outside the symmetry-allowed blocks.
    #[error("data violates the symmetry: norm {norm:e} outside allowed blocks exceeds tolerance {atol:e}")]
    SymmetryViolation { norm: f64, atol: f64 },

    // lookup
    /// A label does not name any leg.
    #[error("label {label:?} not found, available labels are {available:?}")]
    LabelNotFound {
        label: String,
        available: Vec<Option<String>>,
    },

    /// An integer leg index is out of range.
    #[error("leg index {index} out of range for tensor with {num_legs} legs")]
    AxisOutOfRange { index: isize, num_legs: usize },

    /// `None` was used to address a leg.
    #[error("unlabelled legs cannot be addressed by label, use an integer index instead")]
    UnlabelledLookup,

    /// A leg that is not a composite leg was asked to be split.
    #[error("leg {index} is not a product space and cannot be split")]
    NotAProductSpace { index: usize },

    // capability
    /// The requested functionality is not implemented.
    #[error("not implemented: {what}")]
    NotImplemented { what: String },

    /// The requested functionality is not supported for these inputs.
    #[error("not supported: {what}")]
    NotSupported { what: String },

    /// Unknown SVD algorithm name.
    #[error("unknown SVD algorithm {name:?}, expected one of gesdd, gesvd, robust, robust_silent")]
    UnknownSvdAlgorithm { name: String },

    /// Unknown block backend name.
    #[error("unknown block backend {name:?}")]
    UnknownBackend { name: String },

    /// A linear operator cannot provide its adjoint.
    #[error("adjoint of {operator} is not defined")]
    AdjointUndefined { operator: String },

    /// Tensors do not support `==`.
    #[error("tensors cannot be compared with ==, use almost_equal instead")]
    ComparisonUndefined,

    // numerical
    /// SVD computation error.
    #[error("SVD error: {message}")]
    SvdError { message: String },

    /// Matrix exponential error.
    #[error("matrix exponential error: {message}")]
    MatrixExpError { message: String },

    /// Matrix logarithm error.
    #[error("matrix logarithm error: {message}")]
    MatrixLogError { message: String },

    /// Fusing sector labels left the range of `i64`.
    #[error("sector labels of {symmetry} overflow when fusing {a} with {b}")]
    SectorOverflow { symmetry: String, a: String, b: String },

    /// Matrix must be square.
    #[error("matrix must be square: got {rows}x{cols}")]
    NotSquareMatrix { rows: usize, cols: usize },

    /// A linear system has no unique solution.
    #[error("matrix is singular")]
    SingularMatrix,

    // misc
    /// Scalar conversion of a tensor with more than one entry.
    #[error("tensor with {size} entries cannot be converted to a scalar")]
    NotScalar { size: usize },

    /// Unwrapping nested operators did not terminate.
    #[error("operator nesting exceeds {depth} levels")]
    UnwrapDepthExceeded { depth: usize },

    /// Tensor data layout does not match the backend handling it.
    #[error("data layout mismatch: expected {expected} data, got {actual}")]
    DataMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl TensorError {
    pub(crate) fn not_implemented(what: impl Into<String>) -> Self {
        TensorError::NotImplemented { what: what.into() }
    }

    pub(crate) fn leg_mismatch(message: impl Into<String>) -> Self {
        TensorError::LegMismatch {
            message: message.into(),
        }
    }
}
