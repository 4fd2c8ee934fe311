//! symtensors - tensors with symmetry-sector structure
//!
//! Tensors whose legs carry a representation of a symmetry group, stored
//! as dense blocks indexed by symmetry sectors, with swappable storage
//! backends and sparse linear operators for iterative eigensolvers.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Tensor facade (tensor module)
//!     → labels, leg references, tdot, combine/split, svd, qr, exp, log
//!     → LinearOperator wrappers (sparse module)
//!
//! Level 2: Symmetry backends (backend module)
//!     → NoSymmetryBackend (one dense block)
//!     → AbelianBackend (block-sparse by sector)
//!     → NonabelianBackend (declared, not implemented)
//!
//! Level 3: Block backends (block module)
//!     → FaerBlockBackend (faer matmul and decompositions)
//!     → NaiveBlockBackend (plain loops)
//! ```
//!
//! Legs are [`VectorSpace`]s over a [`Symmetry`]; blocks are column-major
//! [`Block`]s.
//!
//! # Example
//!
//! ```
//! use symtensors::{default_backend, Sector, Symmetry, Tensor, VectorSpace};
//!
//! let backend = default_backend::<f64>(&Symmetry::U1).unwrap();
//! let leg = VectorSpace::new(
//!     Symmetry::U1,
//!     vec![Sector::new(&[-1]), Sector::new(&[0]), Sector::new(&[1])],
//!     vec![1, 2, 1],
//!     false,
//! )
//! .unwrap();
//! let id = Tensor::eye(&backend, vec![leg], ["p", "p*"]).unwrap();
//! assert_eq!(id.dims(), vec![4, 4]);
//! assert_eq!(id.trace(&["p"], &["p*"]).unwrap().item().unwrap(), 4.0);
//! ```

pub mod backend;
pub mod block;
pub mod config;
pub mod error;
pub mod random;
pub mod scalar;
pub mod space;
pub mod sparse;
pub mod strides;
pub mod symmetry;
pub mod tensor;

pub use backend::{
    create_backend, default_backend, AbelianBackend, AbelianData, BackendCache, NoSymmetryBackend, NonabelianBackend,
    SharedBackend, SymmetryBackend, SymmetryBackendKind, TensorData,
};
pub use block::{Block, BlockBackend, BlockIndex, FaerBlockBackend, NaiveBlockBackend};
pub use config::{BlockBackendKind, BlockBackendOptions, CombineOptions, SvdAlgorithm, Tolerance};
pub use error::TensorError;
pub use scalar::{c32, c64, Dtype, Scalar};
pub use space::{ProductSpace, VectorSpace};
pub use sparse::{
    gram_schmidt, unwrapped, LinearOperator, ProjectedOperator, ShiftedOperator, SumOperator, TensorLinearOperator,
};
pub use symmetry::{Sector, Symmetry};
pub use tensor::{IntoLabels, LegRef, Shape, Tensor, TensorSvd, Unlabelled};
