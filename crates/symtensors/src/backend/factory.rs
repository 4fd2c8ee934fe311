//! Backend construction and the backend cache.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AbelianBackend, NoSymmetryBackend, SharedBackend, SymmetryBackendKind};
use crate::block::{FaerBlockBackend, NaiveBlockBackend};
use crate::config::{BlockBackendKind, BlockBackendOptions};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;

/// Everything that distinguishes two backend instances.
pub type BackendKey = (SymmetryBackendKind, BlockBackendKind, BlockBackendOptions);

/// Build a fresh backend of the given kinds.
///
/// # Errors
///
/// Returns [`TensorError::NotImplemented`] for the nonabelian kind and for
/// reserved block backends.
pub fn create_backend<T: Scalar>(
    kind: SymmetryBackendKind,
    block_kind: BlockBackendKind,
    options: BlockBackendOptions,
) -> Result<SharedBackend<T>, TensorError> {
    if !block_kind.is_implemented() {
        return Err(TensorError::not_implemented(format!("block backend {}", block_kind)));
    }
    let backend: SharedBackend<T> = match (kind, block_kind) {
        (SymmetryBackendKind::Nonabelian, _) => {
            return Err(TensorError::not_implemented(format!(
                "{} backend on {} blocks",
                kind, block_kind
            )))
        }
        (SymmetryBackendKind::NoSymmetry, BlockBackendKind::Naive) => Arc::new(NoSymmetryBackend::new(NaiveBlockBackend)),
        (SymmetryBackendKind::NoSymmetry, _) => Arc::new(NoSymmetryBackend::new(FaerBlockBackend::new(options))),
        (SymmetryBackendKind::Abelian, BlockBackendKind::Naive) => Arc::new(AbelianBackend::new(NaiveBlockBackend)),
        (SymmetryBackendKind::Abelian, _) => Arc::new(AbelianBackend::new(FaerBlockBackend::new(options))),
    };
    Ok(backend)
}

/// A backend for `symmetry` on faer blocks with default options.
pub fn default_backend<T: Scalar>(symmetry: &Symmetry) -> Result<SharedBackend<T>, TensorError> {
    symmetry.check()?;
    create_backend(
        SymmetryBackendKind::select(symmetry),
        BlockBackendKind::default(),
        BlockBackendOptions::default(),
    )
}

/// Cache of shared backend instances.
///
/// The first request for a key builds the backend, later requests hand out
/// the same `Arc`. Entries are never evicted. The cache is a plain value;
/// share it behind a lock if several threads need it.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use symtensors::{BackendCache, BlockBackendKind, Symmetry};
///
/// let mut cache = BackendCache::<f64>::new();
/// let a = cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, None).unwrap();
/// let b = cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, None).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct BackendCache<T: Scalar> {
    backends: HashMap<BackendKey, SharedBackend<T>>,
}

impl<T: Scalar> Default for BackendCache<T> {
    fn default() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }
}

impl<T: Scalar> BackendCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// A backend for tensors with legs of `symmetry`.
    ///
    /// Without an explicit `kind` the kind is chosen from the symmetry.
    pub fn get_backend(
        &mut self,
        symmetry: &Symmetry,
        block_kind: BlockBackendKind,
        kind: Option<SymmetryBackendKind>,
    ) -> Result<SharedBackend<T>, TensorError> {
        self.get_backend_with_options(symmetry, block_kind, kind, BlockBackendOptions::default())
    }

    /// Like [`BackendCache::get_backend`], with explicit block backend options.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::NotSupported`] if an explicit `kind` cannot
    /// store `symmetry`, and [`TensorError::NotImplemented`] for
    /// unimplemented kinds.
    pub fn get_backend_with_options(
        &mut self,
        symmetry: &Symmetry,
        block_kind: BlockBackendKind,
        kind: Option<SymmetryBackendKind>,
        options: BlockBackendOptions,
    ) -> Result<SharedBackend<T>, TensorError> {
        symmetry.check()?;
        let kind = match kind {
            None => SymmetryBackendKind::select(symmetry),
            Some(kind) => {
                let fits = match kind {
                    SymmetryBackendKind::NoSymmetry => symmetry.is_trivial(),
                    SymmetryBackendKind::Abelian => symmetry.is_abelian(),
                    SymmetryBackendKind::Nonabelian => true,
                };
                if !fits {
                    return Err(TensorError::NotSupported {
                        what: format!("{} backend for symmetry {}", kind, symmetry),
                    });
                }
                kind
            }
        };
        let key = (kind, block_kind, options);
        if let Some(backend) = self.backends.get(&key) {
            return Ok(Arc::clone(backend));
        }
        let backend = create_backend::<T>(kind, block_kind, options)?;
        tracing::debug!(kind = %kind, block = %block_kind, threads = options.threads, "created backend");
        self.backends.insert(key, Arc::clone(&backend));
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selection() {
        let mut cache = BackendCache::<f64>::new();
        let trivial = cache.get_backend(&Symmetry::NoSymmetry, BlockBackendKind::Faer, None).unwrap();
        assert_eq!(trivial.kind(), SymmetryBackendKind::NoSymmetry);
        let z3 = cache.get_backend(&Symmetry::ZN(3), BlockBackendKind::Naive, None).unwrap();
        assert_eq!(z3.kind(), SymmetryBackendKind::Abelian);
        assert_eq!(z3.block_backend().kind(), BlockBackendKind::Naive);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_same_key_shares_instance() {
        let mut cache = BackendCache::<f64>::new();
        let a = cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, None).unwrap();
        let b = cache
            .get_backend(&Symmetry::ZN(2), BlockBackendKind::Faer, Some(SymmetryBackendKind::Abelian))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let threaded = cache
            .get_backend_with_options(
                &Symmetry::U1,
                BlockBackendKind::Faer,
                None,
                BlockBackendOptions::default().with_threads(2),
            )
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &threaded));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unavailable_combinations() {
        let mut cache = BackendCache::<f64>::new();
        assert!(matches!(
            cache.get_backend(&Symmetry::SU2, BlockBackendKind::Faer, None),
            Err(TensorError::NotImplemented { .. })
        ));
        assert!(matches!(
            cache.get_backend(&Symmetry::U1, BlockBackendKind::Torch, None),
            Err(TensorError::NotImplemented { .. })
        ));
        assert!(matches!(
            cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, Some(SymmetryBackendKind::NoSymmetry)),
            Err(TensorError::NotSupported { .. })
        ));
        // an abelian backend can still store tensors without symmetry
        let backend = cache
            .get_backend(&Symmetry::NoSymmetry, BlockBackendKind::Faer, Some(SymmetryBackendKind::Abelian))
            .unwrap();
        assert_eq!(backend.kind(), SymmetryBackendKind::Abelian);
        assert!(cache.get_backend(&Symmetry::SU2, BlockBackendKind::Faer, None).is_err());
        assert_eq!(cache.len(), 1);
    }
}
