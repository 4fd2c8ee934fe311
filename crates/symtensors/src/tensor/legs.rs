//! Leg labels and leg references.

use crate::error::TensorError;

/// Anything that can be turned into one optional label per leg.
///
/// ```
/// use symtensors::tensor::{IntoLabels, Unlabelled};
///
/// assert_eq!(["a", "b"].into_labels(2).unwrap(), vec![Some("a".to_string()), Some("b".to_string())]);
/// assert_eq!([Some("a"), None].into_labels(2).unwrap()[1], None);
/// assert_eq!(Unlabelled.into_labels(3).unwrap(), vec![None; 3]);
/// ```
pub trait IntoLabels {
    /// The labels of a tensor with `num_legs` legs.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::LabelCountMismatch`] if the count is wrong.
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError>;
}

/// No labels on any leg.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unlabelled;

impl IntoLabels for Unlabelled {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        Ok(vec![None; num_legs])
    }
}

fn counted(labels: Vec<Option<String>>, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
    if labels.len() != num_legs {
        return Err(TensorError::LabelCountMismatch {
            legs: num_legs,
            labels: labels.len(),
        });
    }
    Ok(labels)
}

impl IntoLabels for Vec<Option<String>> {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        counted(self, num_legs)
    }
}

impl IntoLabels for Vec<String> {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        counted(self.into_iter().map(Some).collect(), num_legs)
    }
}

impl IntoLabels for &[&str] {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        counted(self.iter().map(|s| Some(s.to_string())).collect(), num_legs)
    }
}

impl IntoLabels for Vec<&str> {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        self.as_slice().into_labels(num_legs)
    }
}

impl<const N: usize> IntoLabels for [&str; N] {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        self.as_slice().into_labels(num_legs)
    }
}

impl IntoLabels for &[Option<&str>] {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        counted(self.iter().map(|s| s.map(str::to_string)).collect(), num_legs)
    }
}

impl<const N: usize> IntoLabels for [Option<&str>; N] {
    fn into_labels(self, num_legs: usize) -> Result<Vec<Option<String>>, TensorError> {
        self.as_slice().into_labels(num_legs)
    }
}

/// A reference to one leg of a tensor: an axis or a label.
///
/// Negative axes count from the end. `Unlabelled` stands for a `None`
/// label and never resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegRef<'a> {
    Index(isize),
    Label(&'a str),
    Unlabelled,
}

impl From<isize> for LegRef<'_> {
    fn from(index: isize) -> Self {
        LegRef::Index(index)
    }
}

impl From<i32> for LegRef<'_> {
    fn from(index: i32) -> Self {
        LegRef::Index(index as isize)
    }
}

impl From<usize> for LegRef<'_> {
    fn from(index: usize) -> Self {
        LegRef::Index(index as isize)
    }
}

impl<'a> From<&'a str> for LegRef<'a> {
    fn from(label: &'a str) -> Self {
        LegRef::Label(label)
    }
}

impl<'a> From<&'a String> for LegRef<'a> {
    fn from(label: &'a String) -> Self {
        LegRef::Label(label)
    }
}

impl<'a> From<Option<&'a str>> for LegRef<'a> {
    fn from(label: Option<&'a str>) -> Self {
        label.map_or(LegRef::Unlabelled, LegRef::Label)
    }
}

/// Resolve a leg reference against `labels`.
pub(crate) fn resolve_leg(labels: &[Option<String>], leg: LegRef<'_>) -> Result<usize, TensorError> {
    let num_legs = labels.len();
    match leg {
        LegRef::Index(index) => {
            let resolved = if index < 0 { index + num_legs as isize } else { index };
            if resolved < 0 || resolved as usize >= num_legs {
                return Err(TensorError::AxisOutOfRange { index, num_legs });
            }
            Ok(resolved as usize)
        }
        LegRef::Label(label) => labels
            .iter()
            .position(|l| l.as_deref() == Some(label))
            .ok_or_else(|| TensorError::LabelNotFound {
                label: label.to_string(),
                available: labels.to_vec(),
            }),
        LegRef::Unlabelled => Err(TensorError::UnlabelledLookup),
    }
}

/// Fail on the first label that appears twice.
pub(crate) fn check_unique(labels: &[Option<String>]) -> Result<(), TensorError> {
    for (i, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            if labels[..i].iter().any(|l| l.as_deref() == Some(label.as_str())) {
                return Err(TensorError::DuplicateLabel { label: label.clone() });
            }
        }
    }
    Ok(())
}

/// Label of a conjugated leg: `a` becomes `a*` and `a*` becomes `a`.
pub(crate) fn conj_label(label: &str) -> String {
    match label.strip_suffix('*') {
        Some(stripped) => stripped.to_string(),
        None => format!("{}*", label),
    }
}

/// Label of a composite leg: `(a.b.c)`, or `None` if a factor is unlabelled.
pub(crate) fn combined_label(labels: &[Option<String>]) -> Option<String> {
    let names = labels.iter().map(Option::as_deref).collect::<Option<Vec<&str>>>()?;
    Some(format!("({})", names.join(".")))
}

/// Factor labels of a composite leg label, if it has `num_factors` parts.
///
/// Dots inside nested parentheses do not split, so `((a.b).c)` yields
/// `(a.b)` and `c`.
pub(crate) fn split_label(label: Option<&str>, num_factors: usize) -> Vec<Option<String>> {
    let unknown = vec![None; num_factors];
    let Some(inner) = label.and_then(|l| l.strip_prefix('(')).and_then(|l| l.strip_suffix(')')) else {
        return unknown;
    };
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    if parts.len() != num_factors || parts.iter().any(|p| p.is_empty()) {
        return unknown;
    }
    parts.into_iter().map(|p| Some(p.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_resolve_leg() {
        let ls = labels(&["a", "b", "c"]);
        assert_eq!(resolve_leg(&ls, LegRef::from("b")).unwrap(), 1);
        assert_eq!(resolve_leg(&ls, LegRef::from(-1)).unwrap(), 2);
        assert!(matches!(
            resolve_leg(&ls, LegRef::from(3)),
            Err(TensorError::AxisOutOfRange { index: 3, num_legs: 3 })
        ));
        match resolve_leg(&ls, LegRef::from("x")) {
            Err(TensorError::LabelNotFound { label, available }) => {
                assert_eq!(label, "x");
                assert_eq!(available, ls);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            resolve_leg(&[None], LegRef::from(None)),
            Err(TensorError::UnlabelledLookup)
        ));
    }

    #[test]
    fn test_label_count() {
        assert!(matches!(
            ["a"].into_labels(2),
            Err(TensorError::LabelCountMismatch { legs: 2, labels: 1 })
        ));
    }

    #[test]
    fn test_duplicates() {
        assert!(check_unique(&[None, None]).is_ok());
        assert!(matches!(
            check_unique(&labels(&["a", "b", "a"])),
            Err(TensorError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_conj_and_combined_labels() {
        assert_eq!(conj_label("p"), "p*");
        assert_eq!(conj_label("p*"), "p");
        assert_eq!(combined_label(&labels(&["a", "b"])), Some("(a.b)".to_string()));
        assert_eq!(combined_label(&[Some("a".to_string()), None]), None);
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label(Some("(a.b)"), 2), labels(&["a", "b"]));
        assert_eq!(split_label(Some("((a.b).c)"), 2), labels(&["(a.b)", "c"]));
        assert_eq!(split_label(Some("(a.b)"), 3), vec![None; 3]);
        assert_eq!(split_label(Some("ab"), 1), vec![None]);
        assert_eq!(split_label(None, 2), vec![None, None]);
    }
}
