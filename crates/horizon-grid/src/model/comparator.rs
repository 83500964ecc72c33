//! Value comparison used by sorted models.

use std::cmp::Ordering;

use super::error::{Error, Result};
use super::value::CellValue;

/// Orders two cell values.
///
/// Comparators are stateless. A comparator may refuse to order two values of
/// incomparable kinds by returning [`Error::TypeIncompatibility`].
///
/// Any `Fn(&CellValue, &CellValue) -> Result<Ordering>` closure is a comparator.
pub trait Comparator: Send + Sync {
    /// Compares `left` with `right`.
    fn compare(&self, left: &CellValue, right: &CellValue) -> Result<Ordering>;
}

impl<F> Comparator for F
where
    F: Fn(&CellValue, &CellValue) -> Result<Ordering> + Send + Sync,
{
    fn compare(&self, left: &CellValue, right: &CellValue) -> Result<Ordering> {
        self(left, right)
    }
}

/// The comparator sorted models use unless told otherwise.
///
/// - `Empty` sorts before every other value
/// - `Int` and `Float` compare with each other by exact numeric value
/// - values of the same kind compare naturally (`false < true`, strings
///   lexicographically, floats by IEEE total order)
/// - any other pairing fails with [`Error::TypeIncompatibility`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultComparator;

impl Comparator for DefaultComparator {
    fn compare(&self, left: &CellValue, right: &CellValue) -> Result<Ordering> {
        use CellValue::*;

        let ordering = match (left, right) {
            (Empty, Empty) => Ordering::Equal,
            (Empty, _) => Ordering::Less,
            (_, Empty) => Ordering::Greater,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),

            (Int(a), Float(b)) => compare_int_float(*a, *b),
            (Float(a), Int(b)) => compare_int_float(*b, *a).reverse(),

            _ => {
                return Err(Error::TypeIncompatibility {
                    left: left.kind(),
                    right: right.kind(),
                });
            }
        };
        Ok(ordering)
    }
}

/// Compares an integer with a float by exact value, without rounding the
/// integer through `f64`. NaN orders as `total_cmp` places it: after every
/// integer when positive, before every integer when negative.
fn compare_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float above i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        ordering => ordering,
    }
}

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest value first.
    #[default]
    Ascending,
    /// Largest value first.
    Descending,
}

impl SortDirection {
    /// Applies this direction to an ascending `ordering`.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// One entry of a sorted model's tie-break list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnOrder {
    /// The column to compare.
    pub index: usize,
    /// Which way the column sorts.
    pub direction: SortDirection,
}

impl ColumnOrder {
    /// Creates a column order entry.
    pub fn new(index: usize, direction: SortDirection) -> Self {
        Self { index, direction }
    }

    /// Sort `index` smallest first.
    pub fn ascending(index: usize) -> Self {
        Self::new(index, SortDirection::Ascending)
    }

    /// Sort `index` largest first.
    pub fn descending(index: usize) -> Self {
        Self::new(index, SortDirection::Descending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::ValueKind;

    fn cmp(left: impl Into<CellValue>, right: impl Into<CellValue>) -> Result<Ordering> {
        DefaultComparator.compare(&left.into(), &right.into())
    }

    #[test]
    fn test_same_kind_ordering() {
        assert_eq!(cmp(1, 2), Ok(Ordering::Less));
        assert_eq!(cmp("b", "a"), Ok(Ordering::Greater));
        assert_eq!(cmp(false, true), Ok(Ordering::Less));
        assert_eq!(cmp(1.5, 1.5), Ok(Ordering::Equal));
    }

    #[test]
    fn test_empty_sorts_first() {
        assert_eq!(cmp(CellValue::Empty, "a"), Ok(Ordering::Less));
        assert_eq!(cmp(7, CellValue::Empty), Ok(Ordering::Greater));
        assert_eq!(cmp(CellValue::Empty, CellValue::Empty), Ok(Ordering::Equal));
    }

    #[test]
    fn test_mixed_numeric() {
        assert_eq!(cmp(2, 1.5), Ok(Ordering::Greater));
        assert_eq!(cmp(0.5, 1), Ok(Ordering::Less));
        assert_eq!(cmp(3, 3.0), Ok(Ordering::Equal));
        assert_eq!(cmp(-1, -0.5), Ok(Ordering::Less));
        assert_eq!(cmp(-0.5, -1), Ok(Ordering::Greater));
        assert_eq!(cmp(0, -0.0), Ok(Ordering::Equal));
    }

    #[test]
    fn test_mixed_numeric_is_exact_beyond_float_precision() {
        let big = 1i64 << 53;
        let float = big as f64;
        assert_eq!(cmp(big, float), Ok(Ordering::Equal));
        assert_eq!(cmp(big + 1, float), Ok(Ordering::Greater));
        assert_eq!(cmp(float, big + 1), Ok(Ordering::Less));
        assert_eq!(cmp(big, big + 1), Ok(Ordering::Less));

        assert_eq!(cmp(i64::MAX, i64::MAX as f64), Ok(Ordering::Less));
        assert_eq!(cmp(i64::MIN, i64::MIN as f64), Ok(Ordering::Equal));
        assert_eq!(cmp(i64::MIN, f64::NEG_INFINITY), Ok(Ordering::Greater));
        assert_eq!(cmp(0, f64::NAN), Ok(Ordering::Less));
    }

    #[test]
    fn test_incompatible_kinds() {
        assert_eq!(
            cmp(1, "1"),
            Err(Error::TypeIncompatibility {
                left: ValueKind::Int,
                right: ValueKind::String
            })
        );
        assert!(cmp(true, 1).is_err());
    }

    #[test]
    fn test_closure_comparator() {
        let by_length = |a: &CellValue, b: &CellValue| -> Result<Ordering> {
            let len = |v: &CellValue| v.as_string().map_or(0, str::len);
            Ok(len(a).cmp(&len(b)))
        };
        let comparator: &dyn Comparator = &by_length;
        assert_eq!(
            comparator.compare(&"ccc".into(), &"dd".into()),
            Ok(Ordering::Greater)
        );
    }

    #[test]
    fn test_direction() {
        assert_eq!(SortDirection::Descending.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortDirection::Ascending.apply(Ordering::Less), Ordering::Less);
        assert_eq!(ColumnOrder::descending(2).direction, SortDirection::Descending);
    }
}
