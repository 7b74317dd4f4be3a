//! Reading-order providers.
//!
//! A provider turns the boxes of a page's OCR lines into a reading sequence:
//! a permutation of `0..boxes.len()` listing region indices in the order a
//! person would read them.

mod heuristic;
mod learned;

pub use heuristic::{heuristic_reading_order, ColumnHeuristic};
pub use learned::{normalize_boxes, resolve_collisions, LearnedReadingOrder, OrderModel};

use crate::error::{Error, Result};
use crate::geometry::BBox;

/// Produces a reading sequence for a page's regions.
pub trait ReadingOrderProvider: Send + Sync {
    /// Short name used in logs and failure records.
    fn name(&self) -> &str;

    /// Region indices in reading sequence.
    fn order(&self, boxes: &[BBox]) -> Result<Vec<usize>>;
}

/// Check that `order` lists every index in `0..len` exactly once.
pub fn validate_permutation(order: &[usize], len: usize) -> Result<()> {
    if order.len() != len {
        return Err(Error::InvalidReadingOrder(format!(
            "expected {} indices, got {}",
            len,
            order.len()
        )));
    }

    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(Error::InvalidReadingOrder(format!("index {} repeated", i)));
            }
            None => {
                return Err(Error::InvalidReadingOrder(format!(
                    "index {} out of range for {} regions",
                    i, len
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_permutation() {
        assert!(validate_permutation(&[2, 0, 1], 3).is_ok());
        assert!(validate_permutation(&[], 0).is_ok());
        assert!(validate_permutation(&[0, 0, 1], 3).is_err());
        assert!(validate_permutation(&[0, 3, 1], 3).is_err());
        assert!(validate_permutation(&[0, 1], 3).is_err());
    }
}
