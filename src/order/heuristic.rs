//! Deterministic column-based reading order.

use std::cmp::Ordering;

use super::ReadingOrderProvider;
use crate::error::{Error, Result};
use crate::geometry::BBox;

/// Splits the page into equal-width columns read left to right, each column
/// top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHeuristic {
    num_columns: usize,
}

impl ColumnHeuristic {
    /// Create a heuristic with `num_columns` columns.
    ///
    /// Fails with [`Error::InvalidConfig`] when `num_columns` is zero.
    pub fn new(num_columns: usize) -> Result<Self> {
        if num_columns < 1 {
            return Err(Error::InvalidConfig(format!(
                "num_columns must be >= 1, got {}",
                num_columns
            )));
        }
        Ok(Self { num_columns })
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Region indices in reading sequence.
    pub fn order_boxes(&self, boxes: &[BBox]) -> Vec<usize> {
        if boxes.is_empty() {
            return Vec::new();
        }

        let page_width = boxes.iter().map(|b| b.x1).fold(f32::MIN, f32::max);
        let col_width = page_width / self.num_columns as f32;

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); self.num_columns];
        for (idx, b) in boxes.iter().enumerate() {
            buckets[self.column_of(b, col_width)].push(idx);
        }

        let mut ordered = Vec::with_capacity(boxes.len());
        for mut bucket in buckets {
            bucket.sort_by(|&a, &b| {
                let (a, b) = (&boxes[a], &boxes[b]);
                a.y0.partial_cmp(&b.y0)
                    .unwrap_or(Ordering::Equal)
                    .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
            });
            ordered.extend(bucket);
        }
        ordered
    }

    fn column_of(&self, b: &BBox, col_width: f32) -> usize {
        if col_width <= 0.0 || !col_width.is_finite() {
            return 0;
        }
        let col = (b.center_x() / col_width).floor();
        if col <= 0.0 {
            0
        } else {
            (col as usize).min(self.num_columns - 1)
        }
    }
}

impl ReadingOrderProvider for ColumnHeuristic {
    fn name(&self) -> &str {
        "column-heuristic"
    }

    fn order(&self, boxes: &[BBox]) -> Result<Vec<usize>> {
        Ok(self.order_boxes(boxes))
    }
}

/// Reading order by the column heuristic.
///
/// Fails with [`Error::InvalidConfig`] when `num_columns` is zero.
pub fn heuristic_reading_order(boxes: &[BBox], num_columns: usize) -> Result<Vec<usize>> {
    Ok(ColumnHeuristic::new(num_columns)?.order_boxes(boxes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(x0: f32, y0: f32, x1: f32, y1: f32) -> BBox {
        BBox::new(x0, y0, x1, y1)
    }

    #[test]
    fn test_zero_columns_rejected() {
        assert!(matches!(
            ColumnHeuristic::new(0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(heuristic_reading_order(&[], 0).is_err());
    }

    #[test]
    fn test_single_column_sorts_top_then_left() {
        let boxes = vec![
            bx(50.0, 100.0, 90.0, 110.0),
            bx(10.0, 10.0, 40.0, 20.0),
            bx(10.0, 100.0, 40.0, 110.0),
            bx(60.0, 10.0, 90.0, 20.0),
        ];
        let order = heuristic_reading_order(&boxes, 1).unwrap();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_two_columns_read_left_column_first() {
        // Page 200 wide: left column centers < 100, right >= 100.
        let boxes = vec![
            bx(110.0, 10.0, 190.0, 20.0), // right, top
            bx(10.0, 50.0, 90.0, 60.0),   // left, bottom
            bx(10.0, 10.0, 90.0, 20.0),   // left, top
            bx(110.0, 50.0, 200.0, 60.0), // right, bottom
        ];
        let order = heuristic_reading_order(&boxes, 2).unwrap();
        assert_eq!(order, vec![2, 1, 0, 3]);
    }

    #[test]
    fn test_result_is_permutation() {
        let boxes: Vec<BBox> = (0..17)
            .map(|i| {
                let x = (i * 37 % 300) as f32;
                let y = (i * 53 % 500) as f32;
                bx(x, y, x + 20.0, y + 10.0)
            })
            .collect();
        for cols in 1..5 {
            let mut order = heuristic_reading_order(&boxes, cols).unwrap();
            order.sort_unstable();
            assert_eq!(order, (0..boxes.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_empty_and_degenerate_pages() {
        assert!(heuristic_reading_order(&[], 3).unwrap().is_empty());

        let zero_width = vec![bx(0.0, 5.0, 0.0, 6.0), bx(0.0, 1.0, 0.0, 2.0)];
        assert_eq!(heuristic_reading_order(&zero_width, 2).unwrap(), vec![1, 0]);
    }
}
