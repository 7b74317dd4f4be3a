//! Reading order from a learned scoring model.
//!
//! The model scores every (region, order value) pair. Each region first takes
//! its best-scoring value; when several regions want the same value, the one
//! the model scores highest for that value keeps it and the others move to
//! their next-best value nobody holds. Every reassignment consumes a candidate
//! from the loser's list, so the loop ends after at most `n * n` steps.

use std::collections::{BTreeMap, HashSet};

use super::ReadingOrderProvider;
use crate::error::{Error, Result};
use crate::geometry::BBox;

/// Side length of the grid model inputs are scaled to.
const GRID: f32 = 1000.0;

/// A model that scores candidate order values for a page's regions.
pub trait OrderModel: Send + Sync {
    /// Row `i` holds the score of each order value for region `i`.
    ///
    /// Boxes are given on a 0–1000 grid. Rows may be longer than the number
    /// of regions; only the first `boxes.len()` columns are used.
    fn scores(&self, boxes: &[[u32; 4]]) -> Result<Vec<Vec<f32>>>;
}

/// Reading order backed by an [`OrderModel`].
pub struct LearnedReadingOrder<M> {
    model: M,
}

impl<M: OrderModel> LearnedReadingOrder<M> {
    /// Wrap a scoring model.
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: OrderModel> ReadingOrderProvider for LearnedReadingOrder<M> {
    fn name(&self) -> &str {
        "learned"
    }

    fn order(&self, boxes: &[BBox]) -> Result<Vec<usize>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.model.scores(&normalize_boxes(boxes))?;
        let values = resolve_collisions(&scores, boxes.len())?;

        // values[i] is region i's slot; the reading sequence lists regions by slot.
        let mut sequence: Vec<usize> = (0..boxes.len()).collect();
        sequence.sort_by_key(|&i| values[i]);
        Ok(sequence)
    }
}

/// Scale boxes onto the 0–1000 grid, relative to the furthest right and bottom edges.
pub fn normalize_boxes(boxes: &[BBox]) -> Vec<[u32; 4]> {
    let max_x = boxes.iter().map(|b| b.x1).fold(0.0_f32, f32::max);
    let max_y = boxes.iter().map(|b| b.y1).fold(0.0_f32, f32::max);

    let scale = |v: f32, max: f32| -> u32 {
        if max <= 0.0 {
            0
        } else {
            ((v / max) * GRID).clamp(0.0, GRID) as u32
        }
    };

    boxes
        .iter()
        .map(|b| {
            [
                scale(b.x0, max_x),
                scale(b.y0, max_y),
                scale(b.x1, max_x),
                scale(b.y1, max_y),
            ]
        })
        .collect()
}

/// Assign each of `n` regions a distinct order value from a score matrix.
///
/// Returns the order value per region. Ties in score go to the lower region
/// index, and among equally scored values the lower value is preferred.
pub fn resolve_collisions(scores: &[Vec<f32>], n: usize) -> Result<Vec<usize>> {
    if scores.len() < n {
        return Err(Error::permanent(
            "reading-order",
            format!("model scored {} of {} regions", scores.len(), n),
        ));
    }
    if let Some(row) = scores.iter().take(n).find(|row| row.len() < n) {
        return Err(Error::permanent(
            "reading-order",
            format!("score row has {} columns, need {}", row.len(), n),
        ));
    }

    // Candidate values per region, best first.
    let candidates: Vec<Vec<usize>> = scores
        .iter()
        .take(n)
        .map(|row| {
            let mut values: Vec<usize> = (0..n).collect();
            values.sort_by(|&a, &b| row[b].total_cmp(&row[a]).then(a.cmp(&b)));
            values
        })
        .collect();

    let mut cursor = vec![0usize; n];
    let mut assigned: Vec<usize> = candidates.iter().map(|c| c[0]).collect();

    loop {
        let mut holders: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (region, &value) in assigned.iter().enumerate() {
            holders.entry(value).or_default().push(region);
        }

        let collisions: Vec<(usize, Vec<usize>)> = holders
            .into_iter()
            .filter(|(_, regions)| regions.len() > 1)
            .collect();
        if collisions.is_empty() {
            return Ok(assigned);
        }

        let mut losers = Vec::new();
        for (value, mut regions) in collisions {
            regions.sort_by(|&a, &b| {
                scores[b][value]
                    .total_cmp(&scores[a][value])
                    .then(a.cmp(&b))
            });
            losers.extend(regions.into_iter().skip(1));
        }

        let claimed: HashSet<usize> = assigned
            .iter()
            .enumerate()
            .filter(|(region, _)| !losers.contains(region))
            .map(|(_, &value)| value)
            .collect();

        for region in losers {
            let next = candidates[region]
                .iter()
                .enumerate()
                .skip(cursor[region] + 1)
                .find(|(_, value)| !claimed.contains(*value));

            match next {
                Some((pos, &value)) => {
                    cursor[region] = pos;
                    assigned[region] = value;
                }
                None => {
                    return Err(Error::permanent(
                        "reading-order",
                        format!("region {} ran out of order values", region),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScores(Vec<Vec<f32>>);

    impl OrderModel for FixedScores {
        fn scores(&self, _boxes: &[[u32; 4]]) -> Result<Vec<Vec<f32>>> {
            Ok(self.0.clone())
        }
    }

    fn is_permutation(values: &[usize]) -> bool {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted == (0..values.len()).collect::<Vec<_>>()
    }

    #[test]
    fn test_no_collision_keeps_argmax() {
        let scores = vec![vec![0.1, 0.9], vec![0.8, 0.2]];
        assert_eq!(resolve_collisions(&scores, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_collision_goes_to_higher_score() {
        // Both regions prefer value 0; region 1 scores higher there.
        let scores = vec![vec![0.6, 0.4, 0.0], vec![0.9, 0.1, 0.0], vec![0.0, 0.2, 0.8]];
        assert_eq!(resolve_collisions(&scores, 3).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_loser_skips_claimed_values() {
        // Region 0 loses value 0 and its next choice, 2, is held by region 2.
        let scores = vec![
            vec![0.5, 0.1, 0.4],
            vec![0.9, 0.0, 0.0],
            vec![0.0, 0.0, 0.9],
        ];
        assert_eq!(resolve_collisions(&scores, 3).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_everyone_wants_the_same_value() {
        let n = 6;
        let scores: Vec<Vec<f32>> = (0..n)
            .map(|i| {
                let mut row = vec![0.0; n];
                row[0] = 1.0 + i as f32;
                row
            })
            .collect();
        let values = resolve_collisions(&scores, n).unwrap();
        assert!(is_permutation(&values));
        assert_eq!(values[n - 1], 0);
    }

    #[test]
    fn test_wide_rows_are_truncated() {
        let scores = vec![vec![0.0, 0.1, 5.0], vec![0.3, 0.2, 5.0]];
        let values = resolve_collisions(&scores, 2).unwrap();
        assert!(is_permutation(&values));
    }

    #[test]
    fn test_short_matrix_rejected() {
        assert!(resolve_collisions(&[vec![1.0]], 2).is_err());
        assert!(resolve_collisions(&[vec![1.0], vec![1.0]], 2).is_err());
    }

    #[test]
    fn test_learned_order_inverts_slots() {
        // Region 0 belongs in slot 2, region 1 in slot 0, region 2 in slot 1.
        let model = FixedScores(vec![
            vec![0.0, 0.1, 0.9],
            vec![0.9, 0.0, 0.1],
            vec![0.1, 0.9, 0.0],
        ]);
        let provider = LearnedReadingOrder::new(model);
        let boxes = vec![BBox::new(0.0, 0.0, 1.0, 1.0); 3];
        assert_eq!(provider.order(&boxes).unwrap(), vec![1, 2, 0]);
        assert!(provider.order(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_boxes_to_grid() {
        let boxes = vec![BBox::new(0.0, 0.0, 50.0, 100.0), BBox::new(50.0, 100.0, 100.0, 200.0)];
        let grid = normalize_boxes(&boxes);
        assert_eq!(grid[0], [0, 0, 500, 500]);
        assert_eq!(grid[1], [500, 500, 1000, 1000]);
    }
}
