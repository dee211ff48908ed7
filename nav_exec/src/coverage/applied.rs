//! Record of the area already worked.
//!
//! Patches are indexed by the square cells their bounds touch, so a coverage query only looks at
//! patches near the queried segment however much of the field has been worked.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use nav_if::out::CoverageResult;
use serde::Serialize;

use crate::geom::{self, Bounds, Point, LENGTH_EPSILON_M};

use super::boundary::inside_intervals;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Side length of the index cells.
///
/// Units: meters
const INDEX_CELL_M: f64 = 10.0;

/// Patches and queries touching more cells than this bypass the cells.
const MAX_INDEX_CELLS: f64 = 1024.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single worked patch, usually the quad swept by one section between two ticks.
#[derive(Debug, Clone, Serialize)]
pub struct Patch {
    ring: Vec<Point>,
    bounds: Bounds,
}

/// Append only collection of worked patches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppliedArea {
    patches: Vec<Patch>,

    /// Sum of patch areas, overlaps are counted each time they are worked.
    gross_area_m2: f64,

    #[serde(skip)]
    index: PatchIndex,
}

/// Patch indices by cell.
#[derive(Debug, Clone, Default)]
struct PatchIndex {
    cells: HashMap<(i64, i64), Vec<usize>>,

    /// Patches too large for the cells, returned by every query.
    large: Vec<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Patch {
    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    pub fn area(&self) -> f64 {
        geom::signed_area(&self.ring).abs()
    }
}

impl AppliedArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patch. Degenerate patches (fewer than 3 points or no area) are ignored and `false`
    /// returned.
    pub fn add_patch(&mut self, ring: Vec<Point>) -> bool {
        if ring.len() < 3 || ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return false;
        }

        let area = geom::signed_area(&ring).abs();
        if area < LENGTH_EPSILON_M {
            return false;
        }

        let bounds = match Bounds::from_points(&ring) {
            Some(b) => b,
            None => return false,
        };

        self.gross_area_m2 += area;
        self.index.insert(self.patches.len(), &bounds);
        self.patches.push(Patch { ring, bounds });

        true
    }

    /// Add the strip swept by a section whose leading edge moved from `left_0 -> right_0` to
    /// `left_1 -> right_1`.
    pub fn add_strip(&mut self, left_0: Point, right_0: Point, left_1: Point, right_1: Point) -> bool {
        self.add_patch(vec![left_0, right_0, right_1, left_1])
    }

    pub fn clear(&mut self) {
        self.patches.clear();
        self.index.clear();
        self.gross_area_m2 = 0.0;
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn gross_area_m2(&self) -> f64 {
        self.gross_area_m2
    }

    /// Coverage of the segment `p0 -> p1` by the worked area.
    ///
    /// `tolerance` is how far below 1 the covered fraction may be while still reported as fully
    /// covered.
    pub fn coverage(&self, p0: &Point, p1: &Point, tolerance: f64) -> CoverageResult {
        let query = Bounds {
            min: p0.inf(p1),
            max: p0.sup(p1),
        };

        match self.index.candidates(&query) {
            Some(ids) => coverage_over(ids.iter().map(|&i| &self.patches[i]), p0, p1, tolerance),
            None => coverage_over(self.patches.iter(), p0, p1, tolerance),
        }
    }
}

impl PatchIndex {
    fn insert(&mut self, id: usize, bounds: &Bounds) {
        match cell_range(bounds) {
            Some((min, max)) => {
                for cx in min.0..=max.0 {
                    for cy in min.1..=max.1 {
                        self.cells.entry((cx, cy)).or_insert_with(Vec::new).push(id);
                    }
                }
            }
            None => self.large.push(id),
        }
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.large.clear();
    }

    /// Sorted ids of the patches that may touch `bounds`, or `None` if the query is too large
    /// for the cells and every patch must be checked.
    fn candidates(&self, bounds: &Bounds) -> Option<Vec<usize>> {
        let (min, max) = cell_range(bounds)?;

        let mut ids = self.large.clone();
        for cx in min.0..=max.0 {
            for cy in min.1..=max.1 {
                if let Some(cell) = self.cells.get(&(cx, cy)) {
                    ids.extend_from_slice(cell);
                }
            }
        }

        ids.sort_unstable();
        ids.dedup();

        Some(ids)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// First and last cell touched by `bounds`, `None` for non-finite or oversized bounds.
fn cell_range(bounds: &Bounds) -> Option<((i64, i64), (i64, i64))> {
    let cell = |v: f64| (v / INDEX_CELL_M).floor();

    let (x0, y0) = (cell(bounds.min.x), cell(bounds.min.y));
    let (x1, y1) = (cell(bounds.max.x), cell(bounds.max.y));

    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite())
        || (x1 - x0 + 1.0) * (y1 - y0 + 1.0) > MAX_INDEX_CELLS
    {
        return None;
    }

    Some(((x0 as i64, y0 as i64), (x1 as i64, y1 as i64)))
}

/// Coverage of `p0 -> p1` by the given patches.
fn coverage_over<'a, I>(patches: I, p0: &Point, p1: &Point, tolerance: f64) -> CoverageResult
where
    I: Iterator<Item = &'a Patch>,
{
    let length_m = (p1 - p0).norm();

    if length_m < LENGTH_EPSILON_M {
        let covered = patches
            .filter(|patch| patch.bounds.contains(p0))
            .any(|patch| geom::point_in_ring(p0, &patch.ring));

        return CoverageResult::from_coverage_pct(if covered { 1.0 } else { 0.0 }, 0.0, tolerance);
    }

    let mut intervals: Vec<(f64, f64)> = patches
        .filter(|patch| patch.bounds.overlaps_segment(p0, p1))
        .flat_map(|patch| inside_intervals(p0, p1, &patch.ring))
        .collect();

    if intervals.is_empty() {
        return CoverageResult::from_coverage_pct(0.0, length_m, tolerance);
    }

    intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    // Merge overlapping intervals and sum their lengths
    let mut covered = 0.0;
    let mut current = intervals[0];

    for &(start, end) in intervals.iter().skip(1) {
        if start <= current.1 {
            current.1 = current.1.max(end);
        } else {
            covered += current.1 - current.0;
            current = (start, end);
        }
    }
    covered += current.1 - current.0;

    CoverageResult::from_coverage_pct(covered, length_m, tolerance)
}
