//! # Quadtree Implementation
//!
//! This is an implementation of a point quadtree, as described in [the wikipedia
//! article](https://en.wikipedia.org/wiki/Quadtree). It is used to answer bounded neighbourhood
//! queries over field geometry without comparing every pair of points.
//!
//! Quads are half-open (`min <= p < max` on each axis) so every point inside a node belongs to
//! exactly one child after subdivision.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of points per QuadTree
pub const CAPACITY: usize = 4;

/// Maximum depth of the tree. Nodes at this depth store any number of points, which stops
/// coincident points from subdividing forever.
pub const MAX_DEPTH: usize = 24;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Represents a quad with a centre and half-width.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quad {
    centre: Vector2<f64>,
    half_width: f64
}

/// An implementation of a QuadTree
#[derive(Clone, Debug)]
pub struct QuadTree {
    /// The bounds of this node
    boundary: Quad,

    /// Depth of this node, the root is at zero
    depth: usize,

    /// Points stored in this node
    points: Vec<Vector2<f64>>,

    /// Children of the node in the order north west, north east, south west, south east
    children: Option<Box<[QuadTree; 4]>>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QuadTreeError {
    #[error("The given point {0} was not in the bounds of the quadtree {1:?}")]
    PointNotInBounds(Vector2<f64>, Quad),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Quad {
    /// Creates a new quad with the given `centre` and `half_width`.
    pub fn new(centre: Vector2<f64>, half_width: f64) -> Self {
        Self {
            centre,
            half_width
        }
    }

    /// Creates the smallest square quad containing all `points`, grown by `margin` on each side.
    ///
    /// Returns `None` if `points` is empty or contains a non-finite coordinate.
    pub fn bounding(points: &[Vector2<f64>], margin: f64) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;

        for p in points.iter() {
            if !p[0].is_finite() || !p[1].is_finite() {
                return None
            }
            min = min.inf(p);
            max = max.sup(p);
        }

        let centre = (min + max) * 0.5;
        let half_width = 0.5 * (max[0] - min[0]).max(max[1] - min[1]) + margin.abs().max(1e-6);

        Some(Self::new(centre, half_width))
    }

    /// Returns `true` if `point` is inside this [`Quad`]
    pub fn contains(&self, point: &Vector2<f64>) -> bool {
        (self.centre[0] - self.half_width) <= point[0]
        && (self.centre[0] + self.half_width) > point[0]
        && (self.centre[1] - self.half_width) <= point[1]
        && (self.centre[1] + self.half_width) > point[1]
    }

    /// Returns `true` if `other` overlaps this [`Quad`].
    pub fn intersects(&self, other: &Quad) -> bool {
        let reach = self.half_width + other.half_width;

        (self.centre[0] - other.centre[0]).abs() <= reach
        && (self.centre[1] - other.centre[1]).abs() <= reach
    }
}

impl QuadTree {
    pub fn new(boundary: Quad) -> Self {
        Self::with_depth(boundary, 0)
    }

    /// Build a tree covering all `points` and insert them.
    ///
    /// Returns `None` if the points have no finite bounds.
    pub fn from_points(points: &[Vector2<f64>]) -> Option<Self> {
        let mut tree = Self::new(Quad::bounding(points, 1.0)?);

        for p in points.iter() {
            tree.insert(*p).ok()?;
        }

        Some(tree)
    }

    fn with_depth(boundary: Quad, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    /// Insert a point into the QuadTree.
    pub fn insert(&mut self, point: Vector2<f64>) -> Result<(), QuadTreeError> {

        // Check if it's in the tree
        if !self.boundary.contains(&point) {
            return Err(QuadTreeError::PointNotInBounds(point, self.boundary));
        }

        // If there's a space in the tree and its's not been divided add it to the points list
        if self.children.is_none()
            && (self.points.len() < CAPACITY || self.depth >= MAX_DEPTH)
        {
            self.points.push(point);
            return Ok(())
        }

        // Otherwise subdivide if needed and add the point to the child that contains it
        let boundary = self.boundary;
        let depth = self.depth;
        let children = self.children.get_or_insert_with(|| Self::subdivide(boundary, depth));

        for child in children.iter_mut() {
            if child.boundary.contains(&point) {
                return child.insert(point)
            }
        }

        // Only reachable through floating point round off at a child edge, keep the point here
        self.points.push(point);
        Ok(())
    }

    /// Return a list of all points within the given quad.
    pub fn query_in_quad(&self, quad: Quad) -> Vec<Vector2<f64>> {
        let mut points = Vec::new();
        self.visit_in_quad(&quad, &mut |p| points.push(*p));
        points
    }

    /// Returns `true` if any point lies strictly closer than `radius` to `centre`.
    pub fn any_within(&self, centre: &Vector2<f64>, radius: f64) -> bool {
        let quad = Quad::new(*centre, radius);
        let radius_sq = radius * radius;
        let mut found = false;

        self.visit_in_quad(&quad, &mut |p| {
            if (p - centre).norm_squared() < radius_sq {
                found = true;
            }
        });

        found
    }

    /// Call `f` for every point in the tree inside `quad`.
    fn visit_in_quad<F: FnMut(&Vector2<f64>)>(&self, quad: &Quad, f: &mut F) {
        // Check that quad is in the tree, if not there's nothing to visit
        if !self.boundary.intersects(quad) {
            return
        }

        for point in self.points.iter() {
            if quad.contains(point) {
                f(point)
            }
        }

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.visit_in_quad(quad, f);
            }
        }
    }

    fn subdivide(boundary: Quad, depth: usize) -> Box<[QuadTree; 4]> {
        let hw = boundary.half_width / 2.0;
        let c = boundary.centre;

        Box::new([
            QuadTree::with_depth(Quad::new(c + Vector2::new(-hw, hw), hw), depth + 1),
            QuadTree::with_depth(Quad::new(c + Vector2::new(hw, hw), hw), depth + 1),
            QuadTree::with_depth(Quad::new(c + Vector2::new(-hw, -hw), hw), depth + 1),
            QuadTree::with_depth(Quad::new(c + Vector2::new(hw, -hw), hw), depth + 1),
        ])
    }
}
