//! Rectilinear regions and boolean helpers.
//!
//! A [`Region`] models a rectilinear area as a set of axis-aligned
//! rectangles. This covers everything the routing pipeline feeds it: path
//! segments, instance bounding boxes, and rectangle shapes. Arbitrary
//! polygons are represented by their bounding box.

use geometry::path::Path;
use geometry::polygon::Polygon;
use geometry::rect::Rect;

/// A rectilinear region stored as a set of rectangles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a region covering one rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rects: vec![rect] }
    }

    /// Creates a region covering the segment rectangles of a path.
    pub fn from_path(path: &Path) -> Self {
        Self {
            rects: path.segment_rects(),
        }
    }

    /// Adds a rectangle to the region.
    pub fn insert_rect(&mut self, rect: Rect) {
        self.rects.push(rect);
    }

    /// Adds the segment rectangles of a path to the region.
    pub fn insert_path(&mut self, path: &Path) {
        self.rects.extend(path.segment_rects());
    }

    /// Adds a polygon to the region.
    ///
    /// Rectilinear polygons are decomposed exactly into rectangle slabs;
    /// anything else is represented by its bounding box.
    pub fn insert_polygon(&mut self, polygon: &Polygon) {
        let pts = polygon.points();
        if pts.len() < 3 {
            return;
        }
        let rectilinear = pts
            .iter()
            .zip(pts.iter().cycle().skip(1))
            .all(|(a, b)| a.x == b.x || a.y == b.y);
        if !rectilinear {
            if let Some(bbox) = polygon.bbox() {
                self.rects.push(bbox);
            }
            return;
        }
        // vertical slab sweep: between consecutive x coordinates, the
        // covered y intervals are bounded by the horizontal edges whose
        // span contains the slab
        let mut xs: Vec<i64> = pts.iter().map(|p| p.x).collect();
        xs.sort_unstable();
        xs.dedup();
        for slab in xs.windows(2) {
            let (x1, x2) = (slab[0], slab[1]);
            let mut ys: Vec<i64> = Vec::new();
            for (a, b) in pts.iter().zip(pts.iter().cycle().skip(1)) {
                if a.y == b.y && a.x.min(b.x) <= x1 && a.x.max(b.x) >= x2 {
                    ys.push(a.y);
                }
            }
            ys.sort_unstable();
            // horizontal edges alternate between entering and leaving the
            // interior
            for pair in ys.chunks(2) {
                if let [y1, y2] = pair {
                    if y1 < y2 {
                        self.rects.push(Rect::from_sides(x1, *y1, x2, *y2));
                    }
                }
            }
        }
    }

    /// Adds all rectangles of `other` to this region.
    pub fn join_with(&mut self, other: &Region) {
        self.rects.extend_from_slice(&other.rects);
    }

    /// Whether the region holds no rectangles.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The rectangles of the region.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// The bounding box of the region.
    pub fn bbox(&self) -> Option<Rect> {
        let mut it = self.rects.iter();
        let first = *it.next()?;
        Some(it.fold(first, |acc, &r| acc.union(r)))
    }

    /// The intersection with another region: every pairwise overlap of
    /// positive area.
    pub fn and(&self, other: &Region) -> Region {
        let mut out = Region::new();
        for a in &self.rects {
            for b in &other.rects {
                if a.overlaps(*b) {
                    out.rects
                        .push(a.intersection(*b).expect("overlapping rects intersect"));
                }
            }
        }
        out
    }

    /// Whether the interiors of the two regions overlap anywhere.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.rects
            .iter()
            .any(|a| other.rects.iter().any(|b| a.overlaps(*b)))
    }

    /// Coalesces rectangles that can be merged without changing the
    /// covered area, and drops rectangles contained in others.
    pub fn merge(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            'outer: for i in 0..self.rects.len() {
                for j in (i + 1)..self.rects.len() {
                    let (a, b) = (self.rects[i], self.rects[j]);
                    if let Some(m) = merge_pair(a, b) {
                        self.rects[i] = m;
                        self.rects.swap_remove(j);
                        changed = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    /// The region as a list of rectangle polygons.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.rects.iter().map(|&r| Polygon::from_rect(r)).collect()
    }
}

/// Merges two rectangles when one contains the other or they tile a larger
/// rectangle exactly.
fn merge_pair(a: Rect, b: Rect) -> Option<Rect> {
    if a.contains(b) {
        return Some(a);
    }
    if b.contains(a) {
        return Some(b);
    }
    // side-by-side with identical cross-section
    if a.bot() == b.bot() && a.top() == b.top() && a.right() >= b.left() && b.right() >= a.left() {
        return Some(a.union(b));
    }
    if a.left() == b.left() && a.right() == b.right() && a.top() >= b.bot() && b.top() >= a.bot() {
        return Some(a.union(b));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::point::Point;

    #[test]
    fn and_finds_overlaps() {
        let a = Region::from_rect(Rect::from_sides(0, 0, 100, 100));
        let b = Region::from_rect(Rect::from_sides(50, 50, 150, 150));
        let c = a.and(&b);
        assert_eq!(c.rects(), &[Rect::from_sides(50, 50, 100, 100)]);
        // touching rectangles do not produce an overlap
        let d = Region::from_rect(Rect::from_sides(100, 0, 200, 100));
        assert!(a.and(&d).is_empty());
        assert!(!a.overlaps(&d));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn merge_coalesces_tiles() {
        let mut r = Region::new();
        r.insert_rect(Rect::from_sides(0, 0, 50, 100));
        r.insert_rect(Rect::from_sides(50, 0, 100, 100));
        r.insert_rect(Rect::from_sides(10, 10, 20, 20));
        r.merge();
        assert_eq!(r.rects(), &[Rect::from_sides(0, 0, 100, 100)]);
    }

    #[test]
    fn rectilinear_polygons_decompose_exactly() {
        // an L-shaped hull: 4x1 horizontal bar plus 1x3 vertical bar
        let poly = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 1),
            Point::new(1, 1),
            Point::new(1, 3),
            Point::new(0, 3),
        ]);
        let mut region = Region::new();
        region.insert_polygon(&poly);
        let area: i64 = region.rects().iter().map(|r| r.width() * r.height()).sum();
        assert_eq!(area, 6);
        // the notch is not covered
        let notch = Region::from_rect(Rect::from_sides(2, 2, 3, 3));
        assert!(region.and(&notch).is_empty());
    }

    #[test]
    fn path_region_covers_every_segment() {
        let path = Path::new(
            vec![Point::new(0, 0), Point::new(1000, 0), Point::new(1000, 500)],
            100,
        );
        let r = Region::from_path(&path);
        assert_eq!(r.rects().len(), 2);
        assert_eq!(r.bbox(), Some(Rect::from_sides(0, -50, 1050, 500)));
    }
}
