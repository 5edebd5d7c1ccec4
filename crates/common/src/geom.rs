//! Integer pixel geometry: rectangles, triangles and their overlap predicates.
//!
//! Every predicate here is total. No division happens without a zero check,
//! parallel segments never intersect and zero-area triangles overlap nothing.
//! "Overlap" always means the interiors intersect: shapes that only share an
//! edge or a corner are touching, not overlapping.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Errors from constructing geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeomError {
    #[error("rectangle {w}x{h} has no area")]
    EmptyRect { w: i32, h: i32 },
    #[error("triangle has repeated vertex {0:?}")]
    RepeatedVertex(IVec2),
}

/// Axis-aligned rectangle covering `[x, x+w) × [y, y+h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle with positive extent on both axes.
    pub fn sized(x: i32, y: i32, w: i32, h: i32) -> Result<Self, GeomError> {
        if w < 1 || h < 1 {
            return Err(GeomError::EmptyRect { w, h });
        }
        Ok(Self { x, y, w, h })
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.w) * i64::from(self.h)
        }
    }

    pub fn origin(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// Corners in winding order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [IVec2; 4] {
        [
            IVec2::new(self.x, self.y),
            IVec2::new(self.right(), self.y),
            IVec2::new(self.right(), self.bottom()),
            IVec2::new(self.x, self.bottom()),
        ]
    }

    pub fn translate(&self, d: IVec2) -> Self {
        Self::new(self.x + d.x, self.y + d.y, self.w, self.h)
    }

    pub fn grow(&self, margin: i32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.w + 2 * margin,
            self.h + 2 * margin,
        )
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Self {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Triangle given by three vertices in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub a: IVec2,
    pub b: IVec2,
    pub c: IVec2,
}

impl Triangle {
    /// Triangle with three distinct vertices. Collinear vertices are accepted
    /// but such a triangle overlaps nothing.
    pub fn new(a: IVec2, b: IVec2, c: IVec2) -> Result<Self, GeomError> {
        if a == b || a == c {
            return Err(GeomError::RepeatedVertex(a));
        }
        if b == c {
            return Err(GeomError::RepeatedVertex(b));
        }
        Ok(Self { a, b, c })
    }

    pub fn vertices(&self) -> [IVec2; 3] {
        [self.a, self.b, self.c]
    }

    /// Twice the signed area.
    pub fn area2(&self) -> i64 {
        cross(self.a, self.b, self.c)
    }

    pub fn is_degenerate(&self) -> bool {
        self.area2() == 0
    }

    pub fn translate(&self, d: IVec2) -> Self {
        Self {
            a: self.a + d,
            b: self.b + d,
            c: self.c + d,
        }
    }

    pub fn aabb(&self) -> Rect {
        let min = self.a.min(self.b).min(self.c);
        let max = self.a.max(self.b).max(self.c);
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

/// Collision geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Rect(Rect),
    Triangle(Triangle),
}

impl Shape {
    pub fn translate(&self, d: IVec2) -> Self {
        match self {
            Shape::Rect(r) => Shape::Rect(r.translate(d)),
            Shape::Triangle(t) => Shape::Triangle(t.translate(d)),
        }
    }

    pub fn aabb(&self) -> Rect {
        match self {
            Shape::Rect(r) => *r,
            Shape::Triangle(t) => t.aabb(),
        }
    }

    /// Whether the interiors of the two shapes intersect.
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Rect(a), Shape::Rect(b)) => rect_intersect(a, b).is_some(),
            (Shape::Rect(r), Shape::Triangle(t)) | (Shape::Triangle(t), Shape::Rect(r)) => {
                rect_triangle_intersect(r, t)
            }
            (Shape::Triangle(a), Shape::Triangle(b)) => triangle_triangle_intersect(a, b),
        }
    }
}

/// Cross product of `a - o` and `b - o`.
#[inline]
fn cross(o: IVec2, a: IVec2, b: IVec2) -> i64 {
    let (ax, ay) = (i64::from(a.x - o.x), i64::from(a.y - o.y));
    let (bx, by) = (i64::from(b.x - o.x), i64::from(b.y - o.y));
    ax * by - ay * bx
}

#[inline]
fn det(a: IVec2, b: IVec2) -> i64 {
    i64::from(a.x) * i64::from(b.y) - i64::from(a.y) * i64::from(b.x)
}

/// Overlapping region of two rectangles. `None` when either has zero area or
/// they only touch.
pub fn rect_intersect(a: &Rect, b: &Rect) -> Option<Rect> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = a.right().min(b.right());
    let y1 = a.bottom().min(b.bottom());
    if x0 < x1 && y0 < y1 {
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    } else {
        None
    }
}

/// Half-open containment: `[x, x+w) × [y, y+h)`.
pub fn rect_contains(r: &Rect, p: IVec2) -> bool {
    p.x >= r.x && p.x < r.right() && p.y >= r.y && p.y < r.bottom()
}

pub fn rect_overlap_area(a: &Rect, b: &Rect) -> i64 {
    rect_intersect(a, b).map_or(0, |r| r.area())
}

/// Closed containment via three same-side tests. Degenerate triangles contain
/// nothing.
pub fn triangle_contains(t: &Triangle, p: IVec2) -> bool {
    if t.is_degenerate() {
        return false;
    }
    let d1 = cross(t.a, t.b, p);
    let d2 = cross(t.b, t.c, p);
    let d3 = cross(t.c, t.a, p);
    let has_neg = d1 < 0 || d2 < 0 || d3 < 0;
    let has_pos = d1 > 0 || d2 > 0 || d3 > 0;
    !(has_neg && has_pos)
}

fn triangle_contains_strict(t: &Triangle, p: IVec2) -> bool {
    if t.is_degenerate() {
        return false;
    }
    let d1 = cross(t.a, t.b, p);
    let d2 = cross(t.b, t.c, p);
    let d3 = cross(t.c, t.a, p);
    (d1 > 0 && d2 > 0 && d3 > 0) || (d1 < 0 && d2 < 0 && d3 < 0)
}

fn rect_contains_strict(r: &Rect, p: IVec2) -> bool {
    p.x > r.x && p.x < r.right() && p.y > r.y && p.y < r.bottom()
}

/// Proper crossing of segments `a1a2` and `b1b2`, solved with 2×2
/// determinants. Parallel or collinear segments never intersect; touching at
/// an endpoint does not count.
pub fn segment_segment_intersect(a1: IVec2, a2: IVec2, b1: IVec2, b2: IVec2) -> bool {
    let r = a2 - a1;
    let s = b2 - b1;
    let mut denom = det(r, s);
    if denom == 0 {
        return false;
    }
    let qp = b1 - a1;
    let mut t = det(qp, s);
    let mut u = det(qp, r);
    if denom < 0 {
        denom = -denom;
        t = -t;
        u = -u;
    }
    0 < t && t < denom && 0 < u && u < denom
}

fn edges<const N: usize>(poly: &[IVec2; N]) -> impl Iterator<Item = (IVec2, IVec2)> + '_ {
    (0..N).map(move |i| (poly[i], poly[(i + 1) % N]))
}

fn any_edge_crossing<const N: usize, const M: usize>(p: &[IVec2; N], q: &[IVec2; M]) -> bool {
    edges(p).any(|(a1, a2)| edges(q).any(|(b1, b2)| segment_segment_intersect(a1, a2, b1, b2)))
}

/// Separating-axis test over both polygons' edge normals. Touching
/// projections count as separated.
fn separated<const N: usize, const M: usize>(p: &[IVec2; N], q: &[IVec2; M]) -> bool {
    let axis_separates = |a: IVec2, b: IVec2| {
        let n = IVec2::new(-(b.y - a.y), b.x - a.x);
        let project = |v: &IVec2| i64::from(n.x) * i64::from(v.x) + i64::from(n.y) * i64::from(v.y);
        let (pmin, pmax) = min_max(p.iter().map(project));
        let (qmin, qmax) = min_max(q.iter().map(project));
        pmax <= qmin || qmax <= pmin
    };
    edges(p).any(|(a, b)| axis_separates(a, b)) || edges(q).any(|(a, b)| axis_separates(a, b))
}

fn min_max(values: impl Iterator<Item = i64>) -> (i64, i64) {
    values.fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Rectangle/triangle overlap. Accepts on (a) a triangle vertex inside the
/// rectangle, (b) a rectangle corner inside the triangle or (c) crossing
/// edges; anything else (shared diagonals, nested or coincident shapes) is
/// decided by the separating-axis test.
pub fn rect_triangle_intersect(r: &Rect, t: &Triangle) -> bool {
    if r.is_empty() || t.is_degenerate() {
        return false;
    }
    let tri = t.vertices();
    let corners = r.corners();
    if tri.iter().any(|v| rect_contains_strict(r, *v)) {
        return true;
    }
    if corners.iter().any(|c| triangle_contains_strict(t, *c)) {
        return true;
    }
    if any_edge_crossing(&tri, &corners) {
        return true;
    }
    !separated(&tri, &corners)
}

/// Triangle/triangle overlap, same structure as [`rect_triangle_intersect`].
pub fn triangle_triangle_intersect(t1: &Triangle, t2: &Triangle) -> bool {
    if t1.is_degenerate() || t2.is_degenerate() {
        return false;
    }
    let p = t1.vertices();
    let q = t2.vertices();
    if p.iter().any(|v| triangle_contains_strict(t2, *v))
        || q.iter().any(|v| triangle_contains_strict(t1, *v))
    {
        return true;
    }
    if any_edge_crossing(&p, &q) {
        return true;
    }
    !separated(&p, &q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(x: i32, y: i32) -> IVec2 {
        IVec2::new(x, y)
    }

    fn tri(a: (i32, i32), b: (i32, i32), c: (i32, i32)) -> Triangle {
        Triangle::new(v(a.0, a.1), v(b.0, b.1), v(c.0, c.1)).unwrap()
    }

    #[test]
    fn rect_intersection_region() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(rect_intersect(&a, &b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(rect_overlap_area(&a, &b), 25);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let floor = Rect::new(0, 160, 320, 16);
        let standing = Rect::new(80, 144, 12, 16);
        assert_eq!(rect_intersect(&floor, &standing), None);
        assert_eq!(rect_intersect(&Rect::new(0, 0, 0, 5), &floor), None);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0, 0, 4, 4);
        assert!(rect_contains(&r, v(0, 0)));
        assert!(rect_contains(&r, v(3, 3)));
        assert!(!rect_contains(&r, v(4, 0)));
        assert!(!rect_contains(&r, v(0, 4)));
    }

    #[test]
    fn sized_rect_rejects_empty() {
        assert!(Rect::sized(0, 0, 0, 3).is_err());
        assert!(Rect::sized(0, 0, 2, 3).is_ok());
    }

    #[test]
    fn triangle_rejects_repeated_vertices() {
        assert_eq!(
            Triangle::new(v(0, 0), v(0, 0), v(1, 1)),
            Err(GeomError::RepeatedVertex(v(0, 0)))
        );
        assert!(Triangle::new(v(0, 0), v(1, 1), v(2, 2)).unwrap().is_degenerate());
    }

    #[test]
    fn triangle_contains_boundary_and_interior() {
        let t = tri((0, 0), (10, 0), (0, 10));
        assert!(triangle_contains(&t, v(1, 1)));
        assert!(triangle_contains(&t, v(5, 5)));
        assert!(!triangle_contains(&t, v(6, 6)));
        let flat = Triangle::new(v(0, 0), v(1, 1), v(2, 2)).unwrap();
        assert!(!triangle_contains(&flat, v(1, 1)));
    }

    #[test]
    fn segments_cross_but_parallel_do_not() {
        assert!(segment_segment_intersect(v(0, 0), v(4, 4), v(0, 4), v(4, 0)));
        assert!(!segment_segment_intersect(v(0, 0), v(4, 0), v(0, 1), v(4, 1)));
        assert!(!segment_segment_intersect(v(0, 0), v(4, 0), v(2, 0), v(6, 0)));
        // touching at an endpoint
        assert!(!segment_segment_intersect(v(0, 0), v(4, 0), v(4, 0), v(4, 4)));
    }

    #[test]
    fn actor_resting_on_slope_does_not_overlap() {
        // hypotenuse from (64,160) up to (96,144)
        let slope = tri((64, 160), (96, 160), (96, 144));
        // bottom-right corner at (84,154); line y at x=84 is 150
        assert!(rect_triangle_intersect(&Rect::new(72, 138, 12, 16), &slope));
        // bottom at 150 exactly on the line
        assert!(!rect_triangle_intersect(&Rect::new(72, 134, 12, 16), &slope));
    }

    #[test]
    fn shared_diagonal_overlaps() {
        let r = Rect::new(4, -1, 1, 1);
        let t = tri((5, 5), (4, 0), (5, -1));
        assert!(rect_triangle_intersect(&r, &t));
    }

    #[test]
    fn nested_shapes_overlap() {
        let outer = tri((0, 0), (20, 0), (0, 20));
        assert!(rect_triangle_intersect(&Rect::new(0, 0, 10, 10), &outer));
        let inner = tri((0, 0), (10, 0), (0, 10));
        assert!(rect_triangle_intersect(&Rect::new(0, 0, 10, 10), &inner));
        assert!(triangle_triangle_intersect(&outer, &inner));
        assert!(triangle_triangle_intersect(&inner, &inner));
    }

    #[test]
    fn triangles_sharing_an_edge_touch_only() {
        let a = tri((0, 0), (10, 0), (0, 10));
        let b = tri((10, 0), (0, 10), (10, 10));
        assert!(!triangle_triangle_intersect(&a, &b));
    }

    #[test]
    fn degenerate_triangles_are_ignored() {
        let flat = Triangle::new(v(0, 0), v(5, 5), v(10, 10)).unwrap();
        assert!(!rect_triangle_intersect(&Rect::new(0, 0, 10, 10), &flat));
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (-8..8i32, -8..8i32, 1..8i32, 1..8i32).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    fn arb_triangle() -> impl Strategy<Value = Triangle> {
        prop::array::uniform3((-8..8i32, -8..8i32))
            .prop_filter_map("repeated vertex", |p| {
                Triangle::new(v(p[0].0, p[0].1), v(p[1].0, p[1].1), v(p[2].0, p[2].1)).ok()
            })
            .prop_filter("zero area", |t| !t.is_degenerate())
    }

    /// Brute-force witness: a quarter-pixel sample strictly inside both shapes.
    fn shared_interior_sample(a: &Shape, b: &Shape) -> bool {
        let inside = |s: &Shape, p: IVec2| match s {
            Shape::Rect(r) => rect_contains_strict(&Rect::new(r.x * 4, r.y * 4, r.w * 4, r.h * 4), p),
            Shape::Triangle(t) => triangle_contains_strict(
                &Triangle { a: t.a * 4, b: t.b * 4, c: t.c * 4 },
                p,
            ),
        };
        let bb = a.aabb().union(&b.aabb());
        (bb.x * 4..=bb.right() * 4)
            .any(|x| (bb.y * 4..=bb.bottom() * 4).any(|y| inside(a, v(x, y)) && inside(b, v(x, y))))
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(r in arb_rect(), t in arb_triangle(), u in arb_triangle()) {
            let (sr, st, su) = (Shape::Rect(r), Shape::Triangle(t), Shape::Triangle(u));
            prop_assert_eq!(sr.overlaps(&st), st.overlaps(&sr));
            prop_assert_eq!(st.overlaps(&su), su.overlaps(&st));
        }

        #[test]
        fn overlap_implies_shared_interior_sample(r in arb_rect(), t in arb_triangle()) {
            let (sr, st) = (Shape::Rect(r), Shape::Triangle(t));
            if !sr.overlaps(&st) {
                prop_assert!(!shared_interior_sample(&sr, &st));
            }
        }
    }
}
