// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use cgmath::{InnerSpace, Vector3};

/// The assumed thickness of a plane for coincidence tests.
///
/// Roundoff error accumulated while deriving planes and splitting triangles
/// makes exact signed-distance comparisons useless; points within this
/// distance of a plane are treated as lying on it.
pub const PLANE_THICKNESS: f64 = 5e-4;

/// Widen a single-precision vector for double-precision plane arithmetic.
///
/// Triangle coordinates scale to hundreds of units, and cross products lose
/// two to three significant bits; every plane derivation therefore runs in
/// double precision.
pub fn vec3_f64(v: Vector3<f32>) -> Vector3<f64> {
    Vector3::new(v.x as f64, v.y as f64, v.z as f64)
}

/// The position of a point relative to a plane, looking along the plane
/// normal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PointSide {
    Below,
    On,
    Above,
}

/// The position of a triangle relative to a partition plane, derived from
/// the classifications of its three vertices.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriSide {
    /// All vertices `Below` or `On`.
    Back,

    /// Vertices strictly on both sides of the plane.
    Spanning,

    /// All three vertices `On`.
    Coincident,

    /// All vertices `Above` or `On`.
    Front,
}

/// A plane in point-normal form, the coefficients of `Ax + By + Cz + D = 0`.
///
/// `(A, B, C)` is always a unit vector, so plugging a point into the
/// left-hand side yields its signed distance from the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    d: f64,
}

impl Plane {
    /// Creates a plane directly from its four coefficients.
    ///
    /// The caller must guarantee that `normal` is a unit vector; planes read
    /// back from a compiled tree satisfy this because they were unit on
    /// write.
    pub fn from_coefficients(normal: Vector3<f64>, d: f64) -> Plane {
        Plane { normal, d }
    }

    /// Derives the plane containing the triangle `V0 V1 V2`.
    ///
    /// The vertices must be given in anticlockwise order with respect to the
    /// front of the triangle; the normal is the normalized cross product of
    /// the edges `V0 V1` and `V0 V2`. Returns `None` if the triangle is too
    /// needle-like for the normal to be meaningful.
    pub fn for_triangle(verts: &[Vector3<f32>; 3]) -> Option<Plane> {
        let v0 = vec3_f64(verts[0]);
        let ab = vec3_f64(verts[1]) - v0;
        let ac = vec3_f64(verts[2]) - v0;

        let cross = ab.cross(ac);
        let mag = cross.magnitude();
        if mag <= ::std::f64::EPSILON {
            // vertices are (nearly) collinear
            return None;
        }

        let normal = cross / mag;

        Some(Plane {
            normal,
            d: -normal.dot(v0),
        })
    }

    /// Returns the surface normal of this plane.
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Returns the constant coefficient `D` of the plane equation.
    pub fn d(&self) -> f64 {
        self.d
    }

    /// Calculates the signed distance between this plane and the given point.
    pub fn point_dist(&self, point: Vector3<f32>) -> f64 {
        self.normal.dot(vec3_f64(point)) + self.d
    }

    /// Classifies a point as below, on or above this plane.
    pub fn classify_point(&self, point: Vector3<f32>) -> PointSide {
        let dist = self.point_dist(point);

        if dist.abs() <= PLANE_THICKNESS {
            PointSide::On
        } else if dist > PLANE_THICKNESS {
            PointSide::Above
        } else {
            PointSide::Below
        }
    }

    /// Classifies each vertex of a triangle against this plane.
    pub fn classify_vertices(&self, verts: &[Vector3<f32>; 3]) -> [PointSide; 3] {
        [
            self.classify_point(verts[0]),
            self.classify_point(verts[1]),
            self.classify_point(verts[2]),
        ]
    }

    /// Classifies a triangle against this plane.
    pub fn classify_triangle(&self, verts: &[Vector3<f32>; 3]) -> TriSide {
        let mut on = 0;
        let mut above = 0;
        let mut below = 0;

        for side in self.classify_vertices(verts).iter() {
            match side {
                PointSide::On => on += 1,
                PointSide::Above => above += 1,
                PointSide::Below => below += 1,
            }
        }

        if on == 3 {
            TriSide::Coincident
        } else if above + on == 3 {
            TriSide::Front
        } else if below + on == 3 {
            TriSide::Back
        } else {
            TriSide::Spanning
        }
    }

    /// Intersects this plane with the line segment from `v0` to `v1`.
    ///
    /// Returns the parameter `t` and the intersection point
    /// `P = V0 + t * (V1 - V0)`. The point is numerically coincident with
    /// the plane.
    ///
    /// ## Panics
    /// - If the segment is parallel to the plane. Callers must only pass
    ///   segments whose endpoints classify to strictly opposite sides.
    pub fn intersect_edge(&self, v0: Vector3<f32>, v1: Vector3<f32>) -> (f64, Vector3<f32>) {
        let start = vec3_f64(v0);
        let seg = vec3_f64(v1) - start;

        // plug V = V0 + t * (V1 - V0) into the plane equation and solve for
        // t; the denominator vanishes when the segment runs parallel to the
        // plane
        let denom = self.normal.dot(seg);

        // epsilon scaled to the operand magnitudes
        let epsilon = ((self.normal.x + v1.z as f64) * ::std::f64::EPSILON / 2.0).abs();
        if denom.abs() <= epsilon {
            panic!("intersect_edge: segment is parallel to the plane");
        }

        let t = -(self.normal.dot(start) + self.d) / denom;
        let point = start + seg * t;

        (
            t,
            Vector3::new(point.x as f32, point.y as f32, point.z as f32),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use cgmath::Vector3;

    fn z_wall() -> [Vector3<f32>; 3] {
        [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_plane_for_triangle() {
        let plane = Plane::for_triangle(&z_wall()).unwrap();
        assert_eq!(plane.normal(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(plane.d(), 0.0);
    }

    #[test]
    fn test_plane_normal_is_unit() {
        let plane = Plane::for_triangle(&[
            Vector3::new(13.5, -2.25, 101.0),
            Vector3::new(-40.0, 7.5, 99.125),
            Vector3::new(12.0, 55.75, -3.0),
        ])
        .unwrap();

        assert!((plane.normal().magnitude2() - 1.0).abs() <= 1e-6);
    }

    #[test]
    fn test_plane_for_degenerate_triangle() {
        // collinear vertices have no well-defined normal
        assert!(Plane::for_triangle(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(2.0, 2.0, 2.0),
        ])
        .is_none());
    }

    #[test]
    fn test_classify_point() {
        let plane = Plane::for_triangle(&z_wall()).unwrap();

        assert_eq!(
            plane.classify_point(Vector3::new(0.5, 0.5, 1.0)),
            PointSide::Above
        );
        assert_eq!(
            plane.classify_point(Vector3::new(0.5, 0.5, -1.0)),
            PointSide::Below
        );

        // the plane is fat: points within PLANE_THICKNESS lie on it
        assert_eq!(
            plane.classify_point(Vector3::new(0.5, 0.5, 4e-4)),
            PointSide::On
        );
        assert_eq!(
            plane.classify_point(Vector3::new(0.5, 0.5, -4e-4)),
            PointSide::On
        );
    }

    #[test]
    fn test_classify_triangle() {
        let plane = Plane::for_triangle(&z_wall()).unwrap();

        assert_eq!(plane.classify_triangle(&z_wall()), TriSide::Coincident);

        assert_eq!(
            plane.classify_triangle(&[
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 2.0),
                Vector3::new(0.0, 1.0, 1.0),
            ]),
            TriSide::Front
        );

        // an edge on the plane does not make the triangle spanning
        assert_eq!(
            plane.classify_triangle(&[
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, -2.0),
            ]),
            TriSide::Back
        );

        assert_eq!(
            plane.classify_triangle(&[
                Vector3::new(0.0, 0.0, -1.0),
                Vector3::new(1.0, 0.0, 1.0),
                Vector3::new(0.0, 1.0, 1.0),
            ]),
            TriSide::Spanning
        );
    }

    #[test]
    fn test_intersect_edge() {
        let plane = Plane::for_triangle(&z_wall()).unwrap();

        let (t, point) =
            plane.intersect_edge(Vector3::new(0.5, 0.5, -1.0), Vector3::new(0.5, 0.5, 1.0));
        assert_eq!(t, 0.5);
        assert_eq!(point, Vector3::new(0.5, 0.5, 0.0));

        // the intersection point must land on the (fat) plane
        assert_eq!(plane.classify_point(point), PointSide::On);
    }

    #[test]
    #[should_panic]
    fn test_intersect_edge_parallel() {
        let plane = Plane::for_triangle(&z_wall()).unwrap();
        plane.intersect_edge(Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 1.0, 1.0));
    }
}
