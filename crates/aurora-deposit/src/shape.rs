//! B-spline particle shapes.

use std::fmt;

use aurora_core::Scalar;

/// Largest support radius the stencil buffers accommodate.
pub const MAX_RADIUS: i32 = 2;

/// A particle shape function `S(x)` on a unit-spaced mesh.
///
/// `S` must vanish for `|x| >= RADIUS` (or `> RADIUS - 1/2` for the
/// zeroth order) and sum to one over any unit-spaced set of nodes.
pub trait Shape: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Support radius in cells.
    const RADIUS: i32;

    /// Spline order.
    const ORDER: u32;

    /// Weight at distance `x` from a node.
    fn eval(x: Scalar) -> Scalar;
}

/// Zeroth order: the whole particle on the nearest node.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestGridPoint;

impl Shape for NearestGridPoint {
    const RADIUS: i32 = 1;
    const ORDER: u32 = 0;

    #[inline]
    fn eval(x: Scalar) -> Scalar {
        // Half-open so a particle exactly between two nodes lands on one.
        if (-0.5..0.5).contains(&x) {
            1.0
        } else {
            0.0
        }
    }
}

/// First order (cloud-in-cell): linear weighting.
#[derive(Clone, Copy, Debug, Default)]
pub struct CloudInCell;

impl Shape for CloudInCell {
    const RADIUS: i32 = 1;
    const ORDER: u32 = 1;

    #[inline]
    fn eval(x: Scalar) -> Scalar {
        (1.0 - x.abs()).max(0.0)
    }
}

/// Second order (triangular-shaped cloud).
#[derive(Clone, Copy, Debug, Default)]
pub struct TriangularShapedCloud;

impl Shape for TriangularShapedCloud {
    const RADIUS: i32 = 2;
    const ORDER: u32 = 2;

    #[inline]
    fn eval(x: Scalar) -> Scalar {
        let a = x.abs();
        if a < 0.5 {
            0.75 - a * a
        } else if a < 1.5 {
            let t = 1.5 - a;
            0.5 * t * t
        } else {
            0.0
        }
    }
}

/// Third order (piecewise cubic).
#[derive(Clone, Copy, Debug, Default)]
pub struct PiecewiseCubic;

impl Shape for PiecewiseCubic {
    const RADIUS: i32 = 2;
    const ORDER: u32 = 3;

    #[inline]
    fn eval(x: Scalar) -> Scalar {
        let a = x.abs();
        if a < 1.0 {
            2.0 / 3.0 - a * a + 0.5 * a * a * a
        } else if a < 2.0 {
            let t = 2.0 - a;
            t * t * t / 6.0
        } else {
            0.0
        }
    }
}

/// Runtime shape selection for configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeOrder {
    /// [`NearestGridPoint`].
    Ngp,
    /// [`CloudInCell`].
    #[default]
    Cic,
    /// [`TriangularShapedCloud`].
    Tsc,
    /// [`PiecewiseCubic`].
    Pcs,
}

impl ShapeOrder {
    /// Support radius of the selected shape.
    pub fn radius(self) -> i32 {
        match self {
            Self::Ngp => NearestGridPoint::RADIUS,
            Self::Cic => CloudInCell::RADIUS,
            Self::Tsc => TriangularShapedCloud::RADIUS,
            Self::Pcs => PiecewiseCubic::RADIUS,
        }
    }
}

impl fmt::Display for ShapeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ngp => "ngp",
            Self::Cic => "cic",
            Self::Tsc => "tsc",
            Self::Pcs => "pcs",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node_sum<S: Shape>(x: Scalar) -> Scalar {
        (-S::RADIUS - 1..=S::RADIUS + 1)
            .map(|i| S::eval(i as Scalar - x))
            .sum()
    }

    #[test]
    fn values_at_the_node() {
        assert_eq!(NearestGridPoint::eval(0.0), 1.0);
        assert_eq!(CloudInCell::eval(0.0), 1.0);
        assert_eq!(TriangularShapedCloud::eval(0.0), 0.75);
        assert!((PiecewiseCubic::eval(0.0) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(CloudInCell::eval(1.0), 0.0);
        assert_eq!(TriangularShapedCloud::eval(1.5), 0.0);
        assert_eq!(PiecewiseCubic::eval(2.0), 0.0);
    }

    #[test]
    fn ngp_midpoint_goes_to_one_node() {
        assert_eq!(node_sum::<NearestGridPoint>(0.5), 1.0);
        assert_eq!(NearestGridPoint::eval(-0.5), 1.0);
        assert_eq!(NearestGridPoint::eval(0.5), 0.0);
    }

    #[test]
    fn shape_order_radius() {
        assert_eq!(ShapeOrder::default(), ShapeOrder::Cic);
        assert_eq!(ShapeOrder::Tsc.radius(), 2);
        assert_eq!(ShapeOrder::Pcs.to_string(), "pcs");
    }

    proptest! {
        #[test]
        fn partition_of_unity(x in 0.0..1.0f64) {
            let x = x as Scalar;
            prop_assert!((node_sum::<NearestGridPoint>(x) - 1.0).abs() < 1e-12);
            prop_assert!((node_sum::<CloudInCell>(x) - 1.0).abs() < 1e-12);
            prop_assert!((node_sum::<TriangularShapedCloud>(x) - 1.0).abs() < 1e-12);
            prop_assert!((node_sum::<PiecewiseCubic>(x) - 1.0).abs() < 1e-12);
        }
    }
}
