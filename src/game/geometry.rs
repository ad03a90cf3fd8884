//! Containment predicates for hill volumes
//!
//! Pure functions over world positions. Sphere and box triggers can be tested
//! exactly, or approximated as upright cylinders so that standing on a ledge
//! above a round trigger does not count as being on the hill.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;

/// Orthonormal local frame of a trigger (right = x, up = y, forward = z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Basis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Basis {
    pub const IDENTITY: Basis = Basis {
        right: Vec3::X,
        up: Vec3::Y,
        forward: Vec3::Z,
    };

    /// Basis rotated by `yaw` radians around world up
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            right: Vec3::new(cos, 0.0, -sin),
            up: Vec3::Y,
            forward: Vec3::new(sin, 0.0, cos),
        }
    }

    /// Express a world-space offset in this basis
    #[inline]
    pub fn to_local(&self, offset: Vec3) -> Vec3 {
        Vec3::new(
            offset.dot(self.right),
            offset.dot(self.up),
            offset.dot(self.forward),
        )
    }
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Exact sphere containment
pub fn point_in_sphere(point: Vec3, center: Vec3, radius: f32) -> bool {
    point.distance_sq_to(center) <= radius * radius
}

/// Exact oriented box containment
pub fn point_in_box(point: Vec3, center: Vec3, basis: &Basis, half_extents: Vec3) -> bool {
    let local = basis.to_local(point - center);
    local.x.abs() <= half_extents.x
        && local.y.abs() <= half_extents.y
        && local.z.abs() <= half_extents.z
}

/// Sphere approximated as a cylinder of equal radius and half-height along `axis`
pub fn point_in_sphere_cylinder(point: Vec3, center: Vec3, radius: f32, axis: Vec3) -> bool {
    let axis = axis.normalize();
    if axis == Vec3::ZERO {
        return point_in_sphere(point, center, radius);
    }
    let offset = point - center;
    let axial = offset.dot(axis);
    if axial.abs() > radius {
        return false;
    }
    offset.reject_from(axis).length_sq() <= radius * radius
}

/// Box approximated by its inscribed upright cylinder
///
/// Radius is `min(half_x, half_z)`, half-height is `half_y`, measured in the
/// box's local frame.
pub fn point_in_box_cylinder(point: Vec3, center: Vec3, basis: &Basis, half_extents: Vec3) -> bool {
    let local = basis.to_local(point - center);
    if local.y.abs() > half_extents.y {
        return false;
    }
    let radius = half_extents.x.min(half_extents.z);
    local.x * local.x + local.z * local.z <= radius * radius
}

/// Shape a hill is tested against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Volume {
    Sphere { center: Vec3, radius: f32 },
    Box { center: Vec3, basis: Basis, half_extents: Vec3 },
    CylinderFromSphere { center: Vec3, radius: f32, axis: Vec3 },
    CylinderFromBox { center: Vec3, basis: Basis, half_extents: Vec3 },
}

impl Volume {
    pub fn contains(&self, point: Vec3) -> bool {
        if !point.is_finite() {
            return false;
        }
        match self {
            Volume::Sphere { center, radius } => point_in_sphere(point, *center, *radius),
            Volume::Box {
                center,
                basis,
                half_extents,
            } => point_in_box(point, *center, basis, *half_extents),
            Volume::CylinderFromSphere {
                center,
                radius,
                axis,
            } => point_in_sphere_cylinder(point, *center, *radius, *axis),
            Volume::CylinderFromBox {
                center,
                basis,
                half_extents,
            } => point_in_box_cylinder(point, *center, basis, *half_extents),
        }
    }

    pub fn center(&self) -> Vec3 {
        match self {
            Volume::Sphere { center, .. }
            | Volume::Box { center, .. }
            | Volume::CylinderFromSphere { center, .. }
            | Volume::CylinderFromBox { center, .. } => *center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_exact() {
        let c = Vec3::new(10.0, 0.0, 0.0);
        assert!(point_in_sphere(Vec3::new(12.0, 0.0, 0.0), c, 2.0));
        assert!(!point_in_sphere(Vec3::new(12.1, 0.0, 0.0), c, 2.0));
    }

    #[test]
    fn test_sphere_cylinder_includes_corner_outside_sphere() {
        // Near the rim: outside a radius-5 sphere but inside its cylinder
        let p = Vec3::new(3.0, 4.5, 3.0);
        assert!(!point_in_sphere(p, Vec3::ZERO, 5.0));
        assert!(point_in_sphere_cylinder(p, Vec3::ZERO, 5.0, Vec3::Y));
    }

    #[test]
    fn test_sphere_cylinder_height_limit() {
        assert!(!point_in_sphere_cylinder(Vec3::new(0.0, 5.5, 0.0), Vec3::ZERO, 5.0, Vec3::Y));
        assert!(point_in_sphere_cylinder(Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO, 5.0, Vec3::Y));
    }

    #[test]
    fn test_sphere_cylinder_tilted_axis() {
        // Axis along world X: height is measured along X
        let p = Vec3::new(4.9, 0.0, 4.9);
        assert!(point_in_sphere_cylinder(p, Vec3::ZERO, 5.0, Vec3::X));
        assert!(!point_in_sphere_cylinder(Vec3::new(5.1, 0.0, 0.0), Vec3::ZERO, 5.0, Vec3::X));
    }

    #[test]
    fn test_sphere_cylinder_degenerate_axis_falls_back() {
        assert!(point_in_sphere_cylinder(Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO, 2.0, Vec3::ZERO));
        assert!(!point_in_sphere_cylinder(Vec3::new(2.0, 2.0, 0.0), Vec3::ZERO, 2.0, Vec3::ZERO));
    }

    #[test]
    fn test_box_exact_oriented() {
        let basis = Basis::from_yaw(std::f32::consts::FRAC_PI_2);
        let half = Vec3::new(10.0, 2.0, 1.0);
        // Rotated 90 degrees: the long local x axis now lies along world -z
        assert!(point_in_box(Vec3::new(0.0, 0.0, -9.0), Vec3::ZERO, &basis, half));
        assert!(!point_in_box(Vec3::new(9.0, 0.0, 0.0), Vec3::ZERO, &basis, half));
    }

    #[test]
    fn test_box_cylinder_uses_smaller_horizontal_extent() {
        let half = Vec3::new(10.0, 3.0, 4.0);
        let basis = Basis::IDENTITY;
        assert!(point_in_box_cylinder(Vec3::new(3.9, 0.0, 0.0), Vec3::ZERO, &basis, half));
        // Inside the box but outside the inscribed radius-4 cylinder
        assert!(point_in_box(Vec3::new(8.0, 0.0, 0.0), Vec3::ZERO, &basis, half));
        assert!(!point_in_box_cylinder(Vec3::new(8.0, 0.0, 0.0), Vec3::ZERO, &basis, half));
        assert!(!point_in_box_cylinder(Vec3::new(0.0, 3.5, 0.0), Vec3::ZERO, &basis, half));
    }

    #[test]
    fn test_volume_dispatch() {
        let center = Vec3::new(0.0, 10.0, 0.0);
        let sphere = Volume::Sphere { center, radius: 3.0 };
        let cyl = Volume::CylinderFromSphere {
            center,
            radius: 3.0,
            axis: Vec3::Y,
        };
        let p = Vec3::new(2.5, 12.5, 0.0);
        assert!(!sphere.contains(p));
        assert!(cyl.contains(p));
        assert_eq!(sphere.center(), center);
    }

    #[test]
    fn test_volume_rejects_non_finite() {
        let sphere = Volume::Sphere {
            center: Vec3::ZERO,
            radius: f32::INFINITY,
        };
        assert!(!sphere.contains(Vec3::new(f32::NAN, 0.0, 0.0)));
    }
}
