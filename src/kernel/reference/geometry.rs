//! Primitive contact and ray tests used by [`super::ReferenceKernel`].
//!
//! Contact normals point from the second solid into the first.

use glam::{Quat, Vec3};

const EPSILON: f32 = 1e-6;
const SEARCH_ITERATIONS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.conjugate() * (point - self.position)
    }

    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }
}

/// World-space solid ready for testing.
#[derive(Debug, Clone)]
pub(crate) enum Solid {
    Sphere { center: Vec3, radius: f32 },
    Capsule { a: Vec3, b: Vec3, radius: f32 },
    /// Tested exactly by rays; contacts treat it as a capsule of the same radius.
    Cylinder { pose: Pose, radius: f32, half_length: f32 },
    Box { pose: Pose, half_extents: Vec3 },
    Plane { normal: Vec3, offset: f32 },
    Mesh { vertices: Vec<Vec3>, triangles: Vec<[u32; 3]> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hit {
    pub position: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

impl Hit {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RayHit {
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
    pub triangle: Option<u32>,
}

impl Solid {
    /// Segment and radius for solids handled as swept spheres.
    fn as_round(&self) -> Option<(Vec3, Vec3, f32)> {
        match self {
            Solid::Sphere { center, radius } => Some((*center, *center, *radius)),
            Solid::Capsule { a, b, radius } => Some((*a, *b, *radius)),
            Solid::Cylinder {
                pose,
                radius,
                half_length,
            } => {
                let axis = pose.rotation * Vec3::Z * *half_length;
                Some((pose.position - axis, pose.position + axis, *radius))
            }
            _ => None,
        }
    }
}

pub(crate) fn contact(a: &Solid, b: &Solid) -> Option<Hit> {
    use Solid::*;
    match (a, b) {
        (Plane { .. } | Mesh { .. }, Plane { .. } | Mesh { .. }) => None,
        (_, Plane { normal, offset }) => against_plane(a, *normal, *offset),
        (Plane { .. }, _) => contact(b, a).map(Hit::flipped),
        (_, Mesh { vertices, triangles }) => against_mesh(a, vertices, triangles),
        (Mesh { .. }, _) => contact(b, a).map(Hit::flipped),
        (
            Box {
                pose: pose_a,
                half_extents: half_a,
            },
            Box {
                pose: pose_b,
                half_extents: half_b,
            },
        ) => box_box(pose_a, *half_a, pose_b, *half_b),
        (Box { pose, half_extents }, _) => {
            let round = b.as_round()?;
            round_box(round, pose, *half_extents).map(Hit::flipped)
        }
        (_, Box { pose, half_extents }) => round_box(a.as_round()?, pose, *half_extents),
        _ => {
            let (a0, a1, ra) = a.as_round()?;
            let (b0, b1, rb) = b.as_round()?;
            let (p, q) = closest_points_segments(a0, a1, b0, b1);
            sphere_sphere(p, ra, q, rb)
        }
    }
}

fn sphere_sphere(center_a: Vec3, radius_a: f32, center_b: Vec3, radius_b: f32) -> Option<Hit> {
    let delta = center_a - center_b;
    let distance = delta.length();
    let depth = radius_a + radius_b - distance;
    if depth <= 0.0 {
        return None;
    }
    let normal = if distance > EPSILON {
        delta / distance
    } else {
        Vec3::Y
    };
    Some(Hit {
        position: center_b + normal * (radius_b - depth * 0.5),
        normal,
        depth,
    })
}

fn point_box_distance(point: Vec3, pose: &Pose, half_extents: Vec3) -> f32 {
    let local = pose.inverse_transform_point(point);
    (local - local.clamp(-half_extents, half_extents)).length()
}

fn round_box((s0, s1, radius): (Vec3, Vec3, f32), pose: &Pose, half_extents: Vec3) -> Option<Hit> {
    let t = if s0.distance_squared(s1) < EPSILON {
        0.0
    } else {
        ternary_min(|t| point_box_distance(s0.lerp(s1, t), pose, half_extents))
    };
    sphere_box(s0.lerp(s1, t), radius, pose, half_extents)
}

fn sphere_box(center: Vec3, radius: f32, pose: &Pose, half_extents: Vec3) -> Option<Hit> {
    let local = pose.inverse_transform_point(center);
    let clamped = local.clamp(-half_extents, half_extents);
    let delta = local - clamped;
    let distance = delta.length();
    if distance > radius {
        return None;
    }

    if distance > EPSILON {
        return Some(Hit {
            position: pose.transform_point(clamped),
            normal: pose.rotation * (delta / distance),
            depth: radius - distance,
        });
    }

    // Centre inside the box: push out through the closest face.
    let gaps = half_extents - local.abs();
    let mut axis = 0;
    for i in 1..3 {
        if gaps[i] < gaps[axis] {
            axis = i;
        }
    }
    let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut normal = Vec3::ZERO;
    normal[axis] = sign;
    let mut surface = local;
    surface[axis] = sign * half_extents[axis];

    Some(Hit {
        position: pose.transform_point(surface),
        normal: pose.rotation * normal,
        depth: radius + gaps[axis],
    })
}

fn box_vertices(pose: &Pose, half_extents: Vec3) -> [Vec3; 8] {
    let mut vertices = [Vec3::ZERO; 8];
    for (i, vertex) in vertices.iter_mut().enumerate() {
        let corner = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *vertex = pose.transform_point(corner * half_extents);
    }
    vertices
}

fn box_axes(pose: &Pose) -> [Vec3; 3] {
    [
        pose.rotation * Vec3::X,
        pose.rotation * Vec3::Y,
        pose.rotation * Vec3::Z,
    ]
}

fn project(vertices: &[Vec3], axis: Vec3) -> (f32, f32) {
    vertices
        .iter()
        .map(|v| v.dot(axis))
        .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

/// Separating-axis test over point sets; the normal points from `b` into `a`.
fn separating_axis(a: &[Vec3], b: &[Vec3], axes: &[Vec3]) -> Option<Hit> {
    let mut best: Option<(Vec3, f32)> = None;

    for axis in axes {
        let length_squared = axis.length_squared();
        if length_squared < EPSILON {
            continue;
        }
        let axis = *axis / length_squared.sqrt();
        let (a_min, a_max) = project(a, axis);
        let (b_min, b_max) = project(b, axis);

        let push_positive = b_max - a_min;
        let push_negative = a_max - b_min;
        if push_positive <= 0.0 || push_negative <= 0.0 {
            return None;
        }

        let (depth, normal) = if push_positive < push_negative {
            (push_positive, axis)
        } else {
            (push_negative, -axis)
        };
        if best.map_or(true, |(_, best_depth)| depth < best_depth) {
            best = Some((normal, depth));
        }
    }

    let (normal, depth) = best?;

    // Average the vertices of `a` that sit inside `b` along the normal.
    let (a_min, _) = project(a, normal);
    let tolerance = depth.max(1e-3);
    let (sum, count) = a
        .iter()
        .filter(|v| v.dot(normal) <= a_min + tolerance)
        .fold((Vec3::ZERO, 0usize), |(sum, count), v| (sum + *v, count + 1));
    let deepest = sum / count.max(1) as f32;

    Some(Hit {
        position: deepest + normal * depth * 0.5,
        normal,
        depth,
    })
}

fn box_box(pose_a: &Pose, half_a: Vec3, pose_b: &Pose, half_b: Vec3) -> Option<Hit> {
    let axes_a = box_axes(pose_a);
    let axes_b = box_axes(pose_b);

    let mut axes = Vec::with_capacity(15);
    axes.extend_from_slice(&axes_a);
    axes.extend_from_slice(&axes_b);
    for axis_a in &axes_a {
        for axis_b in &axes_b {
            axes.push(axis_a.cross(*axis_b));
        }
    }

    separating_axis(
        &box_vertices(pose_a, half_a),
        &box_vertices(pose_b, half_b),
        &axes,
    )
}

fn against_plane(solid: &Solid, normal: Vec3, offset: f32) -> Option<Hit> {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }

    let deepest = match solid {
        Solid::Box { pose, half_extents } => {
            let vertices = box_vertices(pose, *half_extents);
            let (lowest, _) = project(&vertices, normal);
            let (sum, count) = vertices
                .iter()
                .filter(|v| v.dot(normal) <= lowest + 1e-3)
                .fold((Vec3::ZERO, 0usize), |(sum, count), v| (sum + *v, count + 1));
            sum / count.max(1) as f32
        }
        Solid::Plane { .. } | Solid::Mesh { .. } => return None,
        _ => {
            let (s0, s1, radius) = solid.as_round()?;
            let (d0, d1) = (s0.dot(normal), s1.dot(normal));
            let core = if (d0 - d1).abs() < 1e-4 {
                (s0 + s1) * 0.5
            } else if d0 < d1 {
                s0
            } else {
                s1
            };
            core - normal * radius
        }
    };

    let depth = offset - deepest.dot(normal);
    if depth <= 0.0 {
        return None;
    }
    Some(Hit {
        position: deepest + normal * depth * 0.5,
        normal,
        depth,
    })
}

fn against_mesh(solid: &Solid, vertices: &[Vec3], triangles: &[[u32; 3]]) -> Option<Hit> {
    let mut best: Option<Hit> = None;

    for triangle in triangles {
        let Some(corners) = triangle_corners(vertices, triangle) else {
            continue;
        };
        let hit = match solid {
            Solid::Box { pose, half_extents } => box_triangle(pose, *half_extents, &corners),
            _ => solid
                .as_round()
                .and_then(|round| round_triangle(round, &corners)),
        };
        if let Some(hit) = hit {
            if best.map_or(true, |b| hit.depth > b.depth) {
                best = Some(hit);
            }
        }
    }

    best
}

fn triangle_corners(vertices: &[Vec3], triangle: &[u32; 3]) -> Option<[Vec3; 3]> {
    Some([
        *vertices.get(triangle[0] as usize)?,
        *vertices.get(triangle[1] as usize)?,
        *vertices.get(triangle[2] as usize)?,
    ])
}

fn round_triangle((s0, s1, radius): (Vec3, Vec3, f32), corners: &[Vec3; 3]) -> Option<Hit> {
    let [a, b, c] = *corners;
    let distance_to = |p: Vec3| p.distance(closest_point_on_triangle(p, a, b, c));
    let t = if s0.distance_squared(s1) < EPSILON {
        0.0
    } else {
        ternary_min(|t| distance_to(s0.lerp(s1, t)))
    };
    let center = s0.lerp(s1, t);
    let closest = closest_point_on_triangle(center, a, b, c);
    let delta = center - closest;
    let distance = delta.length();
    if distance > radius {
        return None;
    }

    let normal = if distance > EPSILON {
        delta / distance
    } else {
        (b - a).cross(c - a).normalize_or_zero()
    };
    Some(Hit {
        position: closest,
        normal,
        depth: radius - distance,
    })
}

fn box_triangle(pose: &Pose, half_extents: Vec3, corners: &[Vec3; 3]) -> Option<Hit> {
    let box_axes = box_axes(pose);
    let edges = [
        corners[1] - corners[0],
        corners[2] - corners[1],
        corners[0] - corners[2],
    ];

    let mut axes = Vec::with_capacity(13);
    axes.extend_from_slice(&box_axes);
    axes.push(edges[0].cross(edges[1]));
    for axis in &box_axes {
        for edge in &edges {
            axes.push(axis.cross(*edge));
        }
    }

    separating_axis(&box_vertices(pose, half_extents), corners, &axes)
}

/// Minimises a convex function over `[0, 1]`.
fn ternary_min(f: impl Fn(f32) -> f32) -> f32 {
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..SEARCH_ITERATIONS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if f(m1) < f(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    (lo + hi) * 0.5
}

pub(crate) fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared < EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length_squared).clamp(0.0, 1.0);
    a + ab * t
}

fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Casts a ray with unit `direction` against a solid. Rays starting inside a
/// solid report nothing for it.
pub(crate) fn ray_cast(solid: &Solid, origin: Vec3, direction: Vec3, length: f32) -> Option<RayHit> {
    let hit = match solid {
        Solid::Sphere { center, radius } => {
            let distance = ray_sphere(origin, direction, *center, *radius)?;
            let position = origin + direction * distance;
            RayHit {
                distance,
                position,
                normal: (position - *center).normalize_or_zero(),
                triangle: None,
            }
        }
        Solid::Capsule { a, b, radius } => ray_capsule(origin, direction, *a, *b, *radius)?,
        Solid::Cylinder {
            pose,
            radius,
            half_length,
        } => ray_cylinder(origin, direction, length, pose, *radius, *half_length)?,
        Solid::Box { pose, half_extents } => ray_box(origin, direction, length, pose, *half_extents)?,
        Solid::Plane { normal, offset } => {
            let normal = normal.normalize_or_zero();
            let approach = -direction.dot(normal);
            let height = origin.dot(normal) - offset;
            if approach <= EPSILON || height < 0.0 {
                return None;
            }
            let distance = height / approach;
            RayHit {
                distance,
                position: origin + direction * distance,
                normal,
                triangle: None,
            }
        }
        Solid::Mesh {
            vertices,
            triangles,
        } => ray_mesh(origin, direction, length, vertices, triangles)?,
    };

    (hit.distance >= 0.0 && hit.distance <= length).then_some(hit)
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    if c < 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_capsule(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, radius: f32) -> Option<RayHit> {
    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t >= 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };

    let ba = b - a;
    let oa = origin - a;
    let baba = ba.dot(ba);
    let bard = ba.dot(direction);
    let baoa = ba.dot(oa);
    let rdoa = direction.dot(oa);
    let oaoa = oa.dot(oa);
    let qa = baba - bard * bard;
    if qa > EPSILON {
        let qb = baba * rdoa - baoa * bard;
        let qc = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = qb * qb - qa * qc;
        if h >= 0.0 {
            let t = (-qb - h.sqrt()) / qa;
            let y = baoa + t * bard;
            if y > 0.0 && y < baba {
                consider(t);
            }
        }
    }
    if let Some(t) = ray_sphere(origin, direction, a, radius) {
        consider(t);
    }
    if let Some(t) = ray_sphere(origin, direction, b, radius) {
        consider(t);
    }

    let distance = best?;
    let position = origin + direction * distance;
    Some(RayHit {
        distance,
        position,
        normal: (position - closest_point_on_segment(position, a, b)).normalize_or_zero(),
        triangle: None,
    })
}

fn ray_cylinder(
    origin: Vec3,
    direction: Vec3,
    length: f32,
    pose: &Pose,
    radius: f32,
    half_length: f32,
) -> Option<RayHit> {
    let lo = pose.inverse_transform_point(origin);
    let ld = pose.rotation.conjugate() * direction;
    let mut t_enter = 0.0f32;
    let mut t_exit = length;
    let mut normal = Vec3::ZERO;

    if ld.z.abs() < EPSILON {
        if lo.z.abs() > half_length {
            return None;
        }
    } else {
        let mut t1 = (-half_length - lo.z) / ld.z;
        let mut t2 = (half_length - lo.z) / ld.z;
        let mut cap = -Vec3::Z;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            cap = Vec3::Z;
        }
        if t1 > t_enter {
            t_enter = t1;
            normal = cap;
        }
        t_exit = t_exit.min(t2);
    }

    let a = ld.x * ld.x + ld.y * ld.y;
    let b = lo.x * ld.x + lo.y * ld.y;
    let c = lo.x * lo.x + lo.y * lo.y - radius * radius;
    if a < EPSILON {
        if c > 0.0 {
            return None;
        }
    } else {
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let t1 = (-b - root) / a;
        let t2 = (-b + root) / a;
        if t1 > t_enter {
            t_enter = t1;
            let side = lo + ld * t1;
            normal = Vec3::new(side.x, side.y, 0.0).normalize_or_zero();
        }
        t_exit = t_exit.min(t2);
    }

    if t_enter > t_exit || normal == Vec3::ZERO {
        return None;
    }
    Some(RayHit {
        distance: t_enter,
        position: origin + direction * t_enter,
        normal: pose.rotation * normal,
        triangle: None,
    })
}

fn ray_box(
    origin: Vec3,
    direction: Vec3,
    length: f32,
    pose: &Pose,
    half_extents: Vec3,
) -> Option<RayHit> {
    let lo = pose.inverse_transform_point(origin);
    let ld = pose.rotation.conjugate() * direction;
    let mut t_min = 0.0f32;
    let mut t_max = length;
    let mut normal = Vec3::ZERO;

    for i in 0..3 {
        if ld[i].abs() < EPSILON {
            if lo[i] < -half_extents[i] || lo[i] > half_extents[i] {
                return None;
            }
            continue;
        }

        let inv_dir = 1.0 / ld[i];
        let mut t1 = (-half_extents[i] - lo[i]) * inv_dir;
        let mut t2 = (half_extents[i] - lo[i]) * inv_dir;
        let mut axis_normal = Vec3::ZERO;
        axis_normal[i] = -1.0;

        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            axis_normal = -axis_normal;
        }

        if t1 > t_min {
            t_min = t1;
            normal = axis_normal;
        }

        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if normal == Vec3::ZERO {
        return None;
    }
    Some(RayHit {
        distance: t_min,
        position: origin + direction * t_min,
        normal: pose.rotation * normal,
        triangle: None,
    })
}

fn ray_mesh(
    origin: Vec3,
    direction: Vec3,
    length: f32,
    vertices: &[Vec3],
    triangles: &[[u32; 3]],
) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;

    for (index, triangle) in triangles.iter().enumerate() {
        let Some([v0, v1, v2]) = triangle_corners(vertices, triangle) else {
            continue;
        };
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-9 {
            continue;
        }
        let inv_det = 1.0 / det;
        let s = origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            continue;
        }
        let q = s.cross(e1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            continue;
        }
        let t = e2.dot(q) * inv_det;
        if t < 0.0 || t > length {
            continue;
        }
        if best.is_some_and(|b| b.distance <= t) {
            continue;
        }

        let mut normal = e1.cross(e2).normalize_or_zero();
        if normal.dot(direction) > 0.0 {
            normal = -normal;
        }
        best = Some(RayHit {
            distance: t,
            position: origin + direction * t,
            normal,
            triangle: Some(index as u32),
        });
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box(position: Vec3) -> Solid {
        Solid::Box {
            pose: Pose::new(position, Quat::IDENTITY),
            half_extents: Vec3::splat(0.5),
        }
    }

    #[test]
    fn sphere_resting_on_box_reports_upward_normal() {
        let sphere = Solid::Sphere {
            center: Vec3::new(0.0, 0.9, 0.0),
            radius: 0.5,
        };
        let hit = contact(&sphere, &unit_box(Vec3::ZERO)).expect("overlap");
        assert_relative_eq!(hit.depth, 0.1, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn separated_boxes_do_not_touch() {
        assert!(contact(&unit_box(Vec3::ZERO), &unit_box(Vec3::new(1.2, 0.0, 0.0))).is_none());
        let hit = contact(&unit_box(Vec3::ZERO), &unit_box(Vec3::new(0.8, 0.0, 0.0)))
            .expect("overlap");
        assert_relative_eq!(hit.depth, 0.2, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn capsule_lying_on_plane() {
        let capsule = Solid::Capsule {
            a: Vec3::new(-1.0, 0.4, 0.0),
            b: Vec3::new(1.0, 0.4, 0.0),
            radius: 0.5,
        };
        let plane = Solid::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        };
        let hit = contact(&capsule, &plane).expect("overlap");
        assert_relative_eq!(hit.depth, 0.1, epsilon = 1e-5);
        assert_relative_eq!(hit.position.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn ray_hits_box_face_at_expected_distance() {
        let hit = ray_cast(&unit_box(Vec3::new(0.0, 0.0, 5.0)), Vec3::ZERO, Vec3::Z, 10.0)
            .expect("hit");
        assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn ray_reports_triangle_index() {
        let mesh = Solid::Mesh {
            vertices: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        };
        let hit = ray_cast(&mesh, Vec3::new(-0.5, 2.0, 0.5), -Vec3::Y, 5.0).expect("hit");
        assert_eq!(hit.triangle, Some(1));
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn ray_hits_capsule_side_and_cylinder_cap() {
        let capsule = Solid::Capsule {
            a: Vec3::new(0.0, 0.0, -1.0),
            b: Vec3::new(0.0, 0.0, 1.0),
            radius: 0.5,
        };
        let hit = ray_cast(&capsule, Vec3::new(-3.0, 0.0, 0.0), Vec3::X, 10.0).expect("hit");
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-4);

        let cylinder = Solid::Cylinder {
            pose: Pose::IDENTITY,
            radius: 0.5,
            half_length: 1.0,
        };
        let hit = ray_cast(&cylinder, Vec3::new(0.0, 0.0, 4.0), -Vec3::Z, 10.0).expect("hit");
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-5);
    }
}
