//! Vector operations

use super::{Mat4, Vec3, Vec4};

/// Component-wise addition
#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Component-wise subtraction (a - b)
#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Multiply every component by a scalar
#[inline]
pub fn scale(v: Vec3, s: f32) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

/// Dot product
#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product (right-handed)
#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean length
#[inline]
pub fn length(v: Vec3) -> f32 {
    dot(v, v).sqrt()
}

/// Distance between two points
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    length(sub(a, b))
}

/// Normalize to unit length; a zero vector is returned unchanged
#[inline]
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len > 0.0 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        v
    }
}

/// Linear interpolation, t = 0 yields a, t = 1 yields b
#[inline]
pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Transform a point by a 4x4 matrix with perspective divide
///
/// The input is treated as a position (w = 1). A resulting w of exactly
/// zero is replaced by 1 so the divide cannot produce infinities.
#[inline]
pub fn transform_mat4(v: Vec3, m: Mat4) -> Vec3 {
    let (x, y, z) = (v[0], v[1], v[2]);
    let mut w = m[3] * x + m[7] * y + m[11] * z + m[15];
    if w == 0.0 {
        w = 1.0;
    }
    [
        (m[0] * x + m[4] * y + m[8] * z + m[12]) / w,
        (m[1] * x + m[5] * y + m[9] * z + m[13]) / w,
        (m[2] * x + m[6] * y + m[10] * z + m[14]) / w,
    ]
}

/// Transform a 4-component vector by a 4x4 matrix (no divide)
#[inline]
pub fn transform_vec4(v: Vec4, m: Mat4) -> Vec4 {
    let (x, y, z, w) = (v[0], v[1], v[2], v[3]);
    [
        m[0] * x + m[4] * y + m[8] * z + m[12] * w,
        m[1] * x + m[5] * y + m[9] * z + m[13] * w,
        m[2] * x + m[6] * y + m[10] * z + m[14] * w,
        m[3] * x + m[7] * y + m[11] * z + m[15] * w,
    ]
}
