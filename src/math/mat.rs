//! Column-major 4x4 matrix operations
//!
//! Construction helpers follow the OpenGL clip-space conventions the
//! projection shaders expect (z in [-1, 1] before the viewport transform).
//! `invert` and `normal_from_mat4` return `None` for singular input so a
//! degenerate frame skips the dependent transform instead of producing NaNs.

use super::{Mat3, Mat4, Vec3};
use crate::math::vec::{cross, dot, normalize, sub};

/// Determinants below this magnitude are treated as singular.
const DET_EPSILON: f32 = 1e-12;

/// The identity matrix
#[inline]
pub fn identity() -> Mat4 {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Multiply two matrices (a x b, column-major)
pub fn multiply(a: Mat4, b: Mat4) -> Mat4 {
    let mut out = [0.0f32; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Translate a matrix by the given vector
pub fn translate(m: Mat4, v: Vec3) -> Mat4 {
    let mut out = m;
    out[12] = m[0] * v[0] + m[4] * v[1] + m[8] * v[2] + m[12];
    out[13] = m[1] * v[0] + m[5] * v[1] + m[9] * v[2] + m[13];
    out[14] = m[2] * v[0] + m[6] * v[1] + m[10] * v[2] + m[14];
    out[15] = m[3] * v[0] + m[7] * v[1] + m[11] * v[2] + m[15];
    out
}

/// Scale a matrix by the given per-axis factors
pub fn scale(m: Mat4, v: Vec3) -> Mat4 {
    let mut out = m;
    for i in 0..4 {
        out[i] = m[i] * v[0];
        out[4 + i] = m[4 + i] * v[1];
        out[8 + i] = m[8 + i] * v[2];
    }
    out
}

/// Rotate a matrix around the X axis by `rad` radians
pub fn rotate_x(m: Mat4, rad: f32) -> Mat4 {
    let s = rad.sin();
    let c = rad.cos();
    let mut out = m;
    for i in 0..4 {
        out[4 + i] = m[4 + i] * c + m[8 + i] * s;
        out[8 + i] = m[8 + i] * c - m[4 + i] * s;
    }
    out
}

/// Rotate a matrix around the Y axis by `rad` radians
pub fn rotate_y(m: Mat4, rad: f32) -> Mat4 {
    let s = rad.sin();
    let c = rad.cos();
    let mut out = m;
    for i in 0..4 {
        out[i] = m[i] * c - m[8 + i] * s;
        out[8 + i] = m[i] * s + m[8 + i] * c;
    }
    out
}

/// Perspective projection (fov in radians, OpenGL clip space)
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov / 2.0).tan();
    let nf = 1.0 / (near - far);

    [
        f / aspect,
        0.0,
        0.0,
        0.0,
        0.0,
        f,
        0.0,
        0.0,
        0.0,
        0.0,
        (far + near) * nf,
        -1.0,
        0.0,
        0.0,
        2.0 * far * near * nf,
        0.0,
    ]
}

/// Orthographic projection over the given box
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let lr = 1.0 / (left - right);
    let bt = 1.0 / (bottom - top);
    let nf = 1.0 / (near - far);

    [
        -2.0 * lr,
        0.0,
        0.0,
        0.0,
        0.0,
        -2.0 * bt,
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 * nf,
        0.0,
        (left + right) * lr,
        (top + bottom) * bt,
        (far + near) * nf,
        1.0,
    ]
}

/// Look-at view matrix
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = normalize(sub(target, eye));
    let s = normalize(cross(f, up));
    let u = cross(s, f);

    [
        s[0],
        u[0],
        -f[0],
        0.0,
        s[1],
        u[1],
        -f[1],
        0.0,
        s[2],
        u[2],
        -f[2],
        0.0,
        -dot(s, eye),
        -dot(u, eye),
        dot(f, eye),
        1.0,
    ]
}

/// Invert a matrix, or `None` when it is singular
pub fn invert(m: Mat4) -> Option<Mat4> {
    let (a00, a01, a02, a03) = (m[0], m[1], m[2], m[3]);
    let (a10, a11, a12, a13) = (m[4], m[5], m[6], m[7]);
    let (a20, a21, a22, a23) = (m[8], m[9], m[10], m[11]);
    let (a30, a31, a32, a33) = (m[12], m[13], m[14], m[15]);

    let b00 = a00 * a11 - a01 * a10;
    let b01 = a00 * a12 - a02 * a10;
    let b02 = a00 * a13 - a03 * a10;
    let b03 = a01 * a12 - a02 * a11;
    let b04 = a01 * a13 - a03 * a11;
    let b05 = a02 * a13 - a03 * a12;
    let b06 = a20 * a31 - a21 * a30;
    let b07 = a20 * a32 - a22 * a30;
    let b08 = a20 * a33 - a23 * a30;
    let b09 = a21 * a32 - a22 * a31;
    let b10 = a21 * a33 - a23 * a31;
    let b11 = a22 * a33 - a23 * a32;

    let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
    if det.abs() < DET_EPSILON {
        return None;
    }
    let det = 1.0 / det;

    Some([
        (a11 * b11 - a12 * b10 + a13 * b09) * det,
        (a02 * b10 - a01 * b11 - a03 * b09) * det,
        (a31 * b05 - a32 * b04 + a33 * b03) * det,
        (a22 * b04 - a21 * b05 - a23 * b03) * det,
        (a12 * b08 - a10 * b11 - a13 * b07) * det,
        (a00 * b11 - a02 * b08 + a03 * b07) * det,
        (a32 * b02 - a30 * b05 - a33 * b01) * det,
        (a20 * b05 - a22 * b02 + a23 * b01) * det,
        (a10 * b10 - a11 * b08 + a13 * b06) * det,
        (a01 * b08 - a00 * b10 - a03 * b06) * det,
        (a30 * b04 - a31 * b02 + a33 * b00) * det,
        (a21 * b02 - a20 * b04 - a23 * b00) * det,
        (a11 * b07 - a10 * b09 - a12 * b06) * det,
        (a00 * b09 - a01 * b07 + a02 * b06) * det,
        (a31 * b01 - a30 * b03 - a32 * b00) * det,
        (a20 * b03 - a21 * b01 + a22 * b00) * det,
    ])
}

/// Normal matrix: inverse-transpose of the upper-left 3x3
pub fn normal_from_mat4(m: Mat4) -> Option<Mat3> {
    let (a00, a01, a02) = (m[0], m[1], m[2]);
    let (a10, a11, a12) = (m[4], m[5], m[6]);
    let (a20, a21, a22) = (m[8], m[9], m[10]);

    let b01 = a22 * a11 - a12 * a21;
    let b11 = -a22 * a10 + a12 * a20;
    let b21 = a21 * a10 - a11 * a20;

    let det = a00 * b01 + a01 * b11 + a02 * b21;
    if det.abs() < DET_EPSILON {
        return None;
    }
    let det = 1.0 / det;

    Some([
        b01 * det,
        b11 * det,
        b21 * det,
        (-a22 * a01 + a02 * a21) * det,
        (a22 * a00 - a02 * a20) * det,
        (-a21 * a00 + a01 * a20) * det,
        (a12 * a01 - a02 * a11) * det,
        (-a12 * a00 + a02 * a10) * det,
        (a11 * a00 - a01 * a10) * det,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_eq(a: Mat4, b: Mat4, tol: f32) {
        for i in 0..16 {
            assert!(
                (a[i] - b[i]).abs() < tol,
                "element {} differs: {} vs {}",
                i,
                a[i],
                b[i]
            );
        }
    }

    #[test]
    fn multiply_by_identity_is_noop() {
        let m = translate(rotate_y(identity(), 0.7), [3.0, -1.0, 2.0]);
        assert_mat_eq(multiply(m, identity()), m, 1e-6);
        assert_mat_eq(multiply(identity(), m), m, 1e-6);
    }

    #[test]
    fn invert_times_original_is_identity() {
        let m = translate(
            rotate_x(rotate_y(scale(identity(), [2.0, 3.0, 0.5]), 0.8), -0.3),
            [10.0, -4.0, 7.0],
        );
        let inv = invert(m).unwrap();
        assert_mat_eq(multiply(inv, m), identity(), 1e-5);
    }

    #[test]
    fn invert_of_view_projection_round_trips() {
        let proj = perspective(std::f32::consts::FRAC_PI_4, 4.0 / 3.0, 0.1, 100.0);
        let view = look_at([5.0, 5.0, 5.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let pv = multiply(proj, view);
        let inv = invert(pv).unwrap();
        assert_mat_eq(multiply(inv, pv), identity(), 1e-4);
    }

    #[test]
    fn invert_singular_returns_none() {
        assert!(invert([0.0; 16]).is_none());

        // Rank-deficient: Z column zeroed.
        let mut flat = identity();
        flat[10] = 0.0;
        assert!(invert(flat).is_none());
    }

    #[test]
    fn rotate_y_quarter_turn_moves_x_to_z() {
        let m = rotate_y(identity(), std::f32::consts::FRAC_PI_2);
        let p = crate::math::vec::transform_mat4([1.0, 0.0, 0.0], m);
        assert!(p[0].abs() < 1e-6);
        assert!((p[2] - -1.0).abs() < 1e-6);
    }

    #[test]
    fn look_at_puts_target_on_negative_z() {
        let view = look_at([0.0, 0.0, 10.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let p = crate::math::vec::transform_mat4([0.0, 0.0, 0.0], view);
        assert!(p[0].abs() < 1e-6);
        assert!(p[1].abs() < 1e-6);
        assert!((p[2] - -10.0).abs() < 1e-5);
    }

    #[test]
    fn perspective_maps_near_plane_to_front() {
        let proj = perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        // A point on the near plane straight ahead lands at z = -1 in NDC.
        let p = crate::math::vec::transform_mat4([0.0, 0.0, -1.0], proj);
        assert!((p[2] - -1.0).abs() < 1e-5);
    }

    #[test]
    fn ortho_centers_the_box() {
        let proj = ortho(-10.0, 10.0, -5.0, 5.0, 0.1, 100.0);
        let p = crate::math::vec::transform_mat4([10.0, 5.0, -0.1], proj);
        assert!((p[0] - 1.0).abs() < 1e-5);
        assert!((p[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn normal_matrix_of_rotation_matches_rotation() {
        let m = rotate_y(identity(), 0.6);
        let n = normal_from_mat4(m).unwrap();
        // For a pure rotation the normal matrix equals the upper-left 3x3.
        let expected = [m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]];
        for i in 0..9 {
            assert!((n[i] - expected[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let m = scale(identity(), [2.0, 1.0, 1.0]);
        let n = normal_from_mat4(m).unwrap();
        // Normal along X must shrink by the inverse scale.
        assert!((n[0] - 0.5).abs() < 1e-6);
        assert!((n[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_singular_returns_none() {
        let m = scale(identity(), [0.0, 1.0, 1.0]);
        assert!(normal_from_mat4(m).is_none());
    }
}
