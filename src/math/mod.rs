//! Allocation-free linear algebra over plain `f32` arrays
//!
//! Vectors and matrices are fixed-size arrays, `Copy`, and returned by
//! value, so per-frame transform chains never touch the heap. Matrices are
//! column-major: element `(row, col)` lives at index `col * 4 + row`,
//! matching the WGSL uniform layout the shaders consume.

pub mod mat;
pub mod vec;

/// 3-component vector
pub type Vec3 = [f32; 3];
/// 4-component vector (homogeneous coordinates)
pub type Vec4 = [f32; 4];
/// 3x3 matrix, column-major (normal matrices)
pub type Mat3 = [f32; 9];
/// 4x4 matrix, column-major
pub type Mat4 = [f32; 16];
