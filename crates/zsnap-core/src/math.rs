//! 数学基础类型
//!
//! 基于 nalgebra 的三维点/向量别名，以及捕捉计算中常用的向量工具函数。

use nalgebra::{Rotation3, Unit};
use serde::{Deserialize, Serialize};

pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Isometry3 = nalgebra::Isometry3<f64>;

/// 通用几何容差
pub const EPSILON: f64 = 1e-9;

/// 点重合判断使用的容差（与建模精度一致）
pub const PRECISION: f64 = 1e-7;

/// 向量是否为零向量
pub fn is_null(v: &Vector3) -> bool {
    v.norm() < EPSILON
}

/// 两点是否重合
pub fn points_equal(a: &Point3, b: &Point3) -> bool {
    (a - b).norm() < PRECISION
}

/// 将向量 `v` 投影到 `onto` 方向上
pub fn project(v: &Vector3, onto: &Vector3) -> Vector3 {
    let len2 = onto.norm_squared();
    if len2 < EPSILON {
        return Vector3::zeros();
    }
    onto * (v.dot(onto) / len2)
}

/// 绕 `axis` 旋转 `angle` 弧度
pub fn rotate(v: &Vector3, angle: f64, axis: &Vector3) -> Vector3 {
    if is_null(axis) {
        return *v;
    }
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle) * v
}

/// 两向量夹角（弧度，0..=π）
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    let la = a.norm();
    let lb = b.norm();
    if la < EPSILON || lb < EPSILON {
        return 0.0;
    }
    (a.dot(b) / (la * lb)).clamp(-1.0, 1.0).acos()
}

/// 构造以 `z` 为第三轴的正交标架 (x, y)
///
/// x 轴优先取全局 X 在垂直于 z 的平面上的分量；若 z 与全局 X 平行则改用全局 Y。
pub fn frame_from_axis(z: &Vector3) -> (Vector3, Vector3) {
    let z = z.normalize();
    let mut x = Vector3::x() - z * z.dot(&Vector3::x());
    if x.norm() < EPSILON {
        let y = Vector3::y() - z * z.dot(&Vector3::y());
        let y = y.normalize();
        return (y.cross(&z).normalize(), y);
    }
    x = x.normalize();
    (x, z.cross(&x))
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point3>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn expand_to_include(&mut self, p: &Point3) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn merge(&mut self, other: &BoundingBox3) {
        if other.is_empty() {
            return;
        }
        self.expand_to_include(&other.min);
        self.expand_to_include(&other.max);
    }

    /// 向各方向扩展 `margin`
    pub fn inflated(&self, margin: f64) -> Self {
        let m = Vector3::new(margin, margin, margin);
        Self::new(self.min - m, self.max + m)
    }

    /// 俯视平面 (XY) 上是否包含点
    pub fn contains_xy(&self, p: &Point3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// 俯视平面 (XY) 上是否相交
    pub fn intersects_xy(&self, other: &BoundingBox3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        let p = project(&v, &Vector3::new(2.0, 0.0, 0.0));
        assert!((p - Vector3::new(3.0, 0.0, 0.0)).norm() < EPSILON);
        assert!(is_null(&project(&v, &Vector3::zeros())));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(&Vector3::x(), std::f64::consts::FRAC_PI_2, &Vector3::z());
        assert!((v - Vector3::y()).norm() < EPSILON);
    }

    #[test]
    fn test_frame_from_z_axis() {
        let (x, y) = frame_from_axis(&Vector3::z());
        assert!((x - Vector3::x()).norm() < EPSILON);
        assert!((y - Vector3::y()).norm() < EPSILON);

        // z 与全局 X 平行时退化处理
        let (x, y) = frame_from_axis(&Vector3::x());
        assert!(x.dot(&Vector3::x()).abs() < EPSILON);
        assert!((y - Vector3::y()).norm() < EPSILON);
    }
}
