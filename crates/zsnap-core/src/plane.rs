//! 工作平面
//!
//! 光标射线投影到的二维参考平面，由原点与正交基 (u, v, axis) 描述。

use crate::math::{is_null, Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

/// 工作平面坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// 约束方向：命名轴或自定义向量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AxisSpec {
    Named(Axis),
    Vector(Vector3),
}

impl From<Axis> for AxisSpec {
    fn from(axis: Axis) -> Self {
        AxisSpec::Named(axis)
    }
}

/// 工作平面
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkingPlane {
    pub position: Point3,
    pub u: Vector3,
    pub v: Vector3,
    pub axis: Vector3,
}

impl Default for WorkingPlane {
    /// 全局 XY 平面
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            u: Vector3::x(),
            v: Vector3::y(),
            axis: Vector3::z(),
        }
    }
}

impl WorkingPlane {
    /// 由原点和两个平面内方向构造，自动正交化
    pub fn new(position: Point3, u: Vector3, v: Vector3) -> Self {
        let u = u.normalize();
        let axis = u.cross(&v).normalize();
        let v = axis.cross(&u);
        Self { position, u, v, axis }
    }

    /// 命名轴对应的方向
    pub fn axis_vector(&self, axis: Axis) -> Vector3 {
        match axis {
            Axis::X => self.u,
            Axis::Y => self.v,
            Axis::Z => self.axis,
        }
    }

    /// 约束方向对应的向量
    pub fn resolve(&self, spec: &AxisSpec) -> Vector3 {
        match spec {
            AxisSpec::Named(axis) => self.axis_vector(*axis),
            AxisSpec::Vector(v) => *v,
        }
    }

    /// 沿 `direction` 把点投影到平面上；未给方向或方向与平面平行时沿法向投影
    pub fn project_point(&self, point: &Point3, direction: Option<&Vector3>) -> Point3 {
        let offset = (point - self.position).dot(&self.axis);
        if let Some(dir) = direction {
            let dn = dir.dot(&self.axis);
            if !is_null(dir) && dn.abs() > EPSILON {
                return point - dir * (offset / dn);
            }
        }
        point - self.axis * offset
    }

    /// 与向量夹角最小的平面轴
    pub fn closest_axis(&self, v: &Vector3) -> Axis {
        let scores = [
            (Axis::X, v.dot(&self.u).abs()),
            (Axis::Y, v.dot(&self.v).abs()),
            (Axis::Z, v.dot(&self.axis).abs()),
        ];
        scores
            .iter()
            .fold((Axis::X, f64::MIN), |best, &(axis, s)| if s > best.1 { (axis, s) } else { best })
            .0
    }

    /// 全局坐标转平面局部坐标
    pub fn global_to_local(&self, point: &Point3) -> Point3 {
        let d = point - self.position;
        Point3::new(d.dot(&self.u), d.dot(&self.v), d.dot(&self.axis))
    }

    /// 平面局部坐标转全局坐标
    pub fn local_to_global(&self, local: &Point3) -> Point3 {
        self.position + self.u * local.x + self.v * local.y + self.axis * local.z
    }

    /// 平面局部方向转全局方向
    pub fn local_vector_to_global(&self, local: &Vector3) -> Vector3 {
        self.u * local.x + self.v * local.y + self.axis * local.z
    }

    /// 保持方向不变，将原点移到 `point`
    pub fn set_to_position(&mut self, point: Point3) {
        self.position = point;
    }
}
