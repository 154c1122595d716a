//! 几何图元定义
//!
//! 捕捉引擎只读访问的三维几何：
//! - 曲线 (Curve)：直线段、圆/圆弧、椭圆、离散曲线
//! - 边 (Edge)：对曲线的包装，提供端点/中点/最近点/垂足查询
//! - 曲面 (Surface) 与面 (Face)
//! - 形体 (Shape)：顶点、边、面的集合

use crate::error::GeometryError;
use crate::math::{frame_from_axis, is_null, BoundingBox3, Point3, Vector3, EPSILON, PRECISION};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// 直线段
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point3,
    pub end: Point3,
}

impl Line {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// 起点到终点的向量
    pub fn vector(&self) -> Vector3 {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    /// 单位方向向量（退化线段返回零向量）
    pub fn direction(&self) -> Vector3 {
        let v = self.vector();
        if is_null(&v) {
            Vector3::zeros()
        } else {
            v.normalize()
        }
    }

    pub fn midpoint(&self) -> Point3 {
        self.start + self.vector() * 0.5
    }

    /// 线段上距离 `point` 最近的点
    pub fn nearest_point(&self, point: &Point3) -> Point3 {
        let v = self.vector();
        let c2 = v.dot(&v);
        if c2 < EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(&v) / c2).clamp(0.0, 1.0);
        self.start + v * t
    }

    /// 无限延长线上的垂足
    pub fn perpendicular_foot(&self, point: &Point3) -> Result<Point3, GeometryError> {
        let v = self.vector();
        let c2 = v.dot(&v);
        if c2 < EPSILON {
            return Err(GeometryError::Degenerate("zero-length line"));
        }
        let t = (point - self.start).dot(&v) / c2;
        Ok(self.start + v * t)
    }

    /// 点是否在线段上（含端点）
    pub fn contains_point(&self, point: &Point3) -> bool {
        (self.nearest_point(point) - point).norm() < PRECISION
    }

    pub fn distance_to_point(&self, point: &Point3) -> f64 {
        (self.nearest_point(point) - point).norm()
    }
}

/// 圆或圆弧
///
/// 参数角从 `x_dir` 开始，绕 `axis` 逆时针度量。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point3,
    /// 法向（单位向量）
    pub axis: Vector3,
    pub radius: f64,
    /// 参数 0 对应的方向（单位向量，垂直于 axis）
    pub x_dir: Vector3,
    /// 圆弧范围 (起始角, 终止角)，None 表示整圆
    pub arc: Option<(f64, f64)>,
}

impl Circle {
    /// 整圆
    pub fn new(center: Point3, axis: Vector3, radius: f64) -> Self {
        let axis = axis.normalize();
        let (x_dir, _) = frame_from_axis(&axis);
        Self {
            center,
            axis,
            radius,
            x_dir,
            arc: None,
        }
    }

    /// 圆弧（角度为弧度）
    pub fn arc(center: Point3, axis: Vector3, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            arc: Some((start_angle, end_angle)),
            ..Self::new(center, axis, radius)
        }
    }

    /// XY 平面上的整圆
    pub fn xy(center: Point3, radius: f64) -> Self {
        Self::new(center, Vector3::z(), radius)
    }

    fn y_dir(&self) -> Vector3 {
        self.axis.cross(&self.x_dir)
    }

    /// 参数角对应的点
    pub fn point_at(&self, angle: f64) -> Point3 {
        self.center + (self.x_dir * angle.cos() + self.y_dir() * angle.sin()) * self.radius
    }

    /// 扫过的角度
    pub fn sweep_angle(&self) -> f64 {
        match self.arc {
            None => TAU,
            Some((start, end)) => {
                let sweep = (end - start).rem_euclid(TAU);
                if sweep < EPSILON {
                    TAU
                } else {
                    sweep
                }
            }
        }
    }

    /// 点在圆所在平面内的参数角
    pub fn angle_of(&self, point: &Point3) -> f64 {
        let d = point - self.center;
        d.dot(&self.y_dir()).atan2(d.dot(&self.x_dir))
    }

    /// 参数角是否落在圆弧范围内
    pub fn contains_angle(&self, angle: f64) -> bool {
        match self.arc {
            None => true,
            Some((start, _)) => (angle - start).rem_euclid(TAU) <= self.sweep_angle() + EPSILON,
        }
    }

    pub fn vertices(&self) -> Vec<Point3> {
        match self.arc {
            None => vec![self.point_at(0.0)],
            Some((start, end)) => vec![self.point_at(start), self.point_at(end)],
        }
    }

    /// 弧长中点；整圆取与起点相对的点
    pub fn midpoint(&self) -> Point3 {
        match self.arc {
            None => self.point_at(PI),
            Some((start, _)) => self.point_at(start + self.sweep_angle() / 2.0),
        }
    }

    /// 圆心到点在平面内的单位径向
    fn radial(&self, point: &Point3) -> Result<Vector3, GeometryError> {
        let d = point - self.center;
        let in_plane = d - self.axis * d.dot(&self.axis);
        if is_null(&in_plane) {
            return Err(GeometryError::Degenerate("point on circle axis"));
        }
        Ok(in_plane.normalize())
    }

    pub fn nearest_point(&self, point: &Point3) -> Result<Point3, GeometryError> {
        let candidate = self.center + self.radial(point)? * self.radius;
        if self.contains_angle(self.angle_of(&candidate)) {
            return Ok(candidate);
        }
        let ends = self.vertices();
        Ok(ends
            .into_iter()
            .min_by(|a, b| {
                (a - point)
                    .norm()
                    .partial_cmp(&(b - point).norm())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(candidate))
    }

    /// 外部点在完整圆上的两个极值投影点（近点、远点）
    pub fn perpendicular_feet(&self, point: &Point3) -> Result<Vec<Point3>, GeometryError> {
        let r = self.radial(point)?;
        Ok(vec![
            self.center + r * self.radius,
            self.center - r * self.radius,
        ])
    }

    /// 角度捕捉使用的固定标架：z 为法向，0° 落在局部 Y 轴上
    pub fn angle_frame(&self) -> (Vector3, Vector3) {
        frame_from_axis(&self.axis)
    }

    /// 按角度捕捉约定取点：(sin θ · r, cos θ · r)
    pub fn point_at_snap_angle(&self, degrees: f64) -> Point3 {
        let (x, y) = self.angle_frame();
        let a = degrees.to_radians();
        self.center + (x * a.sin() + y * a.cos()) * self.radius
    }
}

/// 椭圆（整椭圆）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point3,
    pub axis: Vector3,
    /// 长轴方向（单位向量）
    pub major_dir: Vector3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Ellipse {
    pub fn new(center: Point3, axis: Vector3, major_dir: Vector3, major_radius: f64, minor_radius: f64) -> Self {
        Self {
            center,
            axis: axis.normalize(),
            major_dir: major_dir.normalize(),
            major_radius,
            minor_radius,
        }
    }

    pub fn point_at(&self, t: f64) -> Point3 {
        let minor_dir = self.axis.cross(&self.major_dir);
        self.center + self.major_dir * (self.major_radius * t.cos()) + minor_dir * (self.minor_radius * t.sin())
    }

    /// 采样后在最优区间内做三分搜索
    pub fn nearest_point(&self, point: &Point3) -> Point3 {
        const SAMPLES: usize = 72;
        let step = TAU / SAMPLES as f64;
        let dist = |t: f64| (self.point_at(t) - point).norm();

        let mut best = 0.0;
        let mut best_dist = f64::MAX;
        for i in 0..SAMPLES {
            let t = i as f64 * step;
            let d = dist(t);
            if d < best_dist {
                best_dist = d;
                best = t;
            }
        }

        let (mut lo, mut hi) = (best - step, best + step);
        for _ in 0..60 {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            if dist(m1) < dist(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        self.point_at((lo + hi) / 2.0)
    }
}

/// 曲线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Line(Line),
    Circle(Circle),
    Ellipse(Ellipse),
    /// 离散化的自由曲线（样条等），不支持解析投影
    Sampled(Vec<Point3>),
}

/// 边
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub curve: Curve,
}

impl Edge {
    pub fn new(curve: Curve) -> Self {
        Self { curve }
    }

    pub fn line(start: Point3, end: Point3) -> Self {
        Self::new(Curve::Line(Line::new(start, end)))
    }

    pub fn circle(circle: Circle) -> Self {
        Self::new(Curve::Circle(circle))
    }

    /// 几何类型名称
    pub fn geom_type(&self) -> &'static str {
        match self.curve {
            Curve::Line(_) => "Line",
            Curve::Circle(_) => "Circle",
            Curve::Ellipse(_) => "Ellipse",
            Curve::Sampled(_) => "Sampled",
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match &self.curve {
            Curve::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_circle(&self) -> Option<&Circle> {
        match &self.curve {
            Curve::Circle(c) => Some(c),
            _ => None,
        }
    }

    pub fn vertices(&self) -> Vec<Point3> {
        match &self.curve {
            Curve::Line(l) => vec![l.start, l.end],
            Curve::Circle(c) => c.vertices(),
            Curve::Ellipse(e) => vec![e.point_at(0.0)],
            Curve::Sampled(pts) => match (pts.first(), pts.last()) {
                (Some(a), Some(b)) if pts.len() > 1 => vec![*a, *b],
                (Some(a), _) => vec![*a],
                _ => vec![],
            },
        }
    }

    /// 解析中点，仅直线与圆/圆弧可用
    pub fn midpoint(&self) -> Option<Point3> {
        match &self.curve {
            Curve::Line(l) => Some(l.midpoint()),
            Curve::Circle(c) => Some(c.midpoint()),
            Curve::Ellipse(_) | Curve::Sampled(_) => None,
        }
    }

    pub fn nearest_point(&self, point: &Point3) -> Result<Point3, GeometryError> {
        match &self.curve {
            Curve::Line(l) => Ok(l.nearest_point(point)),
            Curve::Circle(c) => c.nearest_point(point),
            Curve::Ellipse(e) => Ok(e.nearest_point(point)),
            Curve::Sampled(_) => Err(GeometryError::ProjectionUnsupported("sampled curve")),
        }
    }

    /// 外部点到曲线的垂足（可能有多个）
    pub fn perpendicular_feet(&self, point: &Point3) -> Result<Vec<Point3>, GeometryError> {
        match &self.curve {
            Curve::Line(l) => Ok(vec![l.perpendicular_foot(point)?]),
            Curve::Circle(c) => c.perpendicular_feet(point),
            Curve::Ellipse(_) => Err(GeometryError::ProjectionUnsupported("ellipse")),
            Curve::Sampled(_) => Err(GeometryError::ProjectionUnsupported("sampled curve")),
        }
    }

    /// 点到边的距离（不支持投影的曲线退化为折线距离）
    pub fn distance_to_point(&self, point: &Point3) -> f64 {
        match &self.curve {
            Curve::Sampled(pts) => pts
                .windows(2)
                .map(|w| Line::new(w[0], w[1]).distance_to_point(point))
                .fold(f64::MAX, f64::min),
            _ => self
                .nearest_point(point)
                .map(|p| (p - point).norm())
                .unwrap_or(f64::MAX),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox3 {
        match &self.curve {
            Curve::Line(l) => BoundingBox3::from_points([l.start, l.end]),
            Curve::Circle(c) => circle_box(c.center, c.radius),
            Curve::Ellipse(e) => circle_box(e.center, e.major_radius),
            Curve::Sampled(pts) => BoundingBox3::from_points(pts.iter().copied()),
        }
    }
}

/// 以半径构造保守包围盒
fn circle_box(center: Point3, radius: f64) -> BoundingBox3 {
    let r = Vector3::new(radius, radius, radius);
    BoundingBox3::new(center - r, center + r)
}

/// 曲面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane { origin: Point3, normal: Vector3 },
    Sphere { center: Point3, radius: f64 },
    Cylinder { origin: Point3, axis: Vector3, radius: f64 },
    /// 不支持解析投影的曲面
    Other,
}

/// 面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub surface: Surface,
    /// 外边界（闭合多边形顶点）
    pub boundary: Vec<Point3>,
    pub center_of_mass: Point3,
}

impl Face {
    /// 由平面多边形构造面，法向与质心按多边形面积计算
    pub fn planar(boundary: Vec<Point3>) -> Result<Self, GeometryError> {
        if boundary.len() < 3 {
            return Err(GeometryError::Degenerate("face needs at least 3 points"));
        }

        // Newell 法向
        let mut normal = Vector3::zeros();
        for (i, a) in boundary.iter().enumerate() {
            let b = boundary[(i + 1) % boundary.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        if is_null(&normal) {
            return Err(GeometryError::Degenerate("zero-area face"));
        }
        let normal = normal.normalize();

        // 三角扇面积加权质心
        let origin = boundary[0];
        let mut area_sum = 0.0;
        let mut weighted = Vector3::zeros();
        for w in boundary[1..].windows(2) {
            let area = (w[0] - origin).cross(&(w[1] - origin)).dot(&normal) / 2.0;
            let centroid = (origin.coords + w[0].coords + w[1].coords) / 3.0;
            weighted += centroid * area;
            area_sum += area;
        }
        let center_of_mass = if area_sum.abs() < EPSILON {
            Point3::from(boundary.iter().map(|p| p.coords).sum::<Vector3>() / boundary.len() as f64)
        } else {
            Point3::from(weighted / area_sum)
        };

        Ok(Self {
            surface: Surface::Plane { origin, normal },
            boundary,
            center_of_mass,
        })
    }

    pub fn surface_name(&self) -> &'static str {
        match self.surface {
            Surface::Plane { .. } => "Plane",
            Surface::Sphere { .. } => "Sphere",
            Surface::Cylinder { .. } => "Cylinder",
            Surface::Other => "Other",
        }
    }

    pub fn nearest_point(&self, point: &Point3) -> Result<Point3, GeometryError> {
        match &self.surface {
            Surface::Plane { origin, normal } => Ok(point - normal * (point - origin).dot(normal)),
            Surface::Sphere { center, radius } => {
                let d = point - center;
                if is_null(&d) {
                    return Err(GeometryError::Degenerate("point at sphere center"));
                }
                Ok(center + d.normalize() * *radius)
            }
            Surface::Cylinder { origin, axis, radius } => {
                let axis = axis.normalize();
                let foot = origin + axis * (point - origin).dot(&axis);
                let d = point - foot;
                if is_null(&d) {
                    return Err(GeometryError::Degenerate("point on cylinder axis"));
                }
                Ok(foot + d.normalize() * *radius)
            }
            Surface::Other => Err(GeometryError::ProjectionUnsupported("surface")),
        }
    }

    /// 外部点到曲面的垂足
    pub fn perpendicular_feet(&self, point: &Point3) -> Result<Vec<Point3>, GeometryError> {
        Ok(vec![self.nearest_point(point)?])
    }

    /// 边界多边形的边
    pub fn boundary_edges(&self) -> Vec<Edge> {
        let n = self.boundary.len();
        (0..n)
            .map(|i| Edge::line(self.boundary[i], self.boundary[(i + 1) % n]))
            .collect()
    }

    /// 俯视平面 (XY) 上点是否在边界多边形内（射线法）
    pub fn contains_xy(&self, point: &Point3) -> bool {
        let n = self.boundary.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (a, b) = (self.boundary[i], self.boundary[j]);
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// 形体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default)]
    pub vertices: Vec<Point3>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub faces: Vec<Face>,
    /// 是否包含实体
    #[serde(default)]
    pub has_solids: bool,
}

impl Shape {
    /// 由边构造，顶点取各边端点去重
    pub fn from_edges(edges: Vec<Edge>) -> Self {
        let mut vertices: Vec<Point3> = Vec::new();
        for edge in &edges {
            for v in edge.vertices() {
                if !vertices.iter().any(|p| (p - v).norm() < PRECISION) {
                    vertices.push(v);
                }
            }
        }
        Self {
            vertices,
            edges,
            faces: Vec::new(),
            has_solids: false,
        }
    }

    /// 由点列构造折线形体
    pub fn polyline(points: &[Point3], closed: bool) -> Self {
        let mut edges: Vec<Edge> = points.windows(2).map(|w| Edge::line(w[0], w[1])).collect();
        if closed && points.len() > 2 {
            edges.push(Edge::line(points[points.len() - 1], points[0]));
        }
        Self::from_edges(edges)
    }

    /// 由面构造，边取各面边界
    pub fn from_faces(faces: Vec<Face>) -> Self {
        let edges = faces.iter().flat_map(|f| f.boundary_edges()).collect();
        Self {
            faces,
            ..Self::from_edges(edges)
        }
    }

    pub fn is_null(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.faces.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox3 {
        let mut bbox = BoundingBox3::from_points(self.vertices.iter().copied());
        for edge in &self.edges {
            bbox.merge(&edge.bounding_box());
        }
        for face in &self.faces {
            bbox.merge(&BoundingBox3::from_points(face.boundary.iter().copied()));
        }
        bbox
    }
}
