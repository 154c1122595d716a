//! 内存场景
//!
//! `Document` 的参考实现，附带俯视拾取。宿主程序与测试用它驱动捕捉器。

use crate::geometry::{Curve, Edge, Face, Line, Shape, Surface};
use crate::host::{Component, Document, PickInfo};
use crate::math::{BoundingBox3, Point3, EPSILON};
use crate::object::{GeometryKind, ObjectId, SnapObject};
use crate::spatial::SpatialIndex;
use std::collections::BTreeMap;
use tracing::trace;

/// 对象集合 + 空间索引
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SnapObject>,
    index: SpatialIndex,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: impl IntoIterator<Item = SnapObject>) -> Self {
        let mut scene = Self::new();
        for obj in objects {
            scene.add(obj);
        }
        scene
    }

    /// 添加对象，同名对象被替换
    pub fn add(&mut self, obj: SnapObject) {
        self.index.insert(obj.id.clone(), obj.bounding_box());
        self.objects.insert(obj.id.clone(), obj);
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<SnapObject> {
        self.index.remove(id);
        self.objects.remove(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SnapObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 全部对象的包围盒
    pub fn bounds(&self) -> Option<BoundingBox3> {
        let mut bbox = BoundingBox3::empty();
        for obj in self.objects.values() {
            bbox.merge(&obj.bounding_box());
        }
        (!bbox.is_empty()).then_some(bbox)
    }

    /// 俯视拾取：XY 距离 `tolerance` 以内的对象，按高度由高到低排列
    ///
    /// 每个对象只报告一个部件，顶点优先于边，边优先于面。
    pub fn pick(&self, point: &Point3, tolerance: f64) -> Vec<PickInfo> {
        let mut hits: Vec<(f64, PickInfo)> = self
            .index
            .query_around(point, tolerance)
            .into_iter()
            .filter_map(|id| self.objects.get(&id))
            .filter_map(|obj| {
                let (component, at, dist) = pick_object(obj, point, tolerance)?;
                Some((
                    dist,
                    PickInfo {
                        object: obj.id.clone(),
                        component,
                        point: at,
                    },
                ))
            })
            .collect();

        hits.sort_by(|(da, a), (db, b)| {
            b.point
                .z
                .total_cmp(&a.point.z)
                .then_with(|| da.total_cmp(db))
        });
        trace!("Picked {} objects at {:?}", hits.len(), point);
        hits.into_iter().map(|(_, info)| info).collect()
    }
}

impl Document for Scene {
    fn object(&self, id: &ObjectId) -> Option<&SnapObject> {
        self.objects.get(id)
    }
}

fn xy_distance(a: &Point3, b: &Point3) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// 返回 (部件, 拾取点, XY 距离)
fn pick_object(obj: &SnapObject, point: &Point3, tolerance: f64) -> Option<(Component, Point3, f64)> {
    if let Some(shape) = obj.kind.shape() {
        return pick_shape(shape, point, tolerance);
    }
    match &obj.kind {
        GeometryKind::Axis { edges } => pick_edges(edges, point, tolerance),
        GeometryKind::Dimension { p2, p3 } => {
            let at = Line::new(*p2, *p3).nearest_point(point);
            let d = xy_distance(&at, point);
            (d <= tolerance).then_some((Component::Whole, at, d))
        }
        GeometryKind::Mesh { points } => points
            .iter()
            .map(|p| (*p, xy_distance(p, point)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, d)| (Component::Whole, p, d)),
        _ => {
            let base = obj.placement_base();
            let d = xy_distance(&base, point);
            (d <= tolerance).then_some((Component::Whole, base, d))
        }
    }
}

fn pick_shape(shape: &Shape, point: &Point3, tolerance: f64) -> Option<(Component, Point3, f64)> {
    let vertex = shape
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i, *v, xy_distance(v, point)))
        .filter(|(_, _, d)| *d <= tolerance)
        .min_by(|a, b| a.2.total_cmp(&b.2));
    if let Some((i, v, d)) = vertex {
        return Some((Component::Vertex(i), v, d));
    }

    if let Some(hit) = pick_edges(&shape.edges, point, tolerance) {
        return Some(hit);
    }

    shape
        .faces
        .iter()
        .enumerate()
        .filter(|(_, f)| f.contains_xy(point))
        .filter_map(|(i, f)| face_point_below(f, point).map(|p| (Component::Face(i), p, 0.0)))
        .max_by(|a, b| a.1.z.total_cmp(&b.1.z))
}

fn pick_edges(edges: &[Edge], point: &Point3, tolerance: f64) -> Option<(Component, Point3, f64)> {
    edges
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            let at = nearest_on_edge(e, point)?;
            Some((Component::Edge(i), at, xy_distance(&at, point)))
        })
        .filter(|(_, _, d)| *d <= tolerance)
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

fn nearest_on_edge(edge: &Edge, point: &Point3) -> Option<Point3> {
    match &edge.curve {
        Curve::Sampled(pts) => pts
            .windows(2)
            .map(|w| Line::new(w[0], w[1]).nearest_point(point))
            .min_by(|a, b| (a - point).norm().total_cmp(&(b - point).norm())),
        _ => edge.nearest_point(point).ok(),
    }
}

/// 竖直穿过 `point` 的直线与面的交点
fn face_point_below(face: &Face, point: &Point3) -> Option<Point3> {
    match &face.surface {
        Surface::Plane { origin, normal } if normal.z.abs() > EPSILON => {
            let z = origin.z - ((point.x - origin.x) * normal.x + (point.y - origin.y) * normal.y) / normal.z;
            Some(Point3::new(point.x, point.y, z))
        }
        _ => face.nearest_point(point).ok(),
    }
}
