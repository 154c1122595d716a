//! 捕捉候选点生成器
//!
//! 每个生成器先检查对应捕捉类型是否生效，再把候选点压入缓冲区。
//! 几何查询失败时只记录 debug 日志，不会中断整个查询。

use crate::geometry::{Circle, Curve, Edge, Face, Line, Shape};
use crate::host::{Component, PickInfo};
use crate::intersect::{find_intersection, line_intersection};
use crate::math::Point3;
use crate::object::{GeometryKind, SnapObject};
use crate::plane::WorkingPlane;
use crate::snap::{SnapCandidate, SnapKind, SnapMask};
use tracing::debug;

/// 角度捕捉使用的角度（度）
pub const SNAP_ANGLES: [f64; 16] = [
    0.0, 30.0, 45.0, 60.0, 90.0, 120.0, 135.0, 150.0, 180.0, 210.0, 225.0, 240.0, 270.0, 300.0,
    315.0, 330.0,
];

/// 圆心捕捉在圆周上的触发位置（度），避开角度捕捉点
pub const CENTER_ANGLES: [f64; 16] = [
    15.0, 37.5, 52.5, 75.0, 105.0, 127.5, 142.5, 165.0, 195.0, 217.5, 232.5, 255.0, 285.0, 307.5,
    322.5, 345.0,
];

/// 候选点收集器
///
/// 生命周期只覆盖一次查询，候选点不在查询之间缓存。
pub struct CandidateCollector<'a> {
    mask: SnapMask,
    plane: &'a WorkingPlane,
    /// 超过该边数的形体跳过边/面捕捉，0 表示不限制
    max_edges: usize,
    candidates: Vec<SnapCandidate>,
}

impl<'a> CandidateCollector<'a> {
    pub fn new(mask: SnapMask, plane: &'a WorkingPlane, max_edges: usize) -> Self {
        Self {
            mask,
            plane,
            max_edges,
            candidates: Vec::with_capacity(64),
        }
    }

    pub fn candidates(&self) -> &[SnapCandidate] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<SnapCandidate> {
        self.candidates
    }

    fn enabled(&self, kind: SnapKind) -> bool {
        self.mask.is_enabled(kind)
    }

    /// 开启工作平面投影时把点投到平面上
    pub fn to_wp(&self, point: &Point3) -> Point3 {
        if self.enabled(SnapKind::WorkingPlane) {
            self.plane.project_point(point, None)
        } else {
            *point
        }
    }

    fn push(&mut self, raw: Point3, kind: SnapKind) {
        let projected = self.to_wp(&raw);
        self.candidates.push(SnapCandidate::new(raw, kind, projected));
    }

    fn within_edge_limit(&self, edge_count: usize) -> bool {
        self.max_edges == 0 || edge_count <= self.max_edges
    }

    // ========== 边 ==========

    /// 最近点（被动）
    pub fn collect_near(&mut self, edge: &Edge, point: &Point3) {
        if !self.enabled(SnapKind::Near) {
            return;
        }
        match edge.nearest_point(point) {
            Ok(np) => self.push(np, SnapKind::Near),
            Err(e) => debug!("Near snap skipped: {}", e),
        }
    }

    /// 不投影到几何上的最近点
    pub fn collect_near_unprojected(&mut self, point: &Point3) {
        if self.enabled(SnapKind::Near) {
            self.push(*point, SnapKind::Near);
        }
    }

    pub fn collect_endpoints(&mut self, points: impl IntoIterator<Item = Point3>) {
        if !self.enabled(SnapKind::Endpoint) {
            return;
        }
        for p in points {
            self.push(p, SnapKind::Endpoint);
        }
    }

    pub fn collect_midpoint(&mut self, edge: &Edge) {
        if !self.enabled(SnapKind::Midpoint) {
            return;
        }
        if let Some(mp) = edge.midpoint() {
            self.push(mp, SnapKind::Midpoint);
        }
    }

    /// 从上一点向边作垂线的垂足
    pub fn collect_perpendicular(&mut self, edge: &Edge, last: Option<&Point3>) {
        let Some(last) = last else { return };
        if !self.enabled(SnapKind::Perpendicular) {
            return;
        }
        match edge.perpendicular_feet(last) {
            Ok(feet) => {
                for p in feet {
                    self.push(p, SnapKind::Perpendicular);
                }
            }
            Err(e) => debug!("Perpendicular snap skipped: {}", e),
        }
    }

    /// 与近期对象各边的交点
    pub fn collect_intersection(&mut self, edge: &Edge, recent: &[&SnapObject]) {
        if !self.enabled(SnapKind::Intersection) {
            return;
        }
        let apparent = self.enabled(SnapKind::WorkingPlane);
        for obj in recent {
            let edges = obj.edges();
            if !self.within_edge_limit(edges.len()) {
                continue;
            }
            for other in edges {
                let points = match (other.as_line(), edge.as_line()) {
                    // 两条直线投影到工作平面后的视交点
                    (Some(a), Some(b)) if apparent => line_intersection(
                        &self.to_wp(&a.start),
                        &self.to_wp(&a.end),
                        &self.to_wp(&b.start),
                        &self.to_wp(&b.end),
                        true,
                        true,
                    )
                    .into_iter()
                    .collect(),
                    _ => find_intersection(other, edge, false, false),
                };
                for p in points {
                    self.push(p, SnapKind::Intersection);
                }
            }
        }
    }

    /// 边与延长线（均视为无限长）的交点
    pub fn collect_elines(&mut self, edge: &Edge, eline: Option<&Line>) {
        let Some(eline) = eline else { return };
        if !(self.enabled(SnapKind::Intersection) && self.enabled(SnapKind::Extension)) {
            return;
        }
        let eline = Edge::new(Curve::Line(*eline));
        for p in find_intersection(edge, &eline, true, true) {
            self.push(p, SnapKind::Intersection);
        }
    }

    /// 圆周上的固定角度点，0° 位于局部 Y 轴
    pub fn collect_angles(&mut self, circle: &Circle) {
        if !self.enabled(SnapKind::Angle) {
            return;
        }
        for deg in SNAP_ANGLES {
            self.push(circle.point_at_snap_angle(deg), SnapKind::Angle);
        }
    }

    /// 圆心：圆/圆弧在圆周上布置触发点，实际返回圆心；椭圆直接给出中心
    pub fn collect_center(&mut self, edge: &Edge) {
        if !self.enabled(SnapKind::Center) {
            return;
        }
        match &edge.curve {
            Curve::Circle(circle) => {
                let center = self.to_wp(&circle.center);
                for deg in CENTER_ANGLES {
                    let raw = circle.point_at_snap_angle(deg);
                    self.candidates.push(SnapCandidate::new(raw, SnapKind::Center, center));
                }
            }
            Curve::Ellipse(ellipse) => self.push(ellipse.center, SnapKind::Center),
            _ => {}
        }
    }

    // ========== 面 ==========

    pub fn collect_near_face(&mut self, face: &Face, point: &Point3) {
        if !self.enabled(SnapKind::Near) {
            return;
        }
        match face.nearest_point(point) {
            Ok(np) => self.push(np, SnapKind::Near),
            Err(e) => debug!("Near face snap skipped: {}", e),
        }
    }

    pub fn collect_perpendicular_face(&mut self, face: &Face, last: Option<&Point3>) {
        let Some(last) = last else { return };
        if !self.enabled(SnapKind::Perpendicular) {
            return;
        }
        match face.perpendicular_feet(last) {
            Ok(feet) => {
                for p in feet {
                    self.push(p, SnapKind::Perpendicular);
                }
            }
            Err(e) => debug!("Perpendicular face snap skipped: {}", e),
        }
    }

    pub fn collect_center_face(&mut self, face: &Face) {
        if self.enabled(SnapKind::Center) {
            self.push(face.center_of_mass, SnapKind::Center);
        }
    }

    // ========== 对象级 ==========

    /// 标注的两个定义点
    pub fn collect_dim(&mut self, p2: &Point3, p3: &Point3) {
        self.collect_endpoints([*p2, *p3]);
    }

    /// 正多边形：各边 1/4 与 3/4 处触发，返回放置原点
    pub fn collect_polygon(&mut self, obj: &SnapObject, shape: &Shape) {
        if !self.enabled(SnapKind::Center) {
            return;
        }
        let center = self.to_wp(&obj.placement_base());
        for edge in &shape.edges {
            let vertices = edge.vertices();
            let (Some(p1), Some(p2)) = (vertices.first(), vertices.last()) else {
                continue;
            };
            let d = p2 - p1;
            self.candidates
                .push(SnapCandidate::new(p1 + d * 0.25, SnapKind::Center, center));
            self.candidates
                .push(SnapCandidate::new(p1 + d * 0.75, SnapKind::Center, center));
        }
    }

    /// 放置原点（空建筑部件、工作平面代理）
    fn collect_placement_center(&mut self, obj: &SnapObject) {
        if self.enabled(SnapKind::Center) {
            self.push(obj.placement_base(), SnapKind::Center);
        }
    }

    /// 特殊点：墙/结构件的基线顶点、结构件节点、作者定义的捕捉点
    pub fn collect_specials(
        &mut self,
        obj: &SnapObject,
        last: Option<&Point3>,
        eline: Option<&Line>,
        recent: &[&SnapObject],
    ) {
        if !self.enabled(SnapKind::Special) {
            return;
        }
        match &obj.kind {
            GeometryKind::Wall { base, .. } => {
                if let Some(base) = base.as_ref().filter(|b| !b.has_solids) {
                    for v in &base.vertices {
                        self.push(*v, SnapKind::Special);
                    }
                }
            }
            GeometryKind::Structure { base, nodes, .. } => {
                match base {
                    Some(base) => {
                        if !base.has_solids {
                            for v in &base.vertices {
                                self.push(*v, SnapKind::Special);
                            }
                        }
                    }
                    None => self.push(obj.placement_base(), SnapKind::Special),
                }
                for edge in nodes.iter().flatten() {
                    self.collect_endpoints(edge.vertices());
                    self.collect_midpoint(edge);
                    self.collect_perpendicular(edge, last);
                    self.collect_intersection(edge, recent);
                    self.collect_elines(edge, eline);
                }
            }
            _ => {
                for p in &obj.snap_points {
                    let p = obj.placement.transform_point(p);
                    self.candidates.push(SnapCandidate::new(p, SnapKind::Special, p));
                }
            }
        }
    }

    /// 拾取到的子元素为边时的全部候选
    fn collect_edge(
        &mut self,
        edge: &Edge,
        point: &Point3,
        last: Option<&Point3>,
        eline: Option<&Line>,
        recent: &[&SnapObject],
    ) {
        self.collect_near(edge, point);
        self.collect_endpoints(edge.vertices());
        self.collect_midpoint(edge);
        self.collect_perpendicular(edge, last);
        self.collect_intersection(edge, recent);
        self.collect_elines(edge, eline);

        match &edge.curve {
            Curve::Circle(circle) => {
                self.collect_angles(circle);
                self.collect_center(edge);
            }
            Curve::Ellipse(_) => self.collect_center(edge),
            _ => {}
        }
    }

    /// 按对象类别与拾取子元素收集全部候选
    ///
    /// `recent` 为本次查询前的近期对象，用于交点计算。
    pub fn collect_object(
        &mut self,
        obj: &SnapObject,
        pick: &PickInfo,
        last: Option<&Point3>,
        eline: Option<&Line>,
        recent: &[&SnapObject],
    ) {
        let point = &pick.point;

        // 剖切平面只捕捉角点
        if let GeometryKind::SectionPlane { shape } = &obj.kind {
            self.collect_endpoints(shape.vertices.iter().copied());
            return;
        }

        if let Some(shape) = obj.kind.shape() {
            self.collect_specials(obj, last, eline, recent);

            match &obj.kind {
                GeometryKind::Polygon { .. } => self.collect_polygon(obj, shape),
                GeometryKind::BuildingPart { .. } => self.collect_placement_center(obj),
                _ => {}
            }

            if !self.within_edge_limit(shape.edges.len()) {
                debug!(
                    "Skipping edge snaps on {}: {} edges",
                    obj.id,
                    shape.edges.len()
                );
                return;
            }

            match pick.component {
                Component::Edge(i) => {
                    if let Some(edge) = shape.edges.get(i) {
                        self.collect_edge(edge, point, last, eline, recent);
                    }
                }
                Component::Face(i) => {
                    if let Some(face) = shape.faces.get(i) {
                        self.collect_near_face(face, point);
                        self.collect_perpendicular_face(face, last);
                        self.collect_center_face(face);
                    }
                }
                Component::Vertex(i) => {
                    if let Some(v) = shape.vertices.get(i) {
                        self.collect_endpoints([*v]);
                    }
                }
                Component::Whole => self.collect_near_unprojected(point),
            }
            return;
        }

        match &obj.kind {
            GeometryKind::Dimension { p2, p3 } => self.collect_dim(p2, p3),
            GeometryKind::Axis { edges } => {
                for edge in edges {
                    self.collect_endpoints(edge.vertices());
                    self.collect_intersection(edge, recent);
                }
            }
            GeometryKind::Mesh { points } => {
                self.collect_near_unprojected(point);
                self.collect_endpoints(points.iter().copied());
            }
            // 点云过大，只使用拾取点
            GeometryKind::PointCloud => self.collect_endpoints([*point]),
            GeometryKind::WorkingPlaneProxy | GeometryKind::BuildingPart { .. } => {
                self.collect_placement_center(obj)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Isometry3, EPSILON};

    fn has(candidates: &[SnapCandidate], kind: SnapKind, p: Point3) -> bool {
        candidates
            .iter()
            .any(|c| c.kind == kind && (c.raw - p).norm() < 1e-6)
    }

    fn edge_pick(id: &str, index: usize, point: Point3) -> PickInfo {
        PickInfo {
            object: id.into(),
            component: Component::Edge(index),
            point,
        }
    }

    #[test]
    fn test_line_edge_candidates() {
        let wp = WorkingPlane::default();
        let obj = SnapObject::new(
            "line",
            GeometryKind::Part {
                shape: Shape::polyline(&[Point3::origin(), Point3::new(10.0, 0.0, 0.0)], false),
            },
        );
        let pick = edge_pick("line", 0, Point3::new(5.0, 0.1, 0.0));
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_object(&obj, &pick, Some(&Point3::new(3.0, 4.0, 0.0)), None, &[]);
        let cands = c.into_candidates();

        assert!(has(&cands, SnapKind::Near, Point3::new(5.0, 0.0, 0.0)));
        assert!(has(&cands, SnapKind::Endpoint, Point3::origin()));
        assert!(has(&cands, SnapKind::Endpoint, Point3::new(10.0, 0.0, 0.0)));
        assert!(has(&cands, SnapKind::Midpoint, Point3::new(5.0, 0.0, 0.0)));
        assert!(has(&cands, SnapKind::Perpendicular, Point3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_disabled_kinds_produce_nothing() {
        let wp = WorkingPlane::default();
        let edge = Edge::line(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let mut mask = SnapMask::default();
        mask.set(SnapKind::Lock, false);
        let mut c = CandidateCollector::new(mask, &wp, 0);
        c.collect_near(&edge, &Point3::origin());
        c.collect_endpoints(edge.vertices());
        c.collect_midpoint(&edge);
        assert!(c.candidates().is_empty());
    }

    #[test]
    fn test_circle_angles_start_on_local_y() {
        let wp = WorkingPlane::default();
        let circle = Circle::xy(Point3::origin(), 3.0);
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_angles(&circle);
        let cands = c.into_candidates();
        assert_eq!(cands.len(), 16);
        assert!(has(&cands, SnapKind::Angle, Point3::new(0.0, 3.0, 0.0)));
        assert!(has(&cands, SnapKind::Angle, Point3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_center_candidates_project_to_center() {
        let wp = WorkingPlane::default();
        let edge = Edge::circle(Circle::xy(Point3::new(2.0, 2.0, 0.0), 1.0));
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_center(&edge);
        let cands = c.into_candidates();
        assert_eq!(cands.len(), 16);
        for cand in &cands {
            assert!((cand.projected - Point3::new(2.0, 2.0, 0.0)).norm() < EPSILON);
            assert!(((cand.raw - Point3::new(2.0, 2.0, 0.0)).norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_working_plane_projection_toggle() {
        let wp = WorkingPlane::default();
        let raised = Point3::new(1.0, 1.0, 5.0);

        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_endpoints([raised]);
        assert_eq!(c.candidates()[0].projected, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(c.candidates()[0].raw, raised);

        let mut mask = SnapMask::default();
        mask.set(SnapKind::WorkingPlane, false);
        let mut c = CandidateCollector::new(mask, &wp, 0);
        c.collect_endpoints([raised]);
        assert_eq!(c.candidates()[0].projected, raised);
    }

    #[test]
    fn test_intersection_with_recent_objects() {
        let wp = WorkingPlane::default();
        let other = SnapObject::new(
            "other",
            GeometryKind::Part {
                shape: Shape::polyline(
                    &[Point3::new(5.0, -5.0, 0.0), Point3::new(5.0, 5.0, 0.0)],
                    false,
                ),
            },
        );
        let edge = Edge::line(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_intersection(&edge, &[&other]);
        assert!(has(c.candidates(), SnapKind::Intersection, Point3::new(5.0, 0.0, 0.0)));

        // 超过边数限制的对象被跳过
        let busy = SnapObject::new(
            "busy",
            GeometryKind::Part {
                shape: Shape::polyline(
                    &[
                        Point3::new(5.0, -5.0, 0.0),
                        Point3::new(5.0, 5.0, 0.0),
                        Point3::new(6.0, 5.0, 0.0),
                    ],
                    false,
                ),
            },
        );
        let mut limited = CandidateCollector::new(SnapMask::default(), &wp, 1);
        limited.collect_intersection(&edge, &[&busy]);
        assert!(limited.candidates().is_empty());
    }

    #[test]
    fn test_eline_intersection_needs_extension() {
        let wp = WorkingPlane::default();
        let edge = Edge::line(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let eline = Line::new(Point3::new(7.0, 1.0, 0.0), Point3::new(7.0, 2.0, 0.0));

        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_elines(&edge, Some(&eline));
        assert!(has(c.candidates(), SnapKind::Intersection, Point3::new(7.0, 0.0, 0.0)));

        let mut mask = SnapMask::default();
        mask.set(SnapKind::Extension, false);
        let mut c = CandidateCollector::new(mask, &wp, 0);
        c.collect_elines(&edge, Some(&eline));
        assert!(c.candidates().is_empty());
    }

    #[test]
    fn test_polygon_center() {
        let wp = WorkingPlane::default();
        let shape = Shape::polyline(
            &[
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(-1.0, 1.0, 0.0),
            ],
            true,
        );
        let obj = SnapObject::new("poly", GeometryKind::Polygon { shape: shape.clone() });
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_polygon(&obj, &shape);
        let cands = c.into_candidates();
        assert_eq!(cands.len(), 8);
        assert!(has(&cands, SnapKind::Center, Point3::new(-0.5, -1.0, 0.0)));
        assert!(cands.iter().all(|c| c.projected == Point3::origin()));
    }

    #[test]
    fn test_specials() {
        let wp = WorkingPlane::default();
        let base = Shape::polyline(&[Point3::origin(), Point3::new(4.0, 0.0, 0.0)], false);
        let wall = SnapObject::new(
            "wall",
            GeometryKind::Wall {
                shape: Shape::polyline(&[Point3::new(0.0, 0.5, 0.0), Point3::new(4.0, 0.5, 0.0)], false),
                base: Some(base),
                additions: vec![],
            },
        );
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_specials(&wall, None, None, &[]);
        assert!(has(c.candidates(), SnapKind::Special, Point3::new(4.0, 0.0, 0.0)));

        let column = SnapObject::new(
            "column",
            GeometryKind::Structure {
                shape: Shape::polyline(&[Point3::origin(), Point3::new(0.0, 0.0, 3.0)], false),
                base: None,
                nodes: Some(vec![Edge::line(Point3::origin(), Point3::new(0.0, 0.0, 3.0))]),
            },
        )
        .with_placement(Isometry3::translation(1.0, 1.0, 0.0));
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_specials(&column, None, None, &[]);
        assert!(has(c.candidates(), SnapKind::Special, Point3::new(1.0, 1.0, 0.0)));
        assert!(has(c.candidates(), SnapKind::Midpoint, Point3::new(0.0, 0.0, 1.5)));

        let anchor = SnapObject::new("anchor", GeometryKind::WorkingPlaneProxy)
            .with_placement(Isometry3::translation(0.0, 0.0, 2.0))
            .with_snap_points(vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_specials(&anchor, None, None, &[]);
        let cand = c.candidates()[0];
        // 作者定义点不投影
        assert_eq!(cand.projected, Point3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_object_kinds_without_shape() {
        let wp = WorkingPlane::default();
        let pick = PickInfo {
            object: "x".into(),
            component: Component::Whole,
            point: Point3::new(0.3, 0.3, 0.0),
        };

        let dim = SnapObject::new(
            "dim",
            GeometryKind::Dimension {
                p2: Point3::origin(),
                p3: Point3::new(2.0, 0.0, 0.0),
            },
        );
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_object(&dim, &pick, None, None, &[]);
        assert_eq!(c.candidates().len(), 2);

        let cloud = SnapObject::new("cloud", GeometryKind::PointCloud);
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_object(&cloud, &pick, None, None, &[]);
        assert!(has(c.candidates(), SnapKind::Endpoint, pick.point));

        let proxy = SnapObject::new("wp", GeometryKind::WorkingPlaneProxy)
            .with_placement(Isometry3::translation(3.0, 0.0, 0.0));
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_object(&proxy, &pick, None, None, &[]);
        assert!(has(c.candidates(), SnapKind::Center, Point3::new(3.0, 0.0, 0.0)));

        let mesh = SnapObject::new(
            "mesh",
            GeometryKind::Mesh {
                points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            },
        );
        let mut c = CandidateCollector::new(SnapMask::default(), &wp, 0);
        c.collect_object(&mesh, &pick, None, None, &[]);
        assert!(has(c.candidates(), SnapKind::Near, pick.point));
        assert_eq!(c.candidates().len(), 3);
    }
}
