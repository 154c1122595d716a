//! 捕捉器
//!
//! 根据光标屏幕位置计算捕捉点。一次查询的流程：
//! 1. 光标投影到工作平面得到视点
//! 2. 主动捕捉时依次尝试极轴、保持点、延长线与平行线
//! 3. 光标下有对象时生成候选点并裁决，得到结果即返回
//! 4. 否则尝试延长线交叉点或网格点
//! 5. 应用轴约束，更新轨迹线与尺寸提示
//!
//! 同一时刻只允许一次查询，重入调用直接返回 None。

use crate::generators::CandidateCollector;
use crate::geometry::{Curve, Edge, Line};
use crate::host::{Document, ParamStore, ParamValue, PickInfo, ScreenPos, Viewport};
use crate::intersect::{
    are_colinear, find_distance, find_intersection, is_point_on_edge, line_intersection,
    perpendicular_on,
};
use crate::math::{angle_between, is_null, points_equal, project, rotate, Point3, Vector3, EPSILON};
use crate::object::{ObjectId, SnapObject};
use crate::plane::{Axis, AxisSpec, WorkingPlane};
use crate::resolve::pick_winner;
use crate::session::{LineTracker, RecentObjects, TrackerSet, ViewRegistry};
use crate::snap::{param, MarkerStyle, SnapConfig, SnapKind, SnapMask};
use tracing::{debug, trace, warn};

/// 捕捉半径为 0 时极轴吸附的角度容差（弧度，约 5°）
const POLAR_ANGLE_TOLERANCE: f64 = 0.087;

/// 显示半径指示时换算像素距离的屏幕位置
const RADIUS_PROBE: ScreenPos = ScreenPos { x: 400.0, y: 300.0 };

/// 一次查询所需的宿主对象
pub struct SnapContext<'a> {
    pub view: &'a dyn Viewport,
    pub document: &'a dyn Document,
    pub plane: &'a WorkingPlane,
    /// 是否有绘图命令正在执行
    pub command_active: bool,
    /// 约束使用全局坐标系而不是工作平面
    pub global_mode: bool,
}

impl<'a> SnapContext<'a> {
    pub fn new(view: &'a dyn Viewport, document: &'a dyn Document, plane: &'a WorkingPlane) -> Self {
        Self {
            view,
            document,
            plane,
            command_active: true,
            global_mode: false,
        }
    }

    pub fn with_command_active(mut self, active: bool) -> Self {
        self.command_active = active;
        self
    }

    pub fn with_global_mode(mut self, global: bool) -> Self {
        self.global_mode = global;
        self
    }

    /// 约束计算使用的平面
    fn constraint_plane(&self) -> WorkingPlane {
        if self.global_mode {
            WorkingPlane::default()
        } else {
            *self.plane
        }
    }
}

/// 捕捉器
pub struct Snapper {
    config: SnapConfig,
    mask: SnapMask,
    params: Box<dyn ParamStore>,
    views: ViewRegistry,
    constrain_line: LineTracker,
    recent: RecentObjects,
    hold_points: Vec<Point3>,
    /// 最近两条延长线，最新的在前
    last_extensions: Vec<Line>,
    /// 当前捕捉半径（世界单位）
    radius: f64,
    constraint_axis: Option<Vector3>,
    basepoint: Option<Point3>,
    affinity: Option<AxisSpec>,
    /// 角度锁定
    angle_mask: Option<AxisSpec>,
    select_mode: bool,
    /// 光标状态；`Some(Near)` 为被动光标
    cursor: Option<SnapKind>,
    running: bool,
    snap_object_index: usize,
    spoint: Option<Point3>,
    snap_info: Option<PickInfo>,
}

impl Snapper {
    /// 从参数存储加载配置与捕捉开关
    pub fn new(params: Box<dyn ParamStore>) -> Self {
        let config = SnapConfig::load(params.as_ref());
        let mask = SnapConfig::load_mask(params.as_ref());
        debug!("Snapper created with modes {}", mask.to_bitstring());
        Self {
            config,
            mask,
            params,
            views: ViewRegistry::new(),
            constrain_line: LineTracker::new(true),
            recent: RecentObjects::new(),
            hold_points: Vec::new(),
            last_extensions: Vec::with_capacity(2),
            radius: 0.0,
            constraint_axis: None,
            basepoint: None,
            affinity: None,
            angle_mask: None,
            select_mode: false,
            cursor: None,
            running: false,
            snap_object_index: 0,
            spoint: None,
            snap_info: None,
        }
    }

    /// 重新读取参数（捕捉开关保持不变）
    pub fn reload_config(&mut self) {
        self.config = SnapConfig::load(self.params.as_ref());
    }

    // ========== 状态查询 ==========

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn mask(&self) -> SnapMask {
        self.mask
    }

    pub fn params(&self) -> &dyn ParamStore {
        self.params.as_ref()
    }

    pub fn is_enabled(&self, kind: SnapKind) -> bool {
        self.mask.is_enabled(kind)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 最近一次查询的结果
    pub fn last_point(&self) -> Option<Point3> {
        self.spoint
    }

    /// 最近一次查询的拾取信息
    pub fn snap_info(&self) -> Option<&PickInfo> {
        self.snap_info.as_ref()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn cursor(&self) -> Option<SnapKind> {
        self.cursor
    }

    pub fn hold_points(&self) -> &[Point3] {
        &self.hold_points
    }

    pub fn recent_objects(&self) -> &RecentObjects {
        &self.recent
    }

    pub fn last_extensions(&self) -> &[Line] {
        &self.last_extensions
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// 当前视图的追踪器
    pub fn trackers(&self) -> Option<&TrackerSet> {
        self.views.active()
    }

    pub fn constrain_line(&self) -> &LineTracker {
        &self.constrain_line
    }

    pub fn constraint_axis(&self) -> Option<Vector3> {
        self.constraint_axis
    }

    pub fn affinity(&self) -> Option<AxisSpec> {
        self.affinity
    }

    pub fn angle_mask(&self) -> Option<AxisSpec> {
        self.angle_mask
    }

    pub fn select_mode(&self) -> bool {
        self.select_mode
    }

    /// 捕捉类型对应的标记样式（由 snapStyle 参数决定方形或圆形）
    pub fn marker_style(&self, kind: SnapKind) -> MarkerStyle {
        kind.marker(self.config.square_markers)
    }

    // ========== 主查询 ==========

    /// 计算屏幕位置对应的捕捉点
    ///
    /// - `last`：上一个点，用于垂足、极轴、平行线和轨迹线
    /// - `active`：启用主动捕捉（`alwaysSnap` 为真时总是启用）
    /// - `constrain`：约束到最接近的工作平面轴
    /// - `no_tracker`：不显示轨迹线
    pub fn snap(
        &mut self,
        ctx: &SnapContext<'_>,
        screen: ScreenPos,
        last: Option<Point3>,
        active: bool,
        constrain: bool,
        no_tracker: bool,
    ) -> Option<Point3> {
        if self.running {
            return None;
        }
        if !screen.is_valid() {
            warn!("Snap needs a valid screen position, got ({}, {})", screen.x, screen.y);
            return None;
        }

        self.running = true;
        let point = self.resolve(ctx, screen, last, active, constrain, no_tracker);
        self.running = false;
        Some(point)
    }

    fn resolve(
        &mut self,
        ctx: &SnapContext<'_>,
        screen: ScreenPos,
        last: Option<Point3>,
        active: bool,
        constrain: bool,
        no_tracker: bool,
    ) -> Point3 {
        self.spoint = None;
        self.snap_info = None;

        self.set_trackers(ctx);

        self.radius = ctx.view.pixel_to_world_distance(self.config.snap_range, screen);
        let radius = self.radius;
        if let Some(t) = self.views.active_mut() {
            t.radius.radius = radius;
            t.radius.off();
        }

        let active = active || self.config.always_snap;

        self.set_cursor(Some(SnapKind::Near));
        if let Some(t) = self.views.active_mut() {
            t.hide_transient();
        }

        let mut point = self.apparent_point(ctx, screen);

        if let (Some(last), Some(t)) = (last, self.views.active_mut()) {
            t.track_line.p1 = last;
        }

        // 极轴、保持点、延长线与平行线
        let mut eline = None;
        if active {
            (point, eline) = self.snap_to_polar(ctx.plane, point, last);
            (point, eline) = self.snap_to_extensions(ctx, point, last, constrain, eline);
        }

        let picks = ctx.view.objects_under_cursor(screen);
        if !picks.is_empty() {
            if self.snap_object_index >= picks.len() {
                self.snap_object_index = 0;
            }
            self.snap_info = picks.into_iter().nth(self.snap_object_index);
        }

        if self.snap_info.is_some() {
            if let Some(fp) = self.snap_to_object(ctx, last, active, constrain, eline.as_ref()) {
                return fp;
            }
        }

        // 没有对象捕捉时尝试延长线交叉点与网格
        if active {
            point = match self.snap_to_cross_extensions(point) {
                Some(p) => p,
                None => self.snap_to_grid(point),
            };
        }

        let fp = self.cstr(ctx, last, constrain, point);
        if let Some(last) = last {
            if !no_tracker {
                if let Some(t) = self.views.active_mut() {
                    t.track_line.p2 = fp;
                    t.track_line.on();
                }
            }
            self.set_arch_dims(ctx.plane, last, fp);
        }

        trace!("Snapped to {:?} ({:?})", fp, self.cursor);
        self.spoint = Some(fp);
        fp
    }

    /// 切换到当前视图的追踪器，必要时显示网格
    fn set_trackers(&mut self, ctx: &SnapContext<'_>) {
        let set = self.views.activate(ctx.view.id(), &self.config);
        if set.grid.show_always || (set.grid.show_during_command && ctx.command_active) {
            set.grid.set(ctx.plane);
        }
    }

    fn set_cursor(&mut self, kind: Option<SnapKind>) {
        self.cursor = if self.select_mode { None } else { kind };
    }

    fn show_marker(&mut self, at: Point3, kind: SnapKind) {
        if self.select_mode {
            return;
        }
        let style = kind.marker(self.config.square_markers);
        if let Some(t) = self.views.active_mut() {
            t.marker.show_at(at, style);
        }
    }

    /// 光标在工作平面上的视点；角度锁定为 Z 轴时不投影
    fn apparent_point(&self, ctx: &SnapContext<'_>, screen: ScreenPos) -> Point3 {
        let pt = ctx.view.screen_to_world(screen);
        if self.angle_mask == Some(AxisSpec::Named(Axis::Z)) {
            return pt;
        }
        let dir = match ctx.view.camera_position() {
            Some(camera) => pt - camera,
            None => ctx.view.view_direction(),
        };
        ctx.plane.project_point(&pt, Some(&dir))
    }

    // ========== 全局捕捉 ==========

    /// 从上一点出发的极轴方向
    fn snap_to_polar(
        &mut self,
        plane: &WorkingPlane,
        point: Point3,
        last: Option<Point3>,
    ) -> (Point3, Option<Line>) {
        if !self.mask.is_enabled(SnapKind::Ortho) || self.angle_mask.is_some() {
            return (point, None);
        }
        let Some(last) = last else {
            return (point, None);
        };

        let mut dirs = Vec::with_capacity(self.config.polar_angles.len() * 4);
        for &angle in &self.config.polar_angles {
            if angle == 90.0 {
                dirs.extend([plane.u, -plane.u, plane.v, -plane.v]);
            } else {
                let rad = angle.to_radians();
                let a = rotate(&plane.u, rad, &plane.axis);
                let b = rotate(&plane.v, rad, &plane.axis);
                dirs.extend([a, -a, b, -b]);
            }
        }

        for dir in dirs {
            if is_null(&dir) {
                continue;
            }
            let de = Line::new(last, last + dir);
            let np = perpendicular_on(&de, &point);
            let aligned =
                self.radius == 0.0 && angle_between(&(point - last), &dir) < POLAR_ANGLE_TOLERANCE;
            if aligned || (np - point).norm() < self.radius {
                if !self.select_mode {
                    self.show_marker(np, SnapKind::Parallel);
                    self.set_cursor(Some(SnapKind::Ortho));
                }
                return (np, Some(de));
            }
        }
        (point, None)
    }

    /// 保持点、延长线与平行线
    fn snap_to_extensions(
        &mut self,
        ctx: &SnapContext<'_>,
        point: Point3,
        last: Option<Point3>,
        constrain: bool,
        eline: Option<Line>,
    ) -> (Point3, Option<Line>) {
        if let Some((base, kind, fp)) = self.snap_to_hold(ctx.plane, &point) {
            self.show_marker(fp, kind);
            if let Some(t) = self.views.active_mut() {
                t.ext_line.p1 = base;
                t.ext_line.p2 = fp;
                t.ext_line.on();
            }
            self.set_cursor(Some(kind));
            return (fp, eline);
        }

        if self.mask.is_enabled(SnapKind::Extension) {
            if let Some(tp) = self.snap_to_ext_ortho(last, constrain, eline.as_ref()) {
                if (tp - point).norm() < self.radius {
                    return self.accept_ext_snap(tp, SnapKind::Ortho, eline);
                }
            } else if let Some(tp) = self.snap_to_ext_perpendicular(last) {
                if (tp - point).norm() < self.radius {
                    return self.accept_ext_snap(tp, SnapKind::Perpendicular, eline);
                }
            }
        }

        let extension = self.mask.is_enabled(SnapKind::Extension);
        let parallel = self.mask.is_enabled(SnapKind::Parallel);
        if !(extension || parallel) {
            return (point, eline);
        }

        let recent: Vec<ObjectId> = self.recent.iter().cloned().collect();
        for id in &recent {
            let Some(obj) = ctx.document.object(id) else {
                continue;
            };
            let edges = obj.extension_edges();
            if self.config.max_snap_edges != 0 && edges.len() > self.config.max_snap_edges {
                continue;
            }
            for edge in edges {
                let Some(line) = edge.as_line() else {
                    continue;
                };
                let np = perpendicular_on(line, &point);
                if (np - point).norm() < self.radius {
                    if extension {
                        if is_point_on_edge(&np, edge) {
                            continue;
                        }
                        if !points_equal(&np, &line.start) {
                            let p0 = line.start;
                            self.show_marker(np, SnapKind::Extension);
                            if let Some(t) = self.views.active_mut() {
                                t.ext_line.p1 = p0;
                                t.ext_line.p2 = np;
                                t.ext_line.on();
                            }
                            self.set_cursor(Some(SnapKind::Extension));
                            let ne = Line::new(p0, np);
                            self.remember_extension(ne);
                            return (np, Some(ne));
                        }
                    }
                } else if parallel {
                    let Some(last) = last else {
                        continue;
                    };
                    let ve = line.vector();
                    if is_null(&ve) {
                        continue;
                    }
                    let de = Line::new(last, last + ve);
                    let np = perpendicular_on(&de, &point);
                    if (np - point).norm() < self.radius {
                        self.show_marker(np, SnapKind::Parallel);
                        self.set_cursor(Some(SnapKind::Parallel));
                        return (np, Some(de));
                    }
                }
            }
        }
        (point, eline)
    }

    fn accept_ext_snap(
        &mut self,
        point: Point3,
        kind: SnapKind,
        eline: Option<Line>,
    ) -> (Point3, Option<Line>) {
        self.show_marker(point, kind);
        if let Some(t) = self.views.active_mut() {
            t.ext_line.p2 = point;
            t.ext_line.on();
        }
        self.set_cursor(Some(kind));
        (point, eline)
    }

    /// 记录延长线，最多两条且互不共线
    fn remember_extension(&mut self, line: Line) {
        let exts = &mut self.last_extensions;
        match exts.len() {
            0 => exts.push(line),
            1 => {
                if !are_colinear(&line, &exts[0]) {
                    exts.insert(0, line);
                }
            }
            _ => {
                if !are_colinear(&line, &exts[0]) && !are_colinear(&line, &exts[1]) {
                    exts[1] = exts[0];
                    exts[0] = line;
                }
            }
        }
    }

    /// 保持点：两两中点、正交交点，或经过保持点的平面轴线
    ///
    /// 返回 (延长线起点, 捕捉类型, 捕捉点)。
    fn snap_to_hold(&self, plane: &WorkingPlane, point: &Point3) -> Option<(Point3, SnapKind, Point3)> {
        if self.hold_points.is_empty() {
            return None;
        }
        let (u, v) = (plane.u, plane.v);

        if self.hold_points.len() > 1 {
            if self.mask.is_enabled(SnapKind::Midpoint) {
                for (i, p1) in self.hold_points.iter().enumerate() {
                    for p2 in &self.hold_points[i + 1..] {
                        let mid = p1 + (p2 - p1) * 0.5;
                        if (mid - point).norm() < self.radius {
                            return Some((*p1, SnapKind::Midpoint, mid));
                        }
                    }
                }
            }

            let mut crossings = Vec::new();
            let mut pending = self.hold_points.clone();
            while let Some(p1) = pending.pop() {
                for p2 in &pending {
                    if let Some(i1) = line_intersection(&p1, &(p1 + u), p2, &(p2 + v), true, true) {
                        crossings.push((p1, i1));
                    }
                    if let Some(i2) = line_intersection(&p1, &(p1 + v), p2, &(p2 + u), true, true) {
                        crossings.push((p1, i2));
                    }
                }
            }
            if let Some((base, ip)) = crossings
                .into_iter()
                .find(|(_, ip)| (ip - point).norm() < self.radius)
            {
                return Some((base, SnapKind::Ortho, ip));
            }
        }

        for p in &self.hold_points {
            for dir in [u, v] {
                if let Some(d) = find_distance(point, p, &dir) {
                    if d.norm() < self.radius {
                        return Some((*p, SnapKind::Extension, point + d));
                    }
                }
            }
        }
        None
    }

    /// 约束轴或延长线与当前延长线追踪器的交点
    fn snap_to_ext_ortho(
        &self,
        last: Option<Point3>,
        constrain: bool,
        eline: Option<&Line>,
    ) -> Option<Point3> {
        if !(self.mask.is_enabled(SnapKind::Extension) && self.mask.is_enabled(SnapKind::Ortho)) {
            return None;
        }
        let (e1, e2) = self.views.active().map(|t| (t.ext_line.p1, t.ext_line.p2))?;

        if constrain {
            if let (Some(last), Some(axis)) = (last, self.constraint_axis) {
                if let Some(p) = line_intersection(&last, &(last + axis), &e1, &e2, true, true) {
                    return Some(p);
                }
            }
        }
        let eline = eline?;
        line_intersection(&eline.start, &eline.end, &e1, &e2, true, true)
    }

    /// 上一点到当前延长线追踪器的垂足
    fn snap_to_ext_perpendicular(&self, last: Option<Point3>) -> Option<Point3> {
        if !(self.mask.is_enabled(SnapKind::Extension) && self.mask.is_enabled(SnapKind::Perpendicular)) {
            return None;
        }
        let last = last?;
        let t = self.views.active()?;
        if points_equal(&t.ext_line.p1, &t.ext_line.p2) {
            return None;
        }
        Some(perpendicular_on(&Line::new(t.ext_line.p1, t.ext_line.p2), &last))
    }

    /// 最近两条延长线的交点
    fn snap_to_cross_extensions(&mut self, point: Point3) -> Option<Point3> {
        if !self.mask.is_enabled(SnapKind::Extension) {
            return None;
        }
        let [e0, e1] = self.last_extensions.as_slice() else {
            return None;
        };
        let (e0, e1) = (*e0, *e1);
        let points = find_intersection(
            &Edge::new(Curve::Line(e0)),
            &Edge::new(Curve::Line(e1)),
            true,
            true,
        );
        let radius = self.radius;
        let p = points
            .into_iter()
            .find(|p| radius == 0.0 || (point - p).norm() <= radius)?;

        self.show_marker(p, SnapKind::Intersection);
        self.set_cursor(Some(SnapKind::Intersection));
        if let Some(t) = self.views.active_mut() {
            let p0 = if points_equal(&t.ext_line.p1, &e0.start) {
                e1.start
            } else {
                e0.start
            };
            t.ext_line2.p1 = p0;
            t.ext_line2.p2 = p;
            t.ext_line.p2 = p;
            t.ext_line2.on();
        }
        Some(p)
    }

    /// 可见网格上的最近节点
    fn snap_to_grid(&mut self, point: Point3) -> Point3 {
        if !self.mask.is_enabled(SnapKind::Grid) {
            return point;
        }
        let node = match self.views.active() {
            Some(t) if t.grid.visible => t.grid.closest_node(&point),
            _ => None,
        };
        if let Some(np) = node {
            if self.radius == 0.0 || (point - np).norm() <= self.radius {
                self.show_marker(np, SnapKind::Grid);
                self.set_cursor(Some(SnapKind::Grid));
                return np;
            }
        }
        point
    }

    // ========== 对象捕捉 ==========

    fn snap_to_object(
        &mut self,
        ctx: &SnapContext<'_>,
        last: Option<Point3>,
        active: bool,
        constrain: bool,
        eline: Option<&Line>,
    ) -> Option<Point3> {
        if !active {
            return None;
        }
        let info = self.snap_info.clone()?;
        let obj = ctx.document.object(&info.object)?;
        if obj.kind.is_unsnappable() || !obj.selectable {
            return None;
        }

        let recent: Vec<&SnapObject> = self
            .recent
            .iter()
            .filter_map(|id| ctx.document.object(id))
            .collect();
        let mut collector = CandidateCollector::new(self.mask, ctx.plane, self.config.max_snap_edges);
        collector.collect_object(obj, &info, last.as_ref(), eline, &recent);
        let candidates = collector.into_candidates();

        // 没有候选点也要记录，交点捕捉依赖它
        self.recent.touch(obj.id.clone());

        if candidates.is_empty() {
            trace!("No snap candidates on {}", obj.id);
            return None;
        }

        let range = self.config.snap_range;
        let view = ctx.view;
        let pick_screen = view.world_to_screen(&info.point);
        let winner = *pick_winner(&candidates, &info.point, |c| {
            view.world_to_screen(&c.raw).distance(&pick_screen) <= range
        })?;
        trace!(
            "Snap winner on {}: {} at {:?} ({} candidates)",
            obj.id,
            winner.kind.name(),
            winner.projected,
            candidates.len()
        );

        self.show_marker(winner.projected, winner.kind);
        let fp = self.cstr(ctx, last, constrain, winner.projected);
        if let Some(t) = self.views.active_mut().filter(|_| last.is_some()) {
            t.track_line.p2 = fp;
            t.track_line.on();
        }
        self.set_cursor(Some(winner.kind));
        if let Some(last) = last {
            self.set_arch_dims(ctx.plane, last, fp);
        }

        self.spoint = Some(fp);
        Some(fp)
    }

    // ========== 约束 ==========

    /// 需要时应用轴约束
    fn cstr(
        &mut self,
        ctx: &SnapContext<'_>,
        last: Option<Point3>,
        constrain: bool,
        point: Point3,
    ) -> Point3 {
        let fp = if constrain || self.angle_mask.is_some() {
            let plane = ctx.constraint_plane();
            self.constrain(point, last, None, &plane)
        } else {
            self.unconstrain();
            point
        };
        if let Some(t) = self.views.active_mut() {
            t.radius.center = Some(fp);
        }
        fp
    }

    /// 把点约束到经过基点的轴线上
    ///
    /// 未给出 `basepoint` 时沿用已有基点（没有则以该点为基点）。
    /// 未给出 `axis` 时依次使用角度锁定、已确定的轴向、最接近位移方向的平面轴，
    /// 确定后的轴向在 `unconstrain` 之前保持不变。
    pub fn constrain(
        &mut self,
        point: Point3,
        basepoint: Option<Point3>,
        axis: Option<AxisSpec>,
        plane: &WorkingPlane,
    ) -> Point3 {
        let base = match basepoint {
            Some(bp) => bp,
            None => *self.basepoint.get_or_insert(point),
        };
        self.basepoint = Some(base);
        let delta = point - base;

        self.constraint_axis = match axis {
            Some(spec) => Some(plane.resolve(&spec)),
            None => {
                if self.angle_mask.is_some() {
                    self.affinity = self.angle_mask;
                }
                let affinity = *self
                    .affinity
                    .get_or_insert_with(|| AxisSpec::Named(plane.closest_axis(&delta)));
                Some(plane.resolve(&affinity))
            }
        };

        let Some(axis) = self.constraint_axis.filter(|a| !is_null(a)) else {
            return point;
        };

        let npoint = base + project(&delta, &axis);
        if points_equal(&point, &npoint) {
            self.constrain_line.off();
        } else {
            self.constrain_line.p1 = point;
            self.constrain_line.p2 = npoint;
            self.constrain_line.on();
        }
        npoint
    }

    /// 清除基点与轴向
    pub fn unconstrain(&mut self) {
        self.basepoint = None;
        self.affinity = None;
        self.constrain_line.off();
    }

    // ========== 尺寸提示 ==========

    fn set_arch_dims(&mut self, plane: &WorkingPlane, p1: Point3, p2: Point3) {
        if !self.mask.is_enabled(SnapKind::Dimensions) {
            return;
        }
        if let Some(t) = self.views.active_mut() {
            for dim in [&mut t.dim1, &mut t.dim2] {
                dim.update(p1, p2, plane);
                if dim.distance > EPSILON {
                    dim.on();
                }
            }
        }
    }

    // ========== 会话控制 ==========

    /// 结束捕捉：隐藏追踪器并清除临时状态
    ///
    /// 没有命令执行时同时隐藏非常驻网格。可重复调用。
    pub fn off(&mut self, command_active: bool) {
        if let Some(t) = self.views.active_mut() {
            t.hide_transient();
            t.radius.off();
            t.hold.clear();
            t.hold.off();
        }
        self.unconstrain();
        self.radius = 0.0;
        self.cursor = None;
        self.angle_mask = None;
        self.select_mode = false;
        self.running = false;
        self.hold_points.clear();
        self.recent.clear();

        if command_active {
            return;
        }
        if let Some(t) = self.views.active_mut() {
            if !t.grid.show_always {
                t.grid.off();
            }
        }
    }

    /// 开关捕捉类型并立即持久化
    ///
    /// `set_to` 为 None 时切换当前状态。返回新的状态。
    pub fn toggle_snap(&mut self, kind: SnapKind, set_to: Option<bool>) -> bool {
        let status = match set_to {
            Some(enabled) => {
                self.mask.set(kind, enabled);
                enabled
            }
            None => {
                self.mask.toggle(kind);
                self.mask.contains(kind)
            }
        };
        self.save_snap_state();
        status
    }

    fn save_snap_state(&mut self) {
        let modes = self.mask.to_bitstring();
        if let Err(e) = self.params.set(param::SNAP_MODES, ParamValue::Text(modes)) {
            warn!("Failed to save snap modes: {}", e);
        }
    }

    /// 把最近一次捕捉点加入保持点
    pub fn add_hold_point(&mut self) {
        let Some(sp) = self.spoint else {
            return;
        };
        if self.hold_points.iter().any(|p| points_equal(p, &sp)) {
            return;
        }
        if let Some(t) = self.views.active_mut() {
            t.hold.add(sp);
            t.hold.on();
        }
        self.hold_points.push(sp);
    }

    pub fn clear_hold_points(&mut self) {
        self.hold_points.clear();
        if let Some(t) = self.views.active_mut() {
            t.hold.clear();
            t.hold.off();
        }
    }

    /// 光标下有多个对象时切换到下一个
    pub fn cycle_snap_object(&mut self) {
        self.snap_object_index += 1;
    }

    /// 选择模式下隐藏捕捉标记与光标
    pub fn set_select_mode(&mut self, mode: bool) {
        self.select_mode = mode;
        if !mode {
            self.set_cursor(None);
        } else if let Some(t) = self.views.active_mut() {
            t.track_line.off();
        }
    }

    /// 锁定角度
    ///
    /// 给出方向时锁定到该方向；否则已锁定时解除，未锁定时锁定到当前轨迹线方向。
    pub fn set_angle(&mut self, delta: Option<Vector3>) {
        match delta {
            Some(d) => self.angle_mask = Some(AxisSpec::Vector(d)),
            None if matches!(self.angle_mask, Some(AxisSpec::Vector(_))) => self.angle_mask = None,
            None => {
                if let Some(t) = self.views.active().filter(|t| t.track_line.visible) {
                    self.angle_mask = Some(AxisSpec::Vector(t.track_line.vector()));
                }
            }
        }
    }

    /// 锁定到命名轴或自定义方向，None 解除
    pub fn set_angle_mask(&mut self, mask: Option<AxisSpec>) {
        self.angle_mask = mask;
    }

    /// 显示捕捉半径指示
    pub fn show_radius(&mut self, view: &dyn Viewport) {
        self.radius = view.pixel_to_world_distance(self.config.snap_range, RADIUS_PROBE);
        let radius = self.radius;
        let set = self.views.activate(view.id(), &self.config);
        set.radius.radius = radius;
        set.radius.on();
    }

    /// 在所有视图中恢复常驻网格
    pub fn show_grids(&mut self) {
        for set in self.views.iter_mut() {
            if set.grid.show_always {
                set.grid.on();
            } else {
                set.grid.off();
            }
        }
    }

    /// 隐藏所有视图中的网格（GridHideInOtherWorkbenches 关闭时不处理）
    pub fn hide_grids(&mut self) {
        if !self.config.grid_hide_in_other_workbenches {
            return;
        }
        for set in self.views.iter_mut() {
            set.grid.off();
        }
    }

    /// 把工作平面原点移到最近一次捕捉点
    pub fn recenter_working_plane(&self, plane: &mut WorkingPlane) {
        let Some(sp) = self.spoint else {
            return;
        };
        let position = if self.mask.is_enabled(SnapKind::WorkingPlane) {
            plane.project_point(&sp, None)
        } else {
            sp
        };
        plane.set_to_position(position);
    }
}
