//! 捕捉会话状态
//!
//! 每个视图一组可视追踪器（网格、捕捉标记、延长线、半径指示、尺寸提示、轨迹线、保持点标记），
//! 首次见到视图时创建，之后切换视图时直接换入，不重新创建。
//! 追踪器只是数据，绘制由宿主负责。

use crate::host::ViewId;
use crate::math::{Point3, Vector3};
use crate::object::ObjectId;
use crate::plane::WorkingPlane;
use crate::snap::{MarkerStyle, SnapConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// 捕捉点标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapMarker {
    pub position: Option<Point3>,
    pub style: MarkerStyle,
    pub visible: bool,
}

impl Default for SnapMarker {
    fn default() -> Self {
        Self {
            position: None,
            style: MarkerStyle::CircleLine,
            visible: false,
        }
    }
}

impl SnapMarker {
    pub fn show_at(&mut self, position: Point3, style: MarkerStyle) {
        self.position = Some(position);
        self.style = style;
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }
}

/// 线段追踪器（轨迹线、延长线、约束线）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTracker {
    pub p1: Point3,
    pub p2: Point3,
    pub dotted: bool,
    pub visible: bool,
}

impl LineTracker {
    pub fn new(dotted: bool) -> Self {
        Self {
            p1: Point3::origin(),
            p2: Point3::origin(),
            dotted,
            visible: false,
        }
    }

    pub fn vector(&self) -> Vector3 {
        self.p2 - self.p1
    }

    pub fn on(&mut self) {
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }
}

/// 网格追踪器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTracker {
    pub visible: bool,
    pub show_always: bool,
    pub show_during_command: bool,
    pub spacing: f64,
    /// 每侧网格线数量
    pub size: u32,
    /// 网格所在平面（最近一次显示时的工作平面）
    pub plane: WorkingPlane,
}

impl GridTracker {
    pub fn new(config: &SnapConfig) -> Self {
        Self {
            visible: false,
            show_always: config.always_show_grid,
            show_during_command: config.grid_during_command,
            spacing: config.grid_spacing,
            size: config.grid_size,
            plane: WorkingPlane::default(),
        }
    }

    /// 对齐到工作平面并显示
    pub fn set(&mut self, plane: &WorkingPlane) {
        self.plane = *plane;
        self.visible = true;
    }

    pub fn on(&mut self) {
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }

    /// 最近的网格节点；超出网格范围时返回 None
    pub fn closest_node(&self, point: &Point3) -> Option<Point3> {
        if self.spacing <= 0.0 {
            return None;
        }
        let local = self.plane.global_to_local(point);
        let extent = self.spacing * f64::from(self.size);
        let snap = |v: f64| (v / self.spacing).round() * self.spacing;
        let (x, y) = (snap(local.x), snap(local.y));
        if x.abs() > extent || y.abs() > extent {
            return None;
        }
        Some(self.plane.local_to_global(&Point3::new(x, y, 0.0)))
    }
}

/// 捕捉半径指示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadiusTracker {
    pub radius: f64,
    pub center: Option<Point3>,
    pub visible: bool,
}

impl RadiusTracker {
    pub fn on(&mut self) {
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }
}

/// 尺寸提示方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimMode {
    /// 沿工作平面 u 方向
    Horizontal,
    /// 沿工作平面 v 方向
    Vertical,
}

/// 尺寸提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimTracker {
    pub mode: DimMode,
    pub p1: Point3,
    pub p2: Point3,
    pub distance: f64,
    pub visible: bool,
}

impl DimTracker {
    pub fn new(mode: DimMode) -> Self {
        Self {
            mode,
            p1: Point3::origin(),
            p2: Point3::origin(),
            distance: 0.0,
            visible: false,
        }
    }

    /// 更新端点并按平面轴计算投影距离
    pub fn update(&mut self, p1: Point3, p2: Point3, plane: &WorkingPlane) {
        let dir = match self.mode {
            DimMode::Horizontal => plane.u,
            DimMode::Vertical => plane.v,
        };
        self.p1 = p1;
        self.p2 = p2;
        self.distance = (p2 - p1).dot(&dir).abs();
    }

    pub fn on(&mut self) {
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }
}

/// 保持点标记
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldTracker {
    pub points: Vec<Point3>,
    pub visible: bool,
}

impl HoldTracker {
    pub const STYLE: MarkerStyle = MarkerStyle::Cross;

    pub fn add(&mut self, point: Point3) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn on(&mut self) {
        self.visible = true;
    }

    pub fn off(&mut self) {
        self.visible = false;
    }
}

/// 单个视图的追踪器集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSet {
    pub grid: GridTracker,
    pub marker: SnapMarker,
    pub ext_line: LineTracker,
    pub ext_line2: LineTracker,
    pub radius: RadiusTracker,
    pub dim1: DimTracker,
    pub dim2: DimTracker,
    pub track_line: LineTracker,
    pub hold: HoldTracker,
}

impl TrackerSet {
    pub fn new(config: &SnapConfig) -> Self {
        Self {
            grid: GridTracker::new(config),
            marker: SnapMarker::default(),
            ext_line: LineTracker::new(true),
            ext_line2: LineTracker::new(true),
            radius: RadiusTracker::default(),
            dim1: DimTracker::new(DimMode::Horizontal),
            dim2: DimTracker::new(DimMode::Vertical),
            track_line: LineTracker::new(false),
            hold: HoldTracker::default(),
        }
    }

    /// 隐藏查询过程中的临时追踪器
    pub fn hide_transient(&mut self) {
        self.marker.off();
        self.ext_line.off();
        self.ext_line2.off();
        self.track_line.off();
        self.dim1.off();
        self.dim2.off();
    }
}

/// 视图 → 追踪器集合
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    sets: HashMap<ViewId, TrackerSet>,
    active: Option<ViewId>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换到视图，首次出现时创建追踪器集合
    pub fn activate(&mut self, view: ViewId, config: &SnapConfig) -> &mut TrackerSet {
        self.active = Some(view);
        self.sets.entry(view).or_insert_with(|| {
            debug!("Creating trackers for view {}", view);
            TrackerSet::new(config)
        })
    }

    pub fn active_id(&self) -> Option<ViewId> {
        self.active
    }

    pub fn active(&self) -> Option<&TrackerSet> {
        self.active.and_then(|id| self.sets.get(&id))
    }

    pub fn active_mut(&mut self) -> Option<&mut TrackerSet> {
        match self.active {
            Some(id) => self.sets.get_mut(&id),
            None => None,
        }
    }

    pub fn get(&self, view: ViewId) -> Option<&TrackerSet> {
        self.sets.get(&view)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackerSet> {
        self.sets.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// 近期捕捉对象（环形缓冲，最近的在末尾）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentObjects {
    items: VecDeque<ObjectId>,
}

impl RecentObjects {
    pub const CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// 记录对象；已存在时移到末尾
    pub fn touch(&mut self, id: ObjectId) {
        if let Some(pos) = self.items.iter().position(|o| *o == id) {
            self.items.remove(pos);
        }
        self.items.push_back(id);
        while self.items.len() > Self::CAPACITY {
            self.items.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.items.iter()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.items.contains(id)
    }

    pub fn last(&self) -> Option<&ObjectId> {
        self.items.back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    #[test]
    fn test_recent_objects_ring_buffer() {
        let mut recent = RecentObjects::new();
        for i in 0..12 {
            recent.touch(ObjectId::new(format!("obj{}", i)));
            assert!(recent.len() <= RecentObjects::CAPACITY);
        }
        assert_eq!(recent.len(), 8);
        assert!(!recent.contains(&ObjectId::new("obj3")));
        assert!(recent.contains(&ObjectId::new("obj4")));

        recent.touch(ObjectId::new("obj5"));
        assert_eq!(recent.len(), 8);
        assert_eq!(recent.last(), Some(&ObjectId::new("obj5")));
        assert_eq!(recent.iter().filter(|o| o.as_str() == "obj5").count(), 1);
    }

    #[test]
    fn test_view_registry_reuses_sets() {
        let config = SnapConfig::default();
        let mut views = ViewRegistry::new();
        views.activate(1, &config).marker.show_at(Point3::origin(), MarkerStyle::Cross);
        views.activate(2, &config);
        assert_eq!(views.len(), 2);
        assert_eq!(views.active_id(), Some(2));
        assert!(!views.active().unwrap().marker.visible);

        let set = views.activate(1, &config);
        assert!(set.marker.visible);
        assert_eq!(views.len(), 2);
    }

    #[test]
    fn test_grid_closest_node() {
        let mut config = SnapConfig::default();
        config.grid_spacing = 0.5;
        config.grid_size = 4;
        let mut grid = GridTracker::new(&config);
        grid.set(&WorkingPlane::default());

        let node = grid.closest_node(&Point3::new(1.2, -0.8, 0.3)).unwrap();
        assert!((node - Point3::new(1.0, -1.0, 0.0)).norm() < EPSILON);
        assert!(grid.closest_node(&Point3::new(10.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_dim_tracker_distances() {
        let wp = WorkingPlane::default();
        let mut h = DimTracker::new(DimMode::Horizontal);
        let mut v = DimTracker::new(DimMode::Vertical);
        h.update(Point3::origin(), Point3::new(3.0, -4.0, 0.0), &wp);
        v.update(Point3::origin(), Point3::new(3.0, -4.0, 0.0), &wp);
        assert!((h.distance - 3.0).abs() < EPSILON);
        assert!((v.distance - 4.0).abs() < EPSILON);
    }
}
