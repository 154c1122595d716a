//! 空间索引
//!
//! 按 XY 平面网格划分，用于光标拾取时快速筛选对象。

use crate::math::{BoundingBox3, Point3};
use crate::object::ObjectId;
use std::collections::{HashMap, HashSet};

/// 基于网格的空间索引
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// 网格单元大小
    cell_size: f64,

    /// 网格坐标 -> 对象列表
    grid: HashMap<(i64, i64), Vec<ObjectId>>,

    /// 包围盒缓存
    bboxes: HashMap<ObjectId, BoundingBox3>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            grid: HashMap::new(),
            bboxes: HashMap::new(),
        }
    }

    fn to_grid_coord(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// 包围盒覆盖的网格单元
    fn cells_for_bbox(&self, bbox: &BoundingBox3) -> Vec<(i64, i64)> {
        if bbox.is_empty() {
            return Vec::new();
        }
        let (min_gx, min_gy) = self.to_grid_coord(bbox.min.x, bbox.min.y);
        let (max_gx, max_gy) = self.to_grid_coord(bbox.max.x, bbox.max.y);

        let mut cells = Vec::new();
        for gx in min_gx..=max_gx {
            for gy in min_gy..=max_gy {
                cells.push((gx, gy));
            }
        }
        cells
    }

    /// 插入对象（已存在时替换）
    pub fn insert(&mut self, id: ObjectId, bbox: BoundingBox3) {
        self.remove(&id);

        for cell in self.cells_for_bbox(&bbox) {
            self.grid.entry(cell).or_default().push(id.clone());
        }
        self.bboxes.insert(id, bbox);
    }

    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let Some(bbox) = self.bboxes.remove(id) else {
            return false;
        };
        for cell in self.cells_for_bbox(&bbox) {
            if let Some(ids) = self.grid.get_mut(&cell) {
                ids.retain(|e| e != id);
            }
        }
        true
    }

    /// 与矩形（XY）相交的对象
    pub fn query_rect(&self, rect: &BoundingBox3) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for cell in self.cells_for_bbox(rect) {
            let Some(ids) = self.grid.get(&cell) else {
                continue;
            };
            for id in ids {
                if !seen.insert(id) {
                    continue;
                }
                if self.bboxes.get(id).is_some_and(|b| b.intersects_xy(rect)) {
                    result.push(id.clone());
                }
            }
        }
        result
    }

    /// 距离点 `tolerance` 以内的对象
    pub fn query_around(&self, point: &Point3, tolerance: f64) -> Vec<ObjectId> {
        self.query_rect(&BoundingBox3::new(*point, *point).inflated(tolerance))
    }

    pub fn clear(&mut self) {
        self.grid.clear();
        self.bboxes.clear();
    }

    pub fn len(&self) -> usize {
        self.bboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty()
    }
}
