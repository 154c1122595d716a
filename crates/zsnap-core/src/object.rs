//! 可捕捉对象
//!
//! 宿主文档中的对象按几何类别封闭枚举，每个变体只携带其捕捉生成器需要的数据。

use crate::geometry::{Edge, Shape};
use crate::math::{BoundingBox3, Isometry3, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 对象标识（文档内唯一名称）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 几何类别
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryKind {
    /// 普通零件形体
    Part { shape: Shape },
    /// 正多边形
    Polygon { shape: Shape },
    /// 墙：base 为基线形体，additions 为附加墙的基线形体
    Wall {
        shape: Shape,
        base: Option<Shape>,
        #[serde(default)]
        additions: Vec<Shape>,
    },
    /// 结构件：nodes 为显示中的节点边
    Structure {
        shape: Shape,
        base: Option<Shape>,
        nodes: Option<Vec<Edge>>,
    },
    /// 建筑部件（形体可能为空）
    BuildingPart { shape: Shape },
    /// 工作平面代理
    WorkingPlaneProxy,
    /// 剖切平面
    SectionPlane { shape: Shape },
    /// 线性/角度标注，p2 与 p3 为两个定义点
    Dimension { p2: Point3, p3: Point3 },
    /// 轴网
    Axis { edges: Vec<Edge> },
    /// 网格
    Mesh { points: Vec<Point3> },
    /// 点云（点数可能极大，只使用拾取点）
    PointCloud,
    /// 图像平面，不参与捕捉
    Image,
}

impl GeometryKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            GeometryKind::Part { .. } => "Part",
            GeometryKind::Polygon { .. } => "Polygon",
            GeometryKind::Wall { .. } => "Wall",
            GeometryKind::Structure { .. } => "Structure",
            GeometryKind::BuildingPart { .. } => "BuildingPart",
            GeometryKind::WorkingPlaneProxy => "WorkingPlaneProxy",
            GeometryKind::SectionPlane { .. } => "SectionPlane",
            GeometryKind::Dimension { .. } => "Dimension",
            GeometryKind::Axis { .. } => "Axis",
            GeometryKind::Mesh { .. } => "Mesh",
            GeometryKind::PointCloud => "PointCloud",
            GeometryKind::Image => "Image",
        }
    }

    /// 不可捕捉的类别
    pub fn is_unsnappable(&self) -> bool {
        matches!(self, GeometryKind::Image)
    }

    /// 零件形体（非空时）
    pub fn shape(&self) -> Option<&Shape> {
        let shape = match self {
            GeometryKind::Part { shape }
            | GeometryKind::Polygon { shape }
            | GeometryKind::Wall { shape, .. }
            | GeometryKind::Structure { shape, .. }
            | GeometryKind::BuildingPart { shape }
            | GeometryKind::SectionPlane { shape } => shape,
            _ => return None,
        };
        (!shape.is_null()).then_some(shape)
    }
}

/// 可捕捉对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapObject {
    pub id: ObjectId,
    pub kind: GeometryKind,
    /// 放置（位姿）；形体坐标已是全局坐标，仅 snap_points 与原点使用它
    #[serde(default = "Isometry3::identity")]
    pub placement: Isometry3,
    #[serde(default = "default_selectable")]
    pub selectable: bool,
    /// 作者定义的捕捉点（局部坐标）
    #[serde(default)]
    pub snap_points: Vec<Point3>,
}

fn default_selectable() -> bool {
    true
}

impl SnapObject {
    pub fn new(id: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            id: ObjectId::new(id),
            kind,
            placement: Isometry3::identity(),
            selectable: true,
            snap_points: Vec::new(),
        }
    }

    pub fn with_placement(mut self, placement: Isometry3) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_snap_points(mut self, points: Vec<Point3>) -> Self {
        self.snap_points = points;
        self
    }

    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// 放置原点
    pub fn placement_base(&self) -> Point3 {
        Point3::from(self.placement.translation.vector)
    }

    /// 参与交点/延长线计算的边
    pub fn edges(&self) -> Vec<&Edge> {
        match &self.kind {
            GeometryKind::Axis { edges } => edges.iter().collect(),
            kind => kind.shape().map(|s| s.edges.iter().collect()).unwrap_or_default(),
        }
    }

    /// 延长线/平行捕捉使用的边；墙的基线优先
    pub fn extension_edges(&self) -> Vec<&Edge> {
        match &self.kind {
            GeometryKind::Wall { shape, base, additions } => base
                .iter()
                .chain(additions.iter())
                .flat_map(|s| s.edges.iter())
                .chain(shape.edges.iter())
                .collect(),
            _ => self.edges(),
        }
    }

    /// 包围盒（用于空间索引）
    pub fn bounding_box(&self) -> BoundingBox3 {
        let mut bbox = match &self.kind {
            GeometryKind::Axis { edges } => {
                let mut b = BoundingBox3::empty();
                for e in edges {
                    b.merge(&e.bounding_box());
                }
                b
            }
            GeometryKind::Dimension { p2, p3 } => BoundingBox3::from_points([*p2, *p3]),
            GeometryKind::Mesh { points } => BoundingBox3::from_points(points.iter().copied()),
            kind => kind.shape().map(Shape::bounding_box).unwrap_or_else(BoundingBox3::empty),
        };
        if bbox.is_empty() {
            let base = self.placement_base();
            bbox = BoundingBox3::new(base, base);
        }
        bbox
    }
}
