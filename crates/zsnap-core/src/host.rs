//! 宿主接口
//!
//! 捕捉引擎不拥有视图、文档和参数，这些都由宿主程序提供：
//! - `Viewport`：屏幕/世界坐标换算与拾取
//! - `Document`：按 ID 解析对象
//! - `ParamStore`：持久化用户偏好
//! - `EventHooks`：视图鼠标事件回调的注册与注销

use crate::error::{HookError, ParamError};
use crate::math::{Point3, Vector3};
use crate::object::{ObjectId, SnapObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 视图标识
pub type ViewId = u64;

/// 屏幕坐标（像素）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 坐标是否为有限值
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// 水平偏移 `dx` 像素后的位置
    pub fn offset_x(&self, dx: f64) -> Self {
        Self::new(self.x + dx, self.y)
    }

    pub fn distance(&self, other: &ScreenPos) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for ScreenPos {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// 拾取到的子元素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Edge(usize),
    Face(usize),
    Vertex(usize),
    /// 对象整体（无子元素信息）
    Whole,
}

/// 光标下的拾取结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickInfo {
    pub object: ObjectId,
    pub component: Component,
    /// 宿主报告的精确拾取点
    pub point: Point3,
}

/// 三维视图
pub trait Viewport {
    fn id(&self) -> ViewId;

    /// 屏幕点对应的世界坐标（位于视图焦平面上）
    fn screen_to_world(&self, pos: ScreenPos) -> Point3;

    /// 世界点在屏幕上的位置
    fn world_to_screen(&self, point: &Point3) -> ScreenPos;

    /// 光标下的对象，按深度由近到远排列
    fn objects_under_cursor(&self, pos: ScreenPos) -> Vec<PickInfo>;

    /// 视线方向
    fn view_direction(&self) -> Vector3;

    /// 透视相机位置；正交相机返回 None
    fn camera_position(&self) -> Option<Point3> {
        None
    }

    /// 在光标处把屏幕像素距离换算为世界距离
    fn pixel_to_world_distance(&self, pixels: f64, at: ScreenPos) -> f64 {
        let p1 = self.screen_to_world(at);
        let p2 = self.screen_to_world(at.offset_x(pixels));
        (p2 - p1).norm()
    }
}

/// 文档
pub trait Document {
    fn object(&self, id: &ObjectId) -> Option<&SnapObject>;
}

/// 参数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// 参数存储
pub trait ParamStore {
    fn get(&self, name: &str) -> Option<ParamValue>;

    fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError>;
}

/// 内存参数存储
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryParams {
    values: BTreeMap<String, ParamValue>,
}

impl MemoryParams {
    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }
}

impl ParamStore for MemoryParams {
    fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        self.insert(name, value);
        Ok(())
    }
}

/// 视图事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseMove,
    MouseButton,
}

/// 事件回调句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

/// 视图事件回调注册表
pub trait EventHooks {
    fn add_hook(&mut self, kind: EventKind) -> HookId;

    fn remove_hook(&mut self, id: HookId) -> Result<(), HookError>;
}
