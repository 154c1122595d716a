//! ZSnap 交互式点捕捉引擎
//!
//! 根据光标位置、光标下的对象与会话状态计算绘图命令使用的点。
//!
//! # 架构设计
//!
//! - `geometry` / `intersect`：曲线、曲面与交点计算
//! - `generators`：按捕捉类型生成候选点
//! - `resolve`：候选点裁决
//! - `snapper`：一次捕捉查询的完整流程与会话状态
//! - `interaction`：取点请求的状态机
//! - `host`：宿主需要实现的视图、文档、参数与事件接口
//!
//! # 示例
//!
//! ```rust
//! use zsnap_core::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene.add(SnapObject::new(
//!     "line",
//!     GeometryKind::Part {
//!         shape: Shape::polyline(&[Point3::origin(), Point3::new(10.0, 0.0, 0.0)], false),
//!     },
//! ));
//! let view = OrthoView::new(&scene, 1, 800.0, 600.0)
//!     .with_center(Point3::new(5.0, 0.0, 0.0))
//!     .with_zoom(10.0);
//! let plane = WorkingPlane::default();
//! let ctx = SnapContext::new(&view, &scene, &plane);
//!
//! let mut snapper = Snapper::new(Box::new(MemoryParams::default()));
//! let p = snapper.snap(&ctx, ScreenPos::new(400.0, 299.0), None, true, false, false);
//! assert_eq!(p, Some(Point3::new(5.0, 0.0, 0.0)));
//! ```

pub mod error;
pub mod generators;
pub mod geometry;
pub mod host;
pub mod interaction;
pub mod intersect;
pub mod math;
pub mod object;
pub mod plane;
pub mod resolve;
pub mod scene;
pub mod session;
pub mod snap;
pub mod snapper;
pub mod spatial;
pub mod view;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::error::{GeometryError, HookError, ParamError};
    pub use crate::geometry::{Circle, Curve, Edge, Ellipse, Face, Line, Shape, Surface};
    pub use crate::host::{
        Component, Document, EventHooks, EventKind, HookId, MemoryParams, ParamStore, ParamValue,
        PickInfo, ScreenPos, ViewId, Viewport,
    };
    pub use crate::interaction::{
        CoordinateInput, InputMode, Modifiers, MouseButton, PointInput, PointOutcome, PointRequest,
    };
    pub use crate::math::{BoundingBox3, Isometry3, Point3, Vector3};
    pub use crate::object::{GeometryKind, ObjectId, SnapObject};
    pub use crate::plane::{Axis, AxisSpec, WorkingPlane};
    pub use crate::scene::Scene;
    pub use crate::snap::{MarkerStyle, SnapCandidate, SnapConfig, SnapKind, SnapMask};
    pub use crate::snapper::{SnapContext, Snapper};
    pub use crate::view::OrthoView;
}
