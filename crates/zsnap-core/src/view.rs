//! 俯视正交视图
//!
//! `Viewport` 的参考实现：视线沿 -Z，屏幕 Y 轴向下。

use crate::host::{PickInfo, ScreenPos, ViewId, Viewport};
use crate::math::{Point3, Vector3};
use crate::scene::Scene;

/// 默认拾取容差（屏幕像素）
pub const DEFAULT_PICK_RADIUS: f64 = 5.0;

/// 俯视正交视图
#[derive(Debug, Clone)]
pub struct OrthoView<'s> {
    scene: &'s Scene,
    id: ViewId,
    /// 视图中心对应的世界坐标
    pub camera_center: Point3,
    /// 每世界单位的像素数
    pub camera_zoom: f64,
    pub width: f64,
    pub height: f64,
    /// 拾取容差（屏幕像素）
    pub pick_radius: f64,
}

impl<'s> OrthoView<'s> {
    pub fn new(scene: &'s Scene, id: ViewId, width: f64, height: f64) -> Self {
        Self {
            scene,
            id,
            camera_center: Point3::origin(),
            camera_zoom: 1.0,
            width,
            height,
            pick_radius: DEFAULT_PICK_RADIUS,
        }
    }

    pub fn with_center(mut self, center: Point3) -> Self {
        self.camera_center = center;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.camera_zoom = zoom;
        self
    }

    pub fn with_pick_radius(mut self, pixels: f64) -> Self {
        self.pick_radius = pixels;
        self
    }

    /// 缩放到显示全部对象
    pub fn zoom_to_fit(&mut self) {
        let Some(bounds) = self.scene.bounds() else {
            return;
        };
        self.camera_center = Point3::new(
            (bounds.min.x + bounds.max.x) / 2.0,
            (bounds.min.y + bounds.max.y) / 2.0,
            0.0,
        );

        let width = bounds.max.x - bounds.min.x;
        let height = bounds.max.y - bounds.min.y;
        let zoom_x = (self.width - 100.0) / width.max(1.0);
        let zoom_y = (self.height - 100.0) / height.max(1.0);
        self.camera_zoom = zoom_x.min(zoom_y).clamp(0.01, 100.0);
    }
}

impl Viewport for OrthoView<'_> {
    fn id(&self) -> ViewId {
        self.id
    }

    fn screen_to_world(&self, pos: ScreenPos) -> Point3 {
        let x = self.camera_center.x + (pos.x - self.width / 2.0) / self.camera_zoom;
        let y = self.camera_center.y - (pos.y - self.height / 2.0) / self.camera_zoom; // Y轴翻转
        Point3::new(x, y, 0.0)
    }

    fn world_to_screen(&self, point: &Point3) -> ScreenPos {
        let x = self.width / 2.0 + (point.x - self.camera_center.x) * self.camera_zoom;
        let y = self.height / 2.0 - (point.y - self.camera_center.y) * self.camera_zoom; // Y轴翻转
        ScreenPos::new(x, y)
    }

    fn objects_under_cursor(&self, pos: ScreenPos) -> Vec<PickInfo> {
        self.scene
            .pick(&self.screen_to_world(pos), self.pick_radius / self.camera_zoom)
    }

    fn view_direction(&self) -> Vector3 {
        -Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::object::{GeometryKind, SnapObject};

    #[test]
    fn test_screen_world_round_trip() {
        let scene = Scene::new();
        let view = OrthoView::new(&scene, 1, 800.0, 600.0)
            .with_center(Point3::new(5.0, 0.0, 0.0))
            .with_zoom(10.0);

        let p = view.screen_to_world(ScreenPos::new(400.0, 299.0));
        assert!((p - Point3::new(5.0, 0.1, 0.0)).norm() < 1e-12);
        let s = view.world_to_screen(&Point3::new(10.0, 0.0, 0.0));
        assert_eq!(s, ScreenPos::new(450.0, 300.0));
        assert!((view.pixel_to_world_distance(8.0, s) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_to_fit() {
        let scene = Scene::from_objects([SnapObject::new(
            "line",
            GeometryKind::Part {
                shape: Shape::polyline(&[Point3::new(-10.0, 0.0, 0.0), Point3::new(10.0, 2.0, 0.0)], false),
            },
        )]);
        let mut view = OrthoView::new(&scene, 1, 500.0, 300.0);
        view.zoom_to_fit();
        assert!((view.camera_center - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((view.camera_zoom - 20.0).abs() < 1e-12);
        assert_eq!(view.objects_under_cursor(ScreenPos::new(50.0, 170.0)).len(), 1);
    }
}
