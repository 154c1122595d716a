//! 取点交互
//!
//! 命令通过 `get_point` 请求一个点，控制器注册鼠标移动与按键回调，
//! 光标移动时持续捕捉，左键或坐标输入时交付结果：
//!
//! `Idle → Listening → (Accepted | Cancelled) → Idle`

use crate::host::{EventHooks, EventKind, HookId, PickInfo, ScreenPos};
use crate::math::Point3;
use crate::object::ObjectId;
use crate::snapper::{SnapContext, Snapper};
use tracing::{debug, trace};

/// 取点模式（宿主据此显示不同的输入面板）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Point,
    Line,
    Wire,
}

/// 取点结果
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome {
    Accepted {
        point: Point3,
        /// 捕捉到的对象
        object: Option<ObjectId>,
    },
    Cancelled,
}

type AcceptCallback = Box<dyn FnOnce(PointOutcome)>;
type MoveCallback = Box<dyn FnMut(Option<Point3>, Option<&PickInfo>)>;

/// 取点请求
pub struct PointRequest {
    on_accept: AcceptCallback,
    on_move: Option<MoveCallback>,
    last: Option<Point3>,
    mode: InputMode,
    title: String,
}

impl PointRequest {
    pub fn new(on_accept: impl FnOnce(PointOutcome) + 'static) -> Self {
        Self {
            on_accept: Box::new(on_accept),
            on_move: None,
            last: None,
            mode: InputMode::Point,
            title: "Pick a point".to_string(),
        }
    }

    /// 光标移动时的回调，参数为捕捉点与拾取信息
    pub fn on_move(mut self, f: impl FnMut(Option<Point3>, Option<&PickInfo>) + 'static) -> Self {
        self.on_move = Some(Box::new(f));
        self
    }

    /// 上一个点（垂足、极轴、相对坐标的参考）
    pub fn with_last(mut self, last: Point3) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn last(&self) -> Option<Point3> {
        self.last
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// 鼠标按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// 修饰键：Ctrl 启用主动捕捉，Shift 约束到轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

/// 键盘输入的坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateInput {
    pub point: Point3,
    /// 相对于上一个点
    pub relative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Listening,
}

/// 取点控制器
pub struct PointInput {
    state: InteractionState,
    request: Option<PointRequest>,
    move_hook: Option<HookId>,
    click_hook: Option<HookId>,
    current: Option<Point3>,
    current_object: Option<ObjectId>,
    /// 关闭时忽略鼠标移动（只接受坐标输入）
    pub mouse_enabled: bool,
}

impl Default for PointInput {
    fn default() -> Self {
        Self::new()
    }
}

impl PointInput {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
            request: None,
            move_hook: None,
            click_hook: None,
            current: None,
            current_object: None,
            mouse_enabled: true,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == InteractionState::Listening
    }

    /// 当前捕捉点
    pub fn current_point(&self) -> Option<Point3> {
        self.current
    }

    pub fn request(&self) -> Option<&PointRequest> {
        self.request.as_ref()
    }

    /// 开始取点；已有的回调先被移除，未完成的请求直接丢弃
    pub fn get_point(&mut self, snapper: &mut Snapper, hooks: &mut dyn EventHooks, request: PointRequest) {
        self.remove_hooks(hooks);
        if self.request.is_some() {
            debug!("Dropping pending point request");
        }
        snapper.clear_hold_points();

        self.current = None;
        self.current_object = None;
        self.move_hook = Some(hooks.add_hook(EventKind::MouseMove));
        self.click_hook = Some(hooks.add_hook(EventKind::MouseButton));
        debug!("{} ({:?} mode)", request.title, request.mode);
        self.request = Some(request);
        self.state = InteractionState::Listening;
    }

    /// 光标移动：捕捉并通知请求方
    pub fn on_mouse_move(
        &mut self,
        snapper: &mut Snapper,
        ctx: &SnapContext<'_>,
        pos: ScreenPos,
        modifiers: Modifiers,
    ) {
        if !self.is_listening() || !self.mouse_enabled {
            return;
        }
        let Some(request) = self.request.as_mut() else {
            return;
        };
        self.current = snapper.snap(ctx, pos, request.last, modifiers.ctrl, modifiers.shift, false);
        self.current_object = self
            .current
            .and_then(|_| snapper.snap_info().map(|info| info.object.clone()));
        if let Some(on_move) = request.on_move.as_mut() {
            on_move(self.current, snapper.snap_info());
        }
    }

    /// 鼠标按键：左键按下时交付当前点；返回请求是否已完成
    ///
    /// 尚未移动过光标时先在点击位置捕捉。
    pub fn on_mouse_click(
        &mut self,
        snapper: &mut Snapper,
        hooks: &mut dyn EventHooks,
        ctx: &SnapContext<'_>,
        pos: ScreenPos,
        button: MouseButton,
        modifiers: Modifiers,
    ) -> bool {
        if !self.is_listening() || button != MouseButton::Left {
            return false;
        }
        if self.current.is_none() {
            let last = self.request.as_ref().and_then(PointRequest::last);
            self.current = snapper.snap(ctx, pos, last, modifiers.ctrl, modifiers.shift, false);
            self.current_object = snapper.snap_info().map(|info| info.object.clone());
        }
        let Some(point) = self.current else {
            return false;
        };
        let object = self.current_object.take();
        self.finish(snapper, hooks, ctx.command_active, PointOutcome::Accepted { point, object });
        true
    }

    /// 键盘输入坐标：全局或工作平面坐标，绝对或相对于上一个点
    pub fn on_coordinate(
        &mut self,
        snapper: &mut Snapper,
        hooks: &mut dyn EventHooks,
        ctx: &SnapContext<'_>,
        input: CoordinateInput,
    ) -> bool {
        if !self.is_listening() {
            return false;
        }
        let plane = ctx.plane;
        let origin = if ctx.global_mode {
            Point3::origin()
        } else {
            plane.position
        };
        let reference = match self.request.as_ref().and_then(PointRequest::last) {
            Some(last) if input.relative => last,
            _ => origin,
        };
        let offset = if ctx.global_mode {
            input.point.coords
        } else {
            plane.local_vector_to_global(&input.point.coords)
        };
        let point = reference + offset;
        trace!("Typed coordinate resolved to {:?}", point);

        self.finish(
            snapper,
            hooks,
            ctx.command_active,
            PointOutcome::Accepted { point, object: None },
        );
        true
    }

    /// 取消取点
    pub fn cancel(&mut self, snapper: &mut Snapper, hooks: &mut dyn EventHooks, command_active: bool) {
        if !self.is_listening() {
            return;
        }
        self.finish(snapper, hooks, command_active, PointOutcome::Cancelled);
    }

    fn finish(
        &mut self,
        snapper: &mut Snapper,
        hooks: &mut dyn EventHooks,
        command_active: bool,
        outcome: PointOutcome,
    ) {
        self.remove_hooks(hooks);
        snapper.off(command_active);
        self.state = InteractionState::Idle;
        self.current = None;
        self.current_object = None;
        if let Some(request) = self.request.take() {
            (request.on_accept)(outcome);
        }
    }

    fn remove_hooks(&mut self, hooks: &mut dyn EventHooks) {
        for id in [self.move_hook.take(), self.click_hook.take()].into_iter().flatten() {
            if let Err(e) = hooks.remove_hook(id) {
                debug!("Ignoring hook {:?} removal failure: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::geometry::Shape;
    use crate::host::MemoryParams;
    use crate::object::{GeometryKind, SnapObject};
    use crate::plane::WorkingPlane;
    use crate::scene::Scene;
    use crate::view::OrthoView;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    /// 记录已注册回调的视图
    #[derive(Default)]
    struct TestHooks {
        next: u64,
        active: HashSet<HookId>,
        closed: bool,
    }

    impl EventHooks for TestHooks {
        fn add_hook(&mut self, _kind: EventKind) -> HookId {
            self.next += 1;
            let id = HookId(self.next);
            self.active.insert(id);
            id
        }

        fn remove_hook(&mut self, id: HookId) -> Result<(), HookError> {
            if self.closed {
                return Err(HookError::ViewClosed);
            }
            if self.active.remove(&id) {
                Ok(())
            } else {
                Err(HookError::UnknownHook(id.0))
            }
        }
    }

    fn line_scene() -> Scene {
        Scene::from_objects([SnapObject::new(
            "line",
            GeometryKind::Part {
                shape: Shape::polyline(&[Point3::origin(), Point3::new(10.0, 0.0, 0.0)], false),
            },
        )])
    }

    fn recorder() -> (Rc<RefCell<Vec<PointOutcome>>>, PointRequest) {
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&outcomes);
        let request = PointRequest::new(move |o| sink.borrow_mut().push(o));
        (outcomes, request)
    }

    fn snapper() -> Snapper {
        Snapper::new(Box::new(MemoryParams::default()))
    }

    #[test]
    fn test_get_point_twice_registers_one_pair() {
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();

        input.get_point(&mut s, &mut hooks, PointRequest::new(|_| {}));
        input.get_point(&mut s, &mut hooks, PointRequest::new(|_| {}));
        assert_eq!(hooks.active.len(), 2);
        assert!(input.is_listening());
    }

    #[test]
    fn test_move_then_click_accepts_snapped_point() {
        let scene = line_scene();
        let view = OrthoView::new(&scene, 1, 800.0, 600.0)
            .with_center(Point3::new(5.0, 0.0, 0.0))
            .with_zoom(10.0);
        let wp = WorkingPlane::default();
        let ctx = SnapContext::new(&view, &scene, &wp);
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();

        let moves = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&moves);
        let (outcomes, request) = recorder();
        let request = request.on_move(move |p, info| {
            assert!(p.is_some());
            assert!(info.is_some());
            *counter.borrow_mut() += 1;
        });
        input.get_point(&mut s, &mut hooks, request);

        let pos = ScreenPos::new(400.0, 299.0);
        input.on_mouse_move(&mut s, &ctx, pos, Modifiers::default());
        assert_eq!(*moves.borrow(), 1);

        assert!(!input.on_mouse_click(&mut s, &mut hooks, &ctx, pos, MouseButton::Right, Modifiers::default()));
        assert!(input.on_mouse_click(&mut s, &mut hooks, &ctx, pos, MouseButton::Left, Modifiers::default()));

        assert_eq!(
            outcomes.borrow().as_slice(),
            &[PointOutcome::Accepted {
                point: Point3::new(5.0, 0.0, 0.0),
                object: Some(ObjectId::new("line")),
            }]
        );
        assert!(hooks.active.is_empty());
        assert_eq!(input.state(), InteractionState::Idle);
        assert!(s.recent_objects().is_empty());
    }

    #[test]
    fn test_failed_move_clears_point() {
        let scene = line_scene();
        let view = OrthoView::new(&scene, 1, 800.0, 600.0)
            .with_center(Point3::new(5.0, 0.0, 0.0))
            .with_zoom(10.0);
        let wp = WorkingPlane::default();
        let ctx = SnapContext::new(&view, &scene, &wp);
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();
        let (outcomes, request) = recorder();
        input.get_point(&mut s, &mut hooks, request);

        input.on_mouse_move(&mut s, &ctx, ScreenPos::new(400.0, 299.0), Modifiers::default());
        assert!(input.current_point().is_some());

        let bad = ScreenPos::new(f64::NAN, 299.0);
        input.on_mouse_move(&mut s, &ctx, bad, Modifiers::default());
        assert!(input.current_point().is_none());

        assert!(!input.on_mouse_click(&mut s, &mut hooks, &ctx, bad, MouseButton::Left, Modifiers::default()));
        assert!(outcomes.borrow().is_empty());
        assert!(input.is_listening());
    }

    #[test]
    fn test_click_without_move_snaps_at_click() {
        let scene = Scene::new();
        let view = OrthoView::new(&scene, 1, 800.0, 600.0).with_zoom(10.0);
        let wp = WorkingPlane::default();
        let ctx = SnapContext::new(&view, &scene, &wp).with_command_active(false);
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();

        let (outcomes, request) = recorder();
        input.get_point(&mut s, &mut hooks, request);
        input.on_mouse_click(
            &mut s,
            &mut hooks,
            &ctx,
            ScreenPos::new(420.0, 280.0),
            MouseButton::Left,
            Modifiers::default(),
        );
        match &outcomes.borrow()[0] {
            PointOutcome::Accepted { point, object } => {
                assert!((point - Point3::new(2.0, 2.0, 0.0)).norm() < 1e-9);
                assert!(object.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        };
    }

    #[test]
    fn test_cancel_tolerates_closed_view() {
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();
        let (outcomes, request) = recorder();
        input.get_point(&mut s, &mut hooks, request);

        hooks.closed = true;
        input.cancel(&mut s, &mut hooks, false);
        assert_eq!(outcomes.borrow().as_slice(), &[PointOutcome::Cancelled]);
        assert_eq!(input.state(), InteractionState::Idle);

        // 已结束的请求不会再次回调
        input.cancel(&mut s, &mut hooks, false);
        assert_eq!(outcomes.borrow().len(), 1);
    }

    #[test]
    fn test_typed_coordinates() {
        let scene = Scene::new();
        let view = OrthoView::new(&scene, 1, 800.0, 600.0);
        let wp = WorkingPlane::new(
            Point3::new(10.0, 0.0, 0.0),
            crate::math::Vector3::y(),
            -crate::math::Vector3::x(),
        );
        let mut hooks = TestHooks::default();
        let mut s = snapper();
        let mut input = PointInput::new();

        // 工作平面局部坐标，相对上一个点
        let ctx = SnapContext::new(&view, &scene, &wp);
        let (outcomes, request) = recorder();
        input.get_point(&mut s, &mut hooks, request.with_last(Point3::new(1.0, 1.0, 0.0)));
        input.on_coordinate(
            &mut s,
            &mut hooks,
            &ctx,
            CoordinateInput {
                point: Point3::new(2.0, 0.0, 0.0),
                relative: true,
            },
        );

        // 全局绝对坐标
        let ctx = SnapContext::new(&view, &scene, &wp).with_global_mode(true);
        let sink = Rc::clone(&outcomes);
        input.get_point(&mut s, &mut hooks, PointRequest::new(move |o| sink.borrow_mut().push(o)));
        input.on_coordinate(
            &mut s,
            &mut hooks,
            &ctx,
            CoordinateInput {
                point: Point3::new(2.0, 3.0, 0.0),
                relative: false,
            },
        );

        let outcomes = outcomes.borrow();
        assert_eq!(
            outcomes[0],
            PointOutcome::Accepted {
                point: Point3::new(1.0, 3.0, 0.0),
                object: None,
            }
        );
        assert_eq!(
            outcomes[1],
            PointOutcome::Accepted {
                point: Point3::new(2.0, 3.0, 0.0),
                object: None,
            }
        );
    }
}
