//! 会话回放
//!
//! 从 JSON 读取场景与光标事件，驱动取点控制器并收集交付的点。

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, info, warn};
use zsnap_core::prelude::*;

/// 回放会话
#[derive(Debug, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub plane: WorkingPlane,
    /// 是否模拟绘图命令执行中（影响网格显示）
    #[serde(default = "default_true")]
    pub command_active: bool,
    #[serde(default)]
    pub objects: Vec<SnapObject>,
    pub events: Vec<Event>,
}

fn default_true() -> bool {
    true
}

/// 视图设置；未给出中心或缩放时缩放到全部对象
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub width: f64,
    pub height: f64,
    pub center: Option<Point3>,
    pub zoom: Option<f64>,
    pub pick_radius: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            center: None,
            zoom: None,
            pick_radius: 5.0,
        }
    }
}

/// 输入事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// 显式开始取点
    Request {
        #[serde(default)]
        last: Option<Point3>,
        #[serde(default)]
        title: Option<String>,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        shift: bool,
    },
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        shift: bool,
    },
    Coordinate {
        point: Point3,
        #[serde(default)]
        relative: bool,
        #[serde(default)]
        global: bool,
    },
    Cancel,
    /// 把当前捕捉点加入保持点
    Hold,
    /// 切换到光标下的下一个对象
    CycleObject,
    Toggle {
        kind: SnapKind,
        #[serde(default)]
        enabled: Option<bool>,
    },
}

/// 一次取点的结果；`point` 为 None 表示取消
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayResult {
    pub event: usize,
    pub point: Option<Point3>,
    pub object: Option<ObjectId>,
}

/// 回放用的回调注册表
#[derive(Debug, Default)]
struct ReplayHooks {
    next: u64,
    active: HashSet<HookId>,
}

impl EventHooks for ReplayHooks {
    fn add_hook(&mut self, kind: EventKind) -> HookId {
        self.next += 1;
        let id = HookId(self.next);
        self.active.insert(id);
        debug!("Registered {:?} hook {}", kind, id.0);
        id
    }

    fn remove_hook(&mut self, id: HookId) -> Result<(), HookError> {
        if self.active.remove(&id) {
            Ok(())
        } else {
            Err(HookError::UnknownHook(id.0))
        }
    }
}

/// 回放全部事件
///
/// 未显式请求时，鼠标与坐标事件会以上一个交付点为参考自动开始取点。
pub fn replay(session: Session, params: Box<dyn ParamStore>) -> Vec<ReplayResult> {
    let scene = Scene::from_objects(session.objects);
    let settings = &session.view;
    let mut view = OrthoView::new(&scene, 1, settings.width, settings.height)
        .with_pick_radius(settings.pick_radius);
    match (settings.center, settings.zoom) {
        (Some(center), Some(zoom)) => view = view.with_center(center).with_zoom(zoom),
        _ => view.zoom_to_fit(),
    }
    info!(
        "Replaying {} events over {} objects (zoom {:.3})",
        session.events.len(),
        scene.len(),
        view.camera_zoom
    );

    let mut snapper = Snapper::new(params);
    let mut hooks = ReplayHooks::default();
    let mut input = PointInput::new();
    let outcomes: Rc<RefCell<Vec<PointOutcome>>> = Rc::default();
    let mut results = Vec::new();
    let mut last_accepted: Option<Point3> = None;

    for (i, event) in session.events.into_iter().enumerate() {
        let ctx = SnapContext::new(&view, &scene, &session.plane)
            .with_command_active(session.command_active);

        let needs_request = matches!(
            event,
            Event::Move { .. } | Event::Click { .. } | Event::Coordinate { .. }
        );
        if needs_request && !input.is_listening() {
            let request = point_request(&outcomes, last_accepted, None);
            input.get_point(&mut snapper, &mut hooks, request);
        }

        match event {
            Event::Request { last, title } => {
                let request = point_request(&outcomes, last.or(last_accepted), title);
                input.get_point(&mut snapper, &mut hooks, request);
            }
            Event::Move { x, y, ctrl, shift } => {
                input.on_mouse_move(&mut snapper, &ctx, ScreenPos::new(x, y), Modifiers { ctrl, shift });
                debug!(
                    "Move ({}, {}) -> {:?} {:?}",
                    x,
                    y,
                    input.current_point(),
                    snapper.cursor().map(SnapKind::name)
                );
            }
            Event::Click { x, y, ctrl, shift } => {
                let pos = ScreenPos::new(x, y);
                let modifiers = Modifiers { ctrl, shift };
                if !input.on_mouse_click(&mut snapper, &mut hooks, &ctx, pos, MouseButton::Left, modifiers) {
                    warn!("Click at ({}, {}) produced no point", x, y);
                }
            }
            Event::Coordinate { point, relative, global } => {
                let ctx = ctx.with_global_mode(global);
                input.on_coordinate(&mut snapper, &mut hooks, &ctx, CoordinateInput { point, relative });
            }
            Event::Cancel => input.cancel(&mut snapper, &mut hooks, session.command_active),
            Event::Hold => snapper.add_hold_point(),
            Event::CycleObject => snapper.cycle_snap_object(),
            Event::Toggle { kind, enabled } => {
                let state = snapper.toggle_snap(kind, enabled);
                info!("{} snap {}", kind.name(), if state { "on" } else { "off" });
            }
        }

        for outcome in outcomes.borrow_mut().drain(..) {
            let result = match outcome {
                PointOutcome::Accepted { point, object } => {
                    info!("Point {:?} accepted (object {:?})", point, object.as_ref().map(ObjectId::as_str));
                    last_accepted = Some(point);
                    ReplayResult {
                        event: i,
                        point: Some(point),
                        object,
                    }
                }
                PointOutcome::Cancelled => {
                    info!("Point request cancelled");
                    ReplayResult {
                        event: i,
                        point: None,
                        object: None,
                    }
                }
            };
            results.push(result);
        }
    }
    results
}

fn point_request(
    outcomes: &Rc<RefCell<Vec<PointOutcome>>>,
    last: Option<Point3>,
    title: Option<String>,
) -> PointRequest {
    let sink = Rc::clone(outcomes);
    let mut request = PointRequest::new(move |o| sink.borrow_mut().push(o));
    if let Some(last) = last {
        request = request.with_last(last).with_mode(InputMode::Wire);
    }
    if let Some(title) = title {
        request = request.with_title(title);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"{
        "view": {"center": [5.0, 0.0, 0.0], "zoom": 10.0},
        "command_active": false,
        "objects": [
            {
                "id": "line",
                "kind": {
                    "type": "Part",
                    "shape": {
                        "vertices": [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]],
                        "edges": [{"curve": {"Line": {"start": [0.0, 0.0, 0.0], "end": [10.0, 0.0, 0.0]}}}],
                        "faces": []
                    }
                }
            }
        ],
        "events": [
            {"type": "move", "x": 400.0, "y": 299.0},
            {"type": "click", "x": 400.0, "y": 299.0},
            {"type": "coordinate", "point": [0.0, 3.0, 0.0], "relative": true},
            {"type": "request"},
            {"type": "cancel"}
        ]
    }"#;

    #[test]
    fn test_replay_session() {
        let session: Session = serde_json::from_str(SESSION).expect("Invalid session");
        let results = replay(session, Box::new(MemoryParams::default()));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].point, Some(Point3::new(5.0, 0.0, 0.0)));
        assert_eq!(results[0].object, Some(ObjectId::new("line")));
        assert_eq!(results[1].point, Some(Point3::new(5.0, 3.0, 0.0)));
        assert_eq!(results[2], ReplayResult { event: 4, point: None, object: None });
    }

    #[test]
    fn test_view_defaults_zoom_to_fit() {
        let session: Session = serde_json::from_str(r#"{"events": []}"#).expect("Invalid session");
        assert!(session.view.center.is_none());
        assert!(session.command_active);
        assert!(replay(session, Box::new(MemoryParams::default())).is_empty());
    }
}
