//! 捕捉类型、捕捉掩码与候选点
//!
//! 支持的捕捉开关（顺序即持久化位串顺序）：
//! - 锁定 (Lock)：总开关，关闭时所有捕捉失效
//! - 最近点 (Near)：被动捕捉，优先级最低
//! - 延长线 (Extension) / 平行 (Parallel)
//! - 网格 (Grid)
//! - 端点 (Endpoint) / 中点 (Midpoint) / 垂足 (Perpendicular)
//! - 角度 (Angle) / 圆心 (Center) / 正交 (Ortho)
//! - 交点 (Intersection) / 特殊点 (Special)
//! - 尺寸提示 (Dimensions) / 投影到工作平面 (WorkingPlane)

use crate::host::{ParamStore, ParamValue};
use crate::math::Point3;
use serde::{Deserialize, Serialize};

/// 捕捉类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapKind {
    Lock,
    Near,
    Extension,
    Parallel,
    Grid,
    Endpoint,
    Midpoint,
    Perpendicular,
    Angle,
    Center,
    Ortho,
    Intersection,
    Special,
    Dimensions,
    WorkingPlane,
}

impl SnapKind {
    /// 全部捕捉类型，按持久化顺序排列
    pub const ALL: [SnapKind; 15] = [
        SnapKind::Lock,
        SnapKind::Near,
        SnapKind::Extension,
        SnapKind::Parallel,
        SnapKind::Grid,
        SnapKind::Endpoint,
        SnapKind::Midpoint,
        SnapKind::Perpendicular,
        SnapKind::Angle,
        SnapKind::Center,
        SnapKind::Ortho,
        SnapKind::Intersection,
        SnapKind::Special,
        SnapKind::Dimensions,
        SnapKind::WorkingPlane,
    ];

    /// 在持久化位串中的位置
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SnapKind::Lock => "Lock",
            SnapKind::Near => "Near",
            SnapKind::Extension => "Extension",
            SnapKind::Parallel => "Parallel",
            SnapKind::Grid => "Grid",
            SnapKind::Endpoint => "Endpoint",
            SnapKind::Midpoint => "Midpoint",
            SnapKind::Perpendicular => "Perpendicular",
            SnapKind::Angle => "Angle",
            SnapKind::Center => "Center",
            SnapKind::Ortho => "Ortho",
            SnapKind::Intersection => "Intersection",
            SnapKind::Special => "Special",
            SnapKind::Dimensions => "Dimensions",
            SnapKind::WorkingPlane => "WorkingPlane",
        }
    }

    /// 被动捕捉（最近点）
    pub fn is_passive(self) -> bool {
        self == SnapKind::Near
    }

    /// 光标尾部图标名；被动捕捉不带图标
    pub fn cursor_icon(self) -> Option<&'static str> {
        match self {
            SnapKind::Near | SnapKind::Lock | SnapKind::Dimensions | SnapKind::WorkingPlane => None,
            SnapKind::Extension => Some("Snap_Extension"),
            SnapKind::Parallel => Some("Snap_Parallel"),
            SnapKind::Grid => Some("Snap_Grid"),
            SnapKind::Endpoint => Some("Snap_Endpoint"),
            SnapKind::Midpoint => Some("Snap_Midpoint"),
            SnapKind::Perpendicular => Some("Snap_Perpendicular"),
            SnapKind::Angle => Some("Snap_Angle"),
            SnapKind::Center => Some("Snap_Center"),
            SnapKind::Ortho => Some("Snap_Ortho"),
            SnapKind::Intersection => Some("Snap_Intersection"),
            SnapKind::Special => Some("Snap_Special"),
        }
    }

    /// 捕捉标记样式
    pub fn marker(self, square_style: bool) -> MarkerStyle {
        use MarkerStyle::*;
        if square_style {
            match self {
                SnapKind::Near | SnapKind::Extension | SnapKind::Parallel => SquareLine,
                _ => SquareFilled,
            }
        } else {
            match self {
                SnapKind::Near | SnapKind::Extension | SnapKind::Parallel | SnapKind::Grid => CircleLine,
                SnapKind::Midpoint | SnapKind::Angle => DiamondFilled,
                _ => CircleFilled,
            }
        }
    }
}

/// 捕捉标记样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerStyle {
    SquareLine,
    SquareFilled,
    CircleLine,
    CircleFilled,
    DiamondFilled,
    /// 保持点标记
    Cross,
}

/// 捕捉掩码（位域，用于快速启用/禁用捕捉类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapMask {
    bits: u16,
}

impl SnapMask {
    pub const NONE: SnapMask = SnapMask { bits: 0 };
    pub const ALL: SnapMask = SnapMask { bits: (1 << 15) - 1 };

    /// 默认位串：除正交外全部开启
    pub const DEFAULT_BITSTRING: &'static str = "111111111101111";

    pub fn new(bits: u16) -> Self {
        Self { bits: bits & Self::ALL.bits }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    fn bit(kind: SnapKind) -> u16 {
        1 << kind.index()
    }

    /// 开关本身是否打开（不考虑 Lock）
    pub fn contains(&self, kind: SnapKind) -> bool {
        self.bits & Self::bit(kind) != 0
    }

    /// 捕捉是否生效：Lock 与该类型同时打开
    pub fn is_enabled(&self, kind: SnapKind) -> bool {
        self.contains(SnapKind::Lock) && self.contains(kind)
    }

    pub fn set(&mut self, kind: SnapKind, enabled: bool) {
        if enabled {
            self.bits |= Self::bit(kind);
        } else {
            self.bits &= !Self::bit(kind);
        }
    }

    pub fn toggle(&mut self, kind: SnapKind) {
        let enabled = self.contains(kind);
        self.set(kind, !enabled);
    }

    /// 解析持久化位串；缺失位视为关闭，非 `0`/`1` 字符返回 None
    pub fn from_bitstring(s: &str) -> Option<Self> {
        let mut mask = Self::NONE;
        for (c, kind) in s.chars().zip(SnapKind::ALL) {
            match c {
                '1' => mask.set(kind, true),
                '0' => {}
                _ => return None,
            }
        }
        Some(mask)
    }

    pub fn to_bitstring(&self) -> String {
        SnapKind::ALL
            .iter()
            .map(|k| if self.contains(*k) { '1' } else { '0' })
            .collect()
    }
}

impl Default for SnapMask {
    fn default() -> Self {
        Self::from_bitstring(Self::DEFAULT_BITSTRING).unwrap_or(Self::ALL)
    }
}

/// 捕捉候选点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    /// 精确几何位置
    pub raw: Point3,
    pub kind: SnapKind,
    /// 实际返回给调用方的点（通常是投影到工作平面后的位置）
    pub projected: Point3,
}

impl SnapCandidate {
    pub fn new(raw: Point3, kind: SnapKind, projected: Point3) -> Self {
        Self { raw, kind, projected }
    }
}

/// 参数名
pub mod param {
    pub const SNAP_MODES: &str = "snapModes";
    pub const SNAP_RANGE: &str = "snapRange";
    pub const ALWAYS_SNAP: &str = "alwaysSnap";
    pub const MAX_SNAP_EDGES: &str = "maxSnapEdges";
    pub const SNAP_STYLE: &str = "snapStyle";
    pub const ALWAYS_SHOW_GRID: &str = "alwaysShowGrid";
    pub const GRID: &str = "grid";
    pub const GRID_HIDE_IN_OTHER_WORKBENCHES: &str = "GridHideInOtherWorkbenches";
    pub const GRID_SPACING: &str = "gridSpacing";
    pub const GRID_SIZE: &str = "gridSize";
}

/// 捕捉配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// 捕捉半径（屏幕像素）
    pub snap_range: f64,
    /// 始终启用主动捕捉（无需修饰键）
    pub always_snap: bool,
    /// 超过该边数的形体跳过边/面捕捉，0 表示不限制
    pub max_snap_edges: usize,
    /// 使用方形标记
    pub square_markers: bool,
    /// 网格始终显示
    pub always_show_grid: bool,
    /// 命令执行期间显示网格
    pub grid_during_command: bool,
    /// 切换到其他工作台时隐藏网格
    pub grid_hide_in_other_workbenches: bool,
    /// 网格间距
    pub grid_spacing: f64,
    /// 每侧网格线数量
    pub grid_size: u32,
    /// 极轴角度（度）
    pub polar_angles: Vec<f64>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_range: 8.0,
            always_snap: true,
            max_snap_edges: 0,
            square_markers: false,
            always_show_grid: false,
            grid_during_command: true,
            grid_hide_in_other_workbenches: true,
            grid_spacing: 1.0,
            grid_size: 100,
            polar_angles: vec![90.0, 45.0],
        }
    }
}

impl SnapConfig {
    /// 从参数存储加载，缺失或类型不符的参数使用默认值
    pub fn load(store: &dyn ParamStore) -> Self {
        let d = Self::default();
        let float = |name: &str, default: f64| {
            store.get(name).and_then(|v| v.as_f64()).unwrap_or(default)
        };
        let boolean = |name: &str, default: bool| {
            store.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
        };
        let int = |name: &str, default: i64| {
            store.get(name).and_then(|v| v.as_i64()).unwrap_or(default)
        };

        Self {
            snap_range: float(param::SNAP_RANGE, d.snap_range),
            always_snap: boolean(param::ALWAYS_SNAP, d.always_snap),
            max_snap_edges: int(param::MAX_SNAP_EDGES, 0).max(0) as usize,
            square_markers: int(param::SNAP_STYLE, 0) != 0,
            always_show_grid: boolean(param::ALWAYS_SHOW_GRID, d.always_show_grid),
            grid_during_command: boolean(param::GRID, d.grid_during_command),
            grid_hide_in_other_workbenches: boolean(
                param::GRID_HIDE_IN_OTHER_WORKBENCHES,
                d.grid_hide_in_other_workbenches,
            ),
            grid_spacing: float(param::GRID_SPACING, d.grid_spacing),
            grid_size: int(param::GRID_SIZE, d.grid_size as i64).max(1) as u32,
            polar_angles: d.polar_angles,
        }
    }

    /// 从参数存储读取启用的捕捉类型
    pub fn load_mask(store: &dyn ParamStore) -> SnapMask {
        match store.get(param::SNAP_MODES) {
            Some(ParamValue::Text(s)) => SnapMask::from_bitstring(&s).unwrap_or_else(|| {
                tracing::warn!("Invalid snap mode string {:?}, using defaults", s);
                SnapMask::default()
            }),
            _ => SnapMask::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryParams;

    #[test]
    fn test_snap_mask() {
        let mut mask = SnapMask::default();
        assert!(mask.is_enabled(SnapKind::Endpoint));
        assert!(mask.is_enabled(SnapKind::Midpoint));
        assert!(!mask.is_enabled(SnapKind::Ortho));

        mask.set(SnapKind::Ortho, true);
        assert!(mask.is_enabled(SnapKind::Ortho));

        mask.toggle(SnapKind::Endpoint);
        assert!(!mask.is_enabled(SnapKind::Endpoint));
    }

    #[test]
    fn test_lock_disables_everything() {
        let mut mask = SnapMask::ALL;
        mask.set(SnapKind::Lock, false);
        assert!(mask.contains(SnapKind::Endpoint));
        assert!(!mask.is_enabled(SnapKind::Endpoint));
    }

    #[test]
    fn test_bitstring() {
        let mask = SnapMask::from_bitstring("1000001").unwrap();
        assert!(mask.contains(SnapKind::Lock));
        assert!(mask.contains(SnapKind::Midpoint));
        assert!(!mask.contains(SnapKind::Endpoint));
        assert_eq!(mask.to_bitstring(), "100000100000000");
        assert_eq!(SnapMask::default().to_bitstring(), SnapMask::DEFAULT_BITSTRING);
        assert!(SnapMask::from_bitstring("10x").is_none());
    }

    #[test]
    fn test_marker_styles() {
        assert_eq!(SnapKind::Near.marker(false), MarkerStyle::CircleLine);
        assert_eq!(SnapKind::Midpoint.marker(false), MarkerStyle::DiamondFilled);
        assert_eq!(SnapKind::Grid.marker(true), MarkerStyle::SquareFilled);
        assert!(SnapKind::Near.cursor_icon().is_none());
    }

    #[test]
    fn test_config_load() {
        let mut store = MemoryParams::default();
        store.insert(param::SNAP_RANGE, ParamValue::Float(12.0));
        store.insert(param::SNAP_STYLE, ParamValue::Int(1));
        store.insert(param::ALWAYS_SNAP, ParamValue::Text("yes".into()));

        let config = SnapConfig::load(&store);
        assert_eq!(config.snap_range, 12.0);
        assert!(config.square_markers);
        // 类型不符时回退默认值
        assert!(config.always_snap);
    }
}
