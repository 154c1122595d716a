//! 候选点裁决
//!
//! 被动捕捉（最近点）只有在其他类型的候选点离光标太远时才会胜出。

use crate::math::Point3;
use crate::snap::SnapCandidate;

/// 从候选点中选出最终捕捉点
///
/// 以精确位置 `raw` 到拾取点的三维距离排序，分别记录全部候选与非被动候选中的最近者
/// （严格小于，同类中先出现者优先）。
/// - 没有非被动候选：取全局最近者
/// - 两者距离相等：取非被动候选
/// - 否则当 `within_range` 认为非被动候选在屏幕捕捉半径内时取它，不在时取全局最近者
pub fn pick_winner<'c, F>(
    candidates: &'c [SnapCandidate],
    pick_point: &Point3,
    within_range: F,
) -> Option<&'c SnapCandidate>
where
    F: FnOnce(&SnapCandidate) -> bool,
{
    let mut shortest_all = f64::INFINITY;
    let mut shortest_active = f64::INFINITY;
    let mut winner_all: Option<&SnapCandidate> = None;
    let mut winner_active: Option<&SnapCandidate> = None;

    for candidate in candidates {
        let dist = (candidate.raw - pick_point).norm();
        if !dist.is_finite() {
            continue;
        }
        if !candidate.kind.is_passive() && dist < shortest_active {
            shortest_active = dist;
            winner_active = Some(candidate);
        }
        if dist < shortest_all {
            shortest_all = dist;
            winner_all = Some(candidate);
        }
    }

    match winner_active {
        None => winner_all,
        Some(active) if shortest_active == shortest_all => Some(active),
        Some(active) => {
            if within_range(active) {
                Some(active)
            } else {
                winner_all
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapKind;

    fn cand(x: f64, kind: SnapKind) -> SnapCandidate {
        let p = Point3::new(x, 0.0, 0.0);
        SnapCandidate::new(p, kind, p)
    }

    #[test]
    fn test_empty() {
        assert!(pick_winner(&[], &Point3::origin(), |_| true).is_none());
    }

    #[test]
    fn test_active_within_range_beats_nearer_passive() {
        let cands = [cand(0.1, SnapKind::Near), cand(0.5, SnapKind::Endpoint)];
        let w = pick_winner(&cands, &Point3::origin(), |_| true).unwrap();
        assert_eq!(w.kind, SnapKind::Endpoint);
    }

    #[test]
    fn test_active_out_of_range_loses() {
        let cands = [cand(0.1, SnapKind::Near), cand(5.0, SnapKind::Endpoint)];
        let w = pick_winner(&cands, &Point3::origin(), |_| false).unwrap();
        assert_eq!(w.kind, SnapKind::Near);
    }

    #[test]
    fn test_only_passive() {
        let cands = [cand(0.3, SnapKind::Near), cand(0.2, SnapKind::Near)];
        let w = pick_winner(&cands, &Point3::origin(), |_| false).unwrap();
        assert_eq!(w.raw.x, 0.2);
    }

    #[test]
    fn test_tie_prefers_active_without_range_check() {
        let cands = [cand(1.0, SnapKind::Near), cand(1.0, SnapKind::Midpoint)];
        let w = pick_winner(&cands, &Point3::origin(), |_| panic!("range check not expected")).unwrap();
        assert_eq!(w.kind, SnapKind::Midpoint);
    }

    #[test]
    fn test_first_found_wins_within_class() {
        let cands = [cand(1.0, SnapKind::Endpoint), cand(-1.0, SnapKind::Midpoint)];
        let w = pick_winner(&cands, &Point3::origin(), |_| true).unwrap();
        assert_eq!(w.kind, SnapKind::Endpoint);
    }
}
