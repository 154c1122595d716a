//! 几何求交与距离查询
//!
//! 所有函数只读访问几何，失败时返回空结果而不是错误。
//! `infinite` 参数表示把直线视为无限长、把圆弧视为整圆。

use crate::geometry::{Circle, Curve, Edge, Line};
use crate::math::{is_null, Point3, Vector3, EPSILON, PRECISION};

/// 共面判断容差
const COPLANAR_TOLERANCE: f64 = 1e-6;

/// 参数范围判断容差
const PARAM_TOLERANCE: f64 = 1e-9;

fn in_unit_range(t: f64) -> bool {
    (-PARAM_TOLERANCE..=1.0 + PARAM_TOLERANCE).contains(&t)
}

/// 两条直线 (p1,p2) 与 (p3,p4) 的交点
///
/// 两线必须共面且不平行。
pub fn line_intersection(
    p1: &Point3,
    p2: &Point3,
    p3: &Point3,
    p4: &Point3,
    infinite1: bool,
    infinite2: bool,
) -> Option<Point3> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let r = p1 - p3;

    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    if a < EPSILON || e < EPSILON {
        return None;
    }
    let b = d1.dot(&d2);
    let c = d1.dot(&r);
    let f = d2.dot(&r);

    let denom = a * e - b * b;
    // 平行
    if denom.abs() < EPSILON * a * e {
        return None;
    }

    let s = (b * f - c * e) / denom;
    let t = (a * f - b * c) / denom;

    let q1 = p1 + d1 * s;
    let q2 = p3 + d2 * t;
    // 异面
    if (q1 - q2).norm() > COPLANAR_TOLERANCE {
        return None;
    }

    if (!infinite1 && !in_unit_range(s)) || (!infinite2 && !in_unit_range(t)) {
        return None;
    }
    Some(q1)
}

/// 直线-圆交点
fn line_circle_intersection(line: &Line, circle: &Circle, infinite_line: bool, full_circle: bool) -> Vec<Point3> {
    let d = line.vector();
    if is_null(&d) {
        return vec![];
    }

    let on_circle = |p: &Point3| full_circle || circle.contains_angle(circle.angle_of(p));
    let in_range = |t: f64| infinite_line || in_unit_range(t);

    let n = circle.axis;
    let h0 = (line.start - circle.center).dot(&n);
    let h1 = (line.end - circle.center).dot(&n);

    if h0.abs() < COPLANAR_TOLERANCE && h1.abs() < COPLANAR_TOLERANCE {
        // 直线位于圆所在平面内
        let f = line.start - circle.center;
        let a = d.dot(&d);
        let b = 2.0 * f.dot(&d);
        let c = f.dot(&f) - circle.radius * circle.radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < -EPSILON {
            return vec![];
        }

        let mut params = Vec::with_capacity(2);
        if discriminant.abs() <= EPSILON {
            // 相切
            params.push(-b / (2.0 * a));
        } else {
            let sqrt_disc = discriminant.sqrt();
            params.push((-b - sqrt_disc) / (2.0 * a));
            params.push((-b + sqrt_disc) / (2.0 * a));
        }

        return params
            .into_iter()
            .filter(|t| in_range(*t))
            .map(|t| line.start + d * t)
            .filter(|p| on_circle(p))
            .collect();
    }

    // 直线穿过圆所在平面
    let dn = d.dot(&n);
    if dn.abs() < EPSILON {
        return vec![];
    }
    let t = -h0 / dn;
    if !in_range(t) {
        return vec![];
    }
    let p = line.start + d * t;
    if ((p - circle.center).norm() - circle.radius).abs() < COPLANAR_TOLERANCE && on_circle(&p) {
        vec![p]
    } else {
        vec![]
    }
}

/// 圆-圆交点（仅共面情况）
fn circle_circle_intersection(c1: &Circle, c2: &Circle, full1: bool, full2: bool) -> Vec<Point3> {
    if c1.axis.cross(&c2.axis).norm() > COPLANAR_TOLERANCE
        || (c2.center - c1.center).dot(&c1.axis).abs() > COPLANAR_TOLERANCE
    {
        return vec![];
    }

    let delta = c2.center - c1.center;
    let d = delta.norm();

    // 不相交、内含或同心
    if d > c1.radius + c2.radius + COPLANAR_TOLERANCE
        || d < (c1.radius - c2.radius).abs() - COPLANAR_TOLERANCE
        || d < EPSILON
    {
        return vec![];
    }

    let a = (c1.radius * c1.radius - c2.radius * c2.radius + d * d) / (2.0 * d);
    let h = (c1.radius * c1.radius - a * a).max(0.0).sqrt();

    let dir = delta / d;
    let p = c1.center + dir * a;
    let perp = c1.axis.cross(&dir);

    let points = if h < COPLANAR_TOLERANCE {
        // 相切
        vec![p]
    } else {
        vec![p + perp * h, p - perp * h]
    };

    points
        .into_iter()
        .filter(|p| full1 || c1.contains_angle(c1.angle_of(p)))
        .filter(|p| full2 || c2.contains_angle(c2.angle_of(p)))
        .collect()
}

/// 两条边的交点
pub fn find_intersection(e1: &Edge, e2: &Edge, infinite1: bool, infinite2: bool) -> Vec<Point3> {
    match (&e1.curve, &e2.curve) {
        (Curve::Line(l1), Curve::Line(l2)) => {
            line_intersection(&l1.start, &l1.end, &l2.start, &l2.end, infinite1, infinite2)
                .into_iter()
                .collect()
        }
        (Curve::Line(line), Curve::Circle(circle)) => {
            line_circle_intersection(line, circle, infinite1, infinite2)
        }
        (Curve::Circle(circle), Curve::Line(line)) => {
            line_circle_intersection(line, circle, infinite2, infinite1)
        }
        (Curve::Circle(c1), Curve::Circle(c2)) => circle_circle_intersection(c1, c2, infinite1, infinite2),
        // 其他情况暂不处理
        _ => vec![],
    }
}

/// 两条线段是否共线
pub fn are_colinear(l1: &Line, l2: &Line) -> bool {
    let d1 = l1.direction();
    let d2 = l2.direction();
    if is_null(&d1) || is_null(&d2) {
        return false;
    }
    if d1.cross(&d2).norm() > COPLANAR_TOLERANCE {
        return false;
    }
    let offset = l2.start - l1.start;
    (offset - d1 * offset.dot(&d1)).norm() < COPLANAR_TOLERANCE
}

/// 点到无限直线 (origin, dir) 的垂直向量（从点指向垂足）
pub fn find_distance(point: &Point3, origin: &Point3, dir: &Vector3) -> Option<Vector3> {
    if is_null(dir) {
        return None;
    }
    let d = dir.normalize();
    let foot = origin + d * (point - origin).dot(&d);
    Some(foot - point)
}

/// 无限直线上的垂足；直线由边的首尾顶点确定
pub fn perpendicular_on(edge: &Line, point: &Point3) -> Point3 {
    edge.start + crate::math::project(&(point - edge.start), &edge.vector())
}

/// 点是否位于边上
pub fn is_point_on_edge(point: &Point3, edge: &Edge) -> bool {
    edge.distance_to_point(point) < PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_intersection_segments() {
        let p = line_intersection(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(10.0, 10.0, 0.0),
            &Point3::new(0.0, 10.0, 0.0),
            &Point3::new(10.0, 0.0, 0.0),
            false,
            false,
        )
        .unwrap();
        assert!((p - Point3::new(5.0, 5.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_line_intersection_needs_infinite_flag() {
        let (a, b) = (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let (c, d) = (Point3::new(5.0, 1.0, 0.0), Point3::new(5.0, 2.0, 0.0));
        assert!(line_intersection(&a, &b, &c, &d, false, false).is_none());
        let p = line_intersection(&a, &b, &c, &d, true, true).unwrap();
        assert!((p - Point3::new(5.0, 0.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_skew_lines_do_not_intersect() {
        let p = line_intersection(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
            true,
            true,
        );
        assert!(p.is_none());
    }

    #[test]
    fn test_line_circle() {
        let line = Edge::line(Point3::new(-10.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        let circle = Edge::circle(Circle::xy(Point3::origin(), 5.0));
        let pts = find_intersection(&line, &circle, false, false);
        assert_eq!(pts.len(), 2);
        assert!(pts.iter().any(|p| (p - Point3::new(5.0, 0.0, 0.0)).norm() < EPSILON));
        assert!(pts.iter().any(|p| (p - Point3::new(-5.0, 0.0, 0.0)).norm() < EPSILON));
    }

    #[test]
    fn test_circle_circle() {
        let c1 = Edge::circle(Circle::xy(Point3::origin(), 5.0));
        let c2 = Edge::circle(Circle::xy(Point3::new(8.0, 0.0, 0.0), 5.0));
        let pts = find_intersection(&c1, &c2, false, false);
        assert_eq!(pts.len(), 2);
        for p in pts {
            assert!((p.x - 4.0).abs() < EPSILON);
            assert!((p.y.abs() - 3.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_colinear_and_distance() {
        let l1 = Line::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let l2 = Line::new(Point3::new(5.0, 0.0, 0.0), Point3::new(9.0, 0.0, 0.0));
        let l3 = Line::new(Point3::new(5.0, 1.0, 0.0), Point3::new(9.0, 1.0, 0.0));
        assert!(are_colinear(&l1, &l2));
        assert!(!are_colinear(&l1, &l3));

        let d = find_distance(&Point3::new(3.0, 2.0, 0.0), &Point3::origin(), &Vector3::x()).unwrap();
        assert!((d - Vector3::new(0.0, -2.0, 0.0)).norm() < EPSILON);
    }
}
