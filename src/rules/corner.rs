use super::{sector_edge_mask, QuadRule, RuleKind};

/// Corner vertex with `k` faces spanning a sector of angle `theta`. Corners stay put, their
/// crease neighbors move towards them, and the sector is mapped onto a wedge of angle `theta`.
///
/// Convex wedges open from `e_0` towards `e_k`. Concave wedges are measured from `e_k` and
/// mirrored, so that `x2 x x1` keeps pointing outwards for both.
pub(super) fn build(kind:RuleKind, k:usize, theta:f32) -> QuadRule {
    let mut rule = QuadRule::empty(kind, k, theta);
    let theta = theta as f64;
    let theta_k = theta / k as f64;
    rule.edge_sub = sector_edge_mask(theta_k);

    rule.sub.center = 1.0;
    rule.l0.center = 1.0;
    rule.lambda1 = 0.5;
    rule.lambda2 = 0.5;

    if k == 1 {
        // A single face is mapped onto the unit square
        rule.x1.edge[1] = 1.0;
        rule.x1.face[0] = 1.0;
        rule.x2.edge[0] = 1.0;
        rule.x2.face[0] = 1.0;
        rule.l1.center = -1.0;
        rule.l1.edge[1] = 1.0;
        rule.l2.center = -1.0;
        rule.l2.edge[0] = 1.0;
        return rule;
    }

    let concave = kind == RuleKind::ConcaveCorner;
    let sign = if concave { -1.0 } else { 1.0 };
    // `start` is the crease neighbor the wedge is measured from
    let (start, end) = if concave { (k, 0) } else { (0, k) };

    for i in 0..=k {
        let step = if concave { k - i } else { i };
        let (sin, cos) = (step as f64 * theta_k).sin_cos();
        rule.x1.edge[i] = (sign * sin) as f32;
        rule.x2.edge[i] = cos as f32;
    }
    for i in 0..k {
        rule.x1.face[i] = rule.x1.edge[i] + rule.x1.edge[i + 1];
        rule.x2.face[i] = rule.x2.edge[i] + rule.x2.edge[i + 1];
    }

    let (sin, cos) = theta.sin_cos();
    rule.l2.center = -1.0;
    rule.l2.edge[start] = 1.0;
    rule.l1.center = (sign * (cos - 1.0) / sin) as f32;
    rule.l1.edge[start] = (-sign * cos / sin) as f32;
    rule.l1.edge[end] = (sign / sin) as f32;
    rule
}
