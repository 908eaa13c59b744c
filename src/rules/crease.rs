use std::f64::consts::PI;

use super::{sector_edge_mask, QuadRule, RuleKind};

/// Crease vertex with `k` faces between its two crease edges
pub(super) fn build(k:usize) -> QuadRule {
    let mut rule = QuadRule::empty(RuleKind::Crease, k, std::f32::consts::PI);
    let kf = k as f64;
    let theta = PI / kf;
    let cos = theta.cos();
    rule.edge_sub = sector_edge_mask(theta);

    // Crease vertices only listen to their crease neighbors
    rule.sub.center = 0.75;
    rule.sub.edge[0] = 0.125;
    rule.sub.edge[k] = 0.125;

    rule.lambda1 = if k == 1 { 0.25 } else { 0.5 };
    rule.lambda2 = 0.5;

    rule.l0.center = 2.0 / 3.0;
    rule.l0.edge[0] = 1.0 / 6.0;
    rule.l0.edge[k] = 1.0 / 6.0;

    if k == 1 {
        rule.l1.center = 6.0;
        rule.l1.edge[0] = -3.0;
        rule.l1.edge[1] = -3.0;
        rule.l2.edge[0] = -1.0;
        rule.l2.edge[1] = 1.0;

        rule.x1.center = 1.0 / 18.0;
        rule.x1.edge[0] = -2.0 / 18.0;
        rule.x1.edge[1] = -2.0 / 18.0;
        rule.x1.face[0] = -5.0 / 18.0;
        rule.x2.edge[0] = -0.5;
        rule.x2.edge[1] = 0.5;
        return rule;
    }

    let scale = 1.0 / ((3.0 + cos) * kf);
    let r = (cos + 1.0) / theta.sin() * scale;
    rule.l1.center = (4.0 * r * (cos - 1.0)) as f32;
    rule.l1.edge[0] = (-r * (1.0 + 2.0 * cos)) as f32;
    rule.l1.edge[k] = rule.l1.edge[0];
    for i in 1..k {
        rule.l1.edge[i] = (4.0 * (i as f64 * theta).sin() * scale) as f32;
    }
    for i in 0..k {
        rule.l1.face[i] = (((i as f64 * theta).sin() + ((i + 1) as f64 * theta).sin()) * scale) as f32;
    }
    rule.l2.edge[0] = 0.5;
    rule.l2.edge[k] = -0.5;

    for i in 0..=k {
        let (sin, cos) = (i as f64 * theta).sin_cos();
        rule.x1.edge[i] = sin as f32;
        rule.x2.edge[i] = cos as f32;
    }
    for i in 0..k {
        let (sin_next, cos_next) = ((i + 1) as f64 * theta).sin_cos();
        rule.x1.face[i] = rule.x1.edge[i] + sin_next as f32;
        rule.x2.face[i] = rule.x2.edge[i] + cos_next as f32;
    }
    rule
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_crease_vertex_rule() {
        for k in 1..6 {
            let rule = build(k);
            assert_relative_eq!(rule.sub.center, 0.75);
            assert_relative_eq!(rule.sub.edge[0], 0.125);
            assert_relative_eq!(rule.sub.edge[k], 0.125);
            assert_relative_eq!(rule.sub.face.iter().sum::<f32>(), 0.0);
        }
    }

    #[test]
    fn test_single_face_tables() {
        let rule = build(1);
        assert_eq!(rule.l1.center, 6.0);
        assert_eq!(rule.x2.edge, vec![-0.5, 0.5]);
        assert_relative_eq!(rule.l1.dot(&rule.x1), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_crease_tangent_spans_crease() {
        // l2 only weighs the two crease neighbors
        let rule = build(4);
        assert_relative_eq!(rule.l2.edge[0], 0.5);
        assert_relative_eq!(rule.l2.edge[4], -0.5);
        assert!(rule.l2.edge[1..4].iter().all(|&w| w == 0.0));
        assert!(rule.l2.face.iter().all(|&w| w == 0.0));
    }
}
