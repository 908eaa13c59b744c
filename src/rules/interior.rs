use std::f64::consts::PI;

use super::{QuadRule, RuleKind, EDGE_MASK};

/// Smooth vertex with a closed ring of `k` faces, `k >= 3`
pub(super) fn build(k:usize) -> QuadRule {
    let mut rule = QuadRule::empty(RuleKind::Interior, k, std::f32::consts::PI);
    let kf = k as f64;
    rule.edge_sub = EDGE_MASK;

    let beta = 1.5 / kf;
    let gamma = 0.25 / kf;
    rule.sub.center = (1.0 - beta - gamma) as f32;
    rule.sub.edge.fill((beta / kf) as f32);
    rule.sub.face.fill((gamma / kf) as f32);

    let theta = 2.0 * PI / kf;
    let an = 1.0 + theta.cos() + (PI / kf).cos() * (2.0 * (9.0 + theta.cos())).sqrt();
    let lambda = (an + 4.0) / 16.0;
    rule.lambda1 = lambda as f32;
    rule.lambda2 = lambda as f32;

    // Face entries of the tangent eigenvectors relative to their neighboring edges
    let f1 = 1.0 / (4.0 * lambda - 1.0);
    let normalizer = 1.0 / (kf * (2.0 + (theta.cos() + 1.0) * f1 * f1));

    rule.l0.center = (kf / (kf + 5.0)) as f32;
    rule.l0.edge.fill((4.0 / (kf * (kf + 5.0))) as f32);
    rule.l0.face.fill((1.0 / (kf * (kf + 5.0))) as f32);

    for i in 0..k {
        let (sin, cos) = (i as f64 * theta).sin_cos();
        let (sin_next, cos_next) = ((i + 1) as f64 * theta).sin_cos();

        rule.l1.edge[i] = (4.0 * sin) as f32;
        rule.l1.face[i] = (f1 * (sin + sin_next)) as f32;
        rule.l2.edge[i] = (4.0 * cos) as f32;
        rule.l2.face[i] = (f1 * (cos + cos_next)) as f32;

        rule.x1.edge[i] = (sin * normalizer) as f32;
        rule.x1.face[i] = (f1 * normalizer * (sin + sin_next)) as f32;
        rule.x2.edge[i] = (cos * normalizer) as f32;
        rule.x2.face[i] = (f1 * normalizer * (cos + cos_next)) as f32;
    }
    rule
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_regular_vertex() {
        let rule = build(4);
        assert_relative_eq!(rule.sub.center, 9.0 / 16.0);
        assert_relative_eq!(rule.sub.edge[0], 3.0 / 32.0);
        assert_relative_eq!(rule.sub.face[0], 1.0 / 64.0);
        assert_relative_eq!(rule.l0.center, 4.0 / 9.0);
        assert_relative_eq!(rule.l0.edge[1], 1.0 / 9.0);
        assert_relative_eq!(rule.l0.face[2], 1.0 / 36.0);
    }

    #[test]
    fn test_subdominant_eigenvalue() {
        // Known value for valence 3
        let rule = build(3);
        assert_relative_eq!(rule.lambda1, 0.410097, epsilon = 1e-5);
        assert_eq!(rule.lambda1, rule.lambda2);
        // high valence vertices decay slower than regular ones
        assert!(build(12).lambda1 > 0.5);
    }
}
