//! Deterministic merge of the council's reviews into one decision
//!
//! Pure function over the recorded reviews and the aggregation settings:
//! identical input yields identical output regardless of the order the
//! reviews arrived in. Failed roles never contribute.

use crate::config::EngineConfig;
use crate::policy::{dissenting_roles, rating_variance};
use council_core::{AgentReview, AgentRole, FinalDecision};

/// Merge all successful reviews into a `FinalDecision`
///
/// Returns `None` when not a single review succeeded. The rating is a
/// confidence- and weight-weighted mean, optionally capped by the veto
/// rule; dissenting roles are recorded when the rating variance exceeds
/// the configured threshold.
pub fn aggregate(reviews: &[AgentReview], config: &EngineConfig) -> Option<FinalDecision> {
    // Canonical role order makes the computation order-independent
    let mut successes: Vec<(&AgentRole, f64, f64)> = reviews
        .iter()
        .filter_map(|r| r.content().map(|c| (&r.role, c.rating, c.confidence)))
        .collect();
    if successes.is_empty() {
        return None;
    }
    successes.sort_by_key(|(role, _, _)| **role);

    let contributing_roles: Vec<AgentRole> = successes.iter().map(|(role, _, _)| **role).collect();

    // Rating weighted by configured role weight and self-reported confidence
    let mut rating_weight_sum = 0.0;
    let mut rating_sum = 0.0;
    let mut role_weight_sum = 0.0;
    let mut confidence_sum = 0.0;
    for (role, rating, confidence) in &successes {
        let role_weight = config.weight_for(**role);
        rating_weight_sum += role_weight * confidence;
        rating_sum += role_weight * confidence * rating;
        role_weight_sum += role_weight;
        confidence_sum += role_weight * confidence;
    }

    let mut rating = if rating_weight_sum > 0.0 {
        rating_sum / rating_weight_sum
    } else {
        successes.iter().map(|(_, r, _)| r).sum::<f64>() / successes.len() as f64
    };
    let confidence = if role_weight_sum > 0.0 {
        confidence_sum / role_weight_sum
    } else {
        successes.iter().map(|(_, _, c)| c).sum::<f64>() / successes.len() as f64
    };

    // Veto: a cautious designated role caps the merged rating
    let mut overridden = false;
    if let Some(veto) = &config.veto {
        let veto_rating = successes
            .iter()
            .find(|(role, _, _)| **role == veto.role)
            .map(|(_, r, _)| *r);
        if let Some(veto_rating) = veto_rating {
            if veto_rating <= veto.cap && rating > veto.cap {
                rating = veto.cap;
                overridden = true;
            }
        }
    }

    let variance = rating_variance(reviews);
    let dissenting = if variance > config.disagreement_threshold {
        dissenting_roles(reviews, config.disagreement_threshold)
    } else {
        Vec::new()
    };

    let summary = build_summary(&contributing_roles, overridden, config, &dissenting, variance);

    Some(FinalDecision {
        rating,
        confidence,
        summary,
        contributing_roles,
        overridden,
        dissenting_roles: dissenting,
    })
}

fn build_summary(
    contributors: &[AgentRole],
    overridden: bool,
    config: &EngineConfig,
    dissenting: &[AgentRole],
    variance: f64,
) -> String {
    let names = |roles: &[AgentRole]| {
        roles
            .iter()
            .map(AgentRole::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut summary = format!(
        "weighted verdict from {} analyst(s): {}",
        contributors.len(),
        names(contributors)
    );
    if overridden {
        if let Some(veto) = &config.veto {
            summary.push_str(&format!(
                "; {} veto capped the rating at {:.2}",
                veto.role, veto.cap
            ));
        }
    }
    if dissenting.is_empty() {
        summary.push_str("; no material disagreement");
    } else {
        summary.push_str(&format!(
            "; disagreement (variance {:.4}) from: {}",
            variance,
            names(dissenting)
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::ReviewContent;

    fn review(role: AgentRole, rating: f64, confidence: f64) -> AgentReview {
        AgentReview::success(role, ReviewContent::new(rating, confidence, "test"))
    }

    #[test]
    fn test_empty_and_all_failed_yield_none() {
        let config = EngineConfig::default();
        assert!(aggregate(&[], &config).is_none());

        let failed = vec![AgentReview::failed(AgentRole::Technical, "down")];
        assert!(aggregate(&failed, &config).is_none());
    }

    #[test]
    fn test_equal_weights_mean() {
        let config = EngineConfig::default();
        let reviews = vec![
            review(AgentRole::Technical, 0.8, 1.0),
            review(AgentRole::Fundamental, 0.4, 1.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!((decision.rating - 0.6).abs() < 1e-12);
        assert!((decision.confidence - 1.0).abs() < 1e-12);
        assert!(!decision.overridden);
    }

    #[test]
    fn test_confidence_weighs_rating() {
        let config = EngineConfig::default();
        let reviews = vec![
            review(AgentRole::Technical, 1.0, 0.9),
            review(AgentRole::Fundamental, 0.0, 0.1),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        // 0.9 of the weight sits on the rating of 1.0
        assert!((decision.rating - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_role_weight_applied() {
        let config = EngineConfig::builder()
            .role_weight(AgentRole::Fundamental, 3.0)
            .build()
            .unwrap();
        let reviews = vec![
            review(AgentRole::Technical, 1.0, 1.0),
            review(AgentRole::Fundamental, 0.0, 1.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!((decision.rating - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_confidence_falls_back_to_unweighted_mean() {
        let config = EngineConfig::default();
        let reviews = vec![
            review(AgentRole::Technical, 0.8, 0.0),
            review(AgentRole::Fundamental, 0.2, 0.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!((decision.rating - 0.5).abs() < 1e-12);
        assert!((decision.confidence - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_veto_caps_rating() {
        // Normative scenario: 0.8 / 0.6 / 0.3, risk veto with cap 0.5
        let config = EngineConfig::builder()
            .veto(AgentRole::Risk, 0.5)
            .build()
            .unwrap();
        let reviews = vec![
            review(AgentRole::Technical, 0.8, 1.0),
            review(AgentRole::Fundamental, 0.6, 1.0),
            review(AgentRole::Risk, 0.3, 1.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!((decision.rating - 0.5).abs() < 1e-12);
        assert!(decision.overridden);
        assert!(decision.summary.contains("veto"));
    }

    #[test]
    fn test_bullish_veto_role_does_not_cap() {
        let config = EngineConfig::builder()
            .veto(AgentRole::Risk, 0.5)
            .build()
            .unwrap();
        let reviews = vec![
            review(AgentRole::Technical, 0.8, 1.0),
            review(AgentRole::Risk, 0.9, 1.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!(decision.rating > 0.5);
        assert!(!decision.overridden);
    }

    #[test]
    fn test_order_invariance() {
        let config = EngineConfig::builder()
            .veto(AgentRole::Risk, 0.5)
            .role_weight(AgentRole::Technical, 2.0)
            .build()
            .unwrap();
        let mut reviews = vec![
            review(AgentRole::Technical, 0.8, 0.7),
            review(AgentRole::Fundamental, 0.6, 0.9),
            review(AgentRole::Risk, 0.3, 0.8),
            AgentReview::failed(AgentRole::News, "down"),
        ];
        let forward = aggregate(&reviews, &config).unwrap();
        reviews.reverse();
        let backward = aggregate(&reviews, &config).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_dissenting_roles_recorded() {
        let config = EngineConfig::builder()
            .disagreement_threshold(0.01)
            .build()
            .unwrap();
        let reviews = vec![
            review(AgentRole::Technical, 0.9, 1.0),
            review(AgentRole::Fundamental, 0.5, 1.0),
            review(AgentRole::Risk, 0.1, 1.0),
        ];
        let decision = aggregate(&reviews, &config).unwrap();
        assert!(decision.has_disagreement());
        assert_eq!(
            decision.dissenting_roles,
            vec![AgentRole::Technical, AgentRole::Risk]
        );
        assert!(decision.summary.contains("disagreement"));
    }
}
