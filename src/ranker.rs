use crate::{
    error::{EmergencyError, no_candidates},
    types::DeconflictionPlan,
};

pub const COST_WEIGHT: f64 = 0.25;
pub const RISK_WEIGHT: f64 = 0.75;

pub trait PlanRanker: Send + Sync {
    fn select(&self, plans: &[DeconflictionPlan]) -> Result<DeconflictionPlan, EmergencyError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPlanRanker {
    pub cost_weight: f64,
    pub risk_weight: f64,
}

impl Default for WeightedPlanRanker {
    fn default() -> Self {
        Self {
            cost_weight: COST_WEIGHT,
            risk_weight: RISK_WEIGHT,
        }
    }
}

impl WeightedPlanRanker {
    pub fn score(&self, plan: &DeconflictionPlan) -> f64 {
        self.cost_weight * plan.cost + self.risk_weight * plan.riskiness
    }
}

impl PlanRanker for WeightedPlanRanker {
    fn select(&self, plans: &[DeconflictionPlan]) -> Result<DeconflictionPlan, EmergencyError> {
        let mut best: Option<(f64, &DeconflictionPlan)> = None;
        for plan in plans {
            // negated so NaN is skipped along with negative values
            if !(plan.cost >= 0.0 && plan.riskiness >= 0.0) {
                tracing::debug!(
                    target: "ranker",
                    uav_id = plan.uav_id,
                    cost = plan.cost,
                    riskiness = plan.riskiness,
                    "plan_skipped_negative_score_input"
                );
                continue;
            }
            let score = self.score(plan);
            // strict comparison keeps the earliest candidate on ties
            match best {
                Some((best_score, _)) if score.total_cmp(&best_score).is_ge() => {}
                _ => best = Some((score, plan)),
            }
        }

        best.map(|(_, plan)| plan.clone())
            .ok_or_else(|| no_candidates("deconfliction planner returned no usable candidate plans"))
    }
}
