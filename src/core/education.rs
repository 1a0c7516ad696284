use std::iter;

use super::projection::{
    MAX_HORIZON_YEARS, discount, growth_factor, non_negative, pct_to_rate, real, sanitize,
};
use super::solver::{MAX_ITERATIONS, SearchOutcome, bisect_increasing, required_contribution};
use super::types::{EducationInput, EducationPoint, EducationResult, GrantRule};

/// Monthly contributions are solved to the cent.
const CONTRIBUTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Grant {
    match_rate: f64,
    annual_cap: f64,
    lifetime_cap: f64,
}

impl From<GrantRule> for Grant {
    fn from(rule: GrantRule) -> Self {
        Self {
            match_rate: pct_to_rate(rule.match_rate_pct).max(0.0),
            annual_cap: non_negative(rule.annual_grant_cap),
            lifetime_cap: non_negative(rule.lifetime_grant_cap),
        }
    }
}

impl Grant {
    fn paid_on(&self, own_contribution: f64, received_so_far: f64) -> f64 {
        (own_contribution * self.match_rate)
            .min(self.annual_cap)
            .min((self.lifetime_cap - received_so_far).max(0.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    child_age: u32,
    enrollment_age: u32,
    end_age: u32,
    return_rate: f64,
    cost_inflation: f64,
    annual_cost_today: f64,
    current_savings: f64,
    grant: Option<Grant>,
}

impl Plan {
    fn savings_years(&self) -> u32 {
        self.enrollment_age - self.child_age
    }

    /// Tuition due at the start of the year beginning at `age`, in that
    /// year's money.
    fn cost_at(&self, age: u32) -> f64 {
        if age < self.enrollment_age || age >= self.end_age {
            return 0.0;
        }
        self.annual_cost_today * growth_factor(self.cost_inflation, age - self.child_age)
    }
}

#[derive(Debug, Clone, Copy)]
struct FundState {
    age: u32,
    balance: f64,
    contributed: f64,
    granted: f64,
}

pub fn plan_education(input: &EducationInput) -> EducationResult {
    let child_age = input.child_age;
    let horizon_end = child_age.saturating_add(MAX_HORIZON_YEARS);
    let enrollment_age = input.enrollment_age.clamp(child_age, horizon_end);
    let plan = Plan {
        child_age,
        enrollment_age,
        end_age: enrollment_age
            .saturating_add(input.years_of_study)
            .min(horizon_end),
        return_rate: pct_to_rate(input.return_pct),
        cost_inflation: pct_to_rate(input.cost_inflation_pct),
        annual_cost_today: non_negative(input.annual_cost_today),
        current_savings: non_negative(input.current_savings),
        grant: input.grant.map(Grant::from),
    };
    let monthly = non_negative(input.monthly_contribution);

    let points: Vec<EducationPoint> = fund_states(&plan, monthly)
        .map(|state| EducationPoint {
            age: state.age,
            nominal_balance: state.balance,
            real_balance: real(state.balance, state.age - plan.child_age, plan.cost_inflation),
            yearly_cost: plan.cost_at(state.age),
            contributed_total: state.contributed,
            grant_total: state.granted,
        })
        .collect();

    let total_cost_nominal: f64 = (plan.enrollment_age..plan.end_age)
        .map(|age| plan.cost_at(age))
        .sum();
    let needed_at_enrollment = amount_needed_at_enrollment(&plan);
    let at_enrollment = points
        .iter()
        .find(|p| p.age == plan.enrollment_age)
        .copied();
    let projected_at_enrollment = at_enrollment.map_or(0.0, |p| p.nominal_balance);
    let funding_gap = (needed_at_enrollment - projected_at_enrollment).max(0.0);

    let required_monthly_contribution =
        solve_monthly(&plan, needed_at_enrollment, input.return_pct);
    let additional_monthly_contribution =
        required_monthly_contribution.map(|required| (required - monthly).max(0.0));

    EducationResult {
        points,
        total_cost_nominal,
        needed_at_enrollment,
        projected_at_enrollment,
        funding_gap,
        required_monthly_contribution,
        additional_monthly_contribution,
        grant_received: at_enrollment.map_or(0.0, |p| p.grant_total),
    }
}

/// Value at enrollment of all study-year costs, discounted at the account
/// return since the fund keeps growing while it pays out.
fn amount_needed_at_enrollment(plan: &Plan) -> f64 {
    (plan.enrollment_age..plan.end_age)
        .map(|age| discount(plan.cost_at(age), plan.return_rate, age - plan.enrollment_age))
        .sum()
}

fn fund_states(plan: &Plan, monthly: f64) -> impl Iterator<Item = FundState> + '_ {
    let initial = FundState {
        age: plan.child_age,
        balance: plan.current_savings,
        contributed: 0.0,
        granted: 0.0,
    };
    iter::successors(Some(initial), move |state| {
        (state.age < plan.end_age).then(|| step(plan, monthly, *state))
    })
}

/// Saving years: growth, then the year's contribution and any grant on it.
/// Study years: the year's cost leaves first, the remainder grows.
fn step(plan: &Plan, monthly: f64, state: FundState) -> FundState {
    if state.age < plan.enrollment_age {
        let own = monthly * 12.0;
        let grant = plan
            .grant
            .map_or(0.0, |grant| grant.paid_on(own, state.granted));
        return FundState {
            age: state.age + 1,
            balance: state.balance * (1.0 + plan.return_rate) + own + grant,
            contributed: state.contributed + own,
            granted: state.granted + grant,
        };
    }

    let remaining = (state.balance - plan.cost_at(state.age)).max(0.0);
    FundState {
        age: state.age + 1,
        balance: remaining * (1.0 + plan.return_rate),
        ..state
    }
}

fn balance_at_enrollment(plan: &Plan, monthly: f64) -> f64 {
    fund_states(plan, monthly)
        .find(|state| state.age == plan.enrollment_age)
        .map_or(0.0, |state| state.balance)
}

fn solve_monthly(plan: &Plan, needed: f64, return_pct: f64) -> Option<f64> {
    if plan.current_savings * growth_factor(plan.return_rate, plan.savings_years()) >= needed {
        return Some(0.0);
    }
    if plan.savings_years() == 0 {
        return None;
    }

    let without_grant = required_contribution(
        needed,
        plan.current_savings,
        sanitize(return_pct, 0.0),
        plan.savings_years(),
    );
    if plan.grant.is_none() || without_grant <= 0.0 {
        return Some(without_grant);
    }

    let outcome = bisect_increasing(
        |monthly| balance_at_enrollment(plan, monthly),
        needed,
        0.0,
        without_grant,
        CONTRIBUTION_TOLERANCE,
        MAX_ITERATIONS,
    );
    match outcome {
        SearchOutcome::MetAtLowerBound => Some(0.0),
        SearchOutcome::Found { value, .. } => Some(value),
        // The grant only ever adds to the fund, so this is not expected.
        SearchOutcome::Unreachable => Some(without_grant),
    }
}
