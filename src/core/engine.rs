use std::iter;

use super::projection::{
    MAX_HORIZON_YEARS, accumulate_year, growth_factor, nominal, non_negative, pct_to_rate, real,
    sanitize,
};
use super::types::{
    AccountBalances, ProjectionPoint, RetirementInput, RetirementTarget, ReturnAssumption,
    SimulationResult,
};

impl ReturnAssumption {
    pub fn annual_pct(self) -> f64 {
        match self {
            ReturnAssumption::Conservative => 4.0,
            ReturnAssumption::Balanced => 6.0,
            ReturnAssumption::Aggressive => 8.0,
            ReturnAssumption::Custom(pct) => sanitize(pct, 0.0),
        }
    }
}

/// Everything the yearly step needs, resolved once from the input.
#[derive(Debug, Clone, Copy)]
struct Plan {
    current_age: u32,
    retirement_age: u32,
    life_expectancy: u32,
    growth_rate: f64,
    inflation_rate: f64,
    annual_contribution: f64,
    contribution_growth_rate: f64,
    /// Gross yearly withdrawal in today's money.
    drawdown_real: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct YearState {
    age: u32,
    balance: f64,
    contributed: f64,
    withdrawn: f64,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedTarget {
    income_real: Option<f64>,
    corpus_real: f64,
    drawdown_real: f64,
}

pub fn simulate(input: &RetirementInput) -> SimulationResult {
    let current_age = input.current_age;
    let horizon_end = current_age.saturating_add(MAX_HORIZON_YEARS);
    let retirement_age = input.retirement_age.clamp(current_age, horizon_end);
    let life_expectancy = input.life_expectancy.clamp(retirement_age, horizon_end);

    let withdrawal_rate = pct_to_rate(input.withdrawal_rate_pct).max(0.0);
    let tax_drag = withdrawal_tax_share(&input.balances)
        * pct_to_rate(input.retirement_tax_rate_pct).clamp(0.0, 0.99);
    let external_income_real = non_negative(input.external_income_real);
    let target = resolve_target(
        input.target,
        external_income_real,
        withdrawal_rate,
        tax_drag,
    );

    let plan = Plan {
        current_age,
        retirement_age,
        life_expectancy,
        growth_rate: pct_to_rate(input.return_assumption.annual_pct()),
        inflation_rate: pct_to_rate(input.inflation_pct),
        annual_contribution: non_negative(input.monthly_contribution) * 12.0,
        contribution_growth_rate: pct_to_rate(input.contribution_growth_pct),
        drawdown_real: target.drawdown_real,
    };

    let initial = YearState {
        age: current_age,
        balance: non_negative(input.balances.total()),
        contributed: 0.0,
        withdrawn: 0.0,
    };
    let points: Vec<ProjectionPoint> = iter::successors(Some(initial), |state| {
        (state.age < plan.life_expectancy).then(|| step(&plan, *state))
    })
    .map(|state| to_point(&plan, state))
    .collect();

    let years_to_retirement = retirement_age - current_age;
    let projected_balance_nominal = points
        .iter()
        .find(|p| p.age == retirement_age)
        .map_or(0.0, |p| p.nominal_balance);
    let projected_balance_real = real(
        projected_balance_nominal,
        years_to_retirement,
        plan.inflation_rate,
    );
    let projected_income_real =
        projected_balance_real * withdrawal_rate * (1.0 - tax_drag) + external_income_real;

    let solvency_age = if plan.drawdown_real > 0.0 {
        points
            .iter()
            .find(|p| p.age >= retirement_age && p.nominal_balance <= 0.0)
            .map(|p| p.age)
    } else {
        None
    };

    let meets_target = match target.income_real {
        Some(income) => projected_income_real + 1e-9 >= income,
        None => projected_balance_real + 1e-9 >= target.corpus_real,
    };

    SimulationResult {
        target_corpus_real: target.corpus_real,
        target_corpus_nominal: nominal(
            target.corpus_real,
            years_to_retirement,
            plan.inflation_rate,
        ),
        projected_balance_nominal,
        projected_balance_real,
        projected_income_real,
        solvency_age,
        on_track: solvency_age.is_none() && meets_target,
        points,
    }
}

/// Advances one year. Before retirement: growth, then the year's
/// contribution. From retirement on: growth, then the inflation-adjusted
/// withdrawal; a depleted balance stays at zero.
fn step(plan: &Plan, state: YearState) -> YearState {
    let years_elapsed = state.age - plan.current_age;

    if state.age < plan.retirement_age {
        let contribution = plan.annual_contribution
            * growth_factor(plan.contribution_growth_rate, years_elapsed);
        return YearState {
            age: state.age + 1,
            balance: accumulate_year(state.balance, plan.growth_rate, contribution),
            contributed: state.contributed + contribution,
            withdrawn: state.withdrawn,
        };
    }

    let grown = (state.balance * (1.0 + plan.growth_rate)).max(0.0);
    let wanted = nominal(plan.drawdown_real, years_elapsed, plan.inflation_rate);
    let taken = wanted.min(grown);
    YearState {
        age: state.age + 1,
        balance: grown - taken,
        contributed: state.contributed,
        withdrawn: state.withdrawn + taken,
    }
}

fn to_point(plan: &Plan, state: YearState) -> ProjectionPoint {
    let years_elapsed = state.age - plan.current_age;
    ProjectionPoint {
        age: state.age,
        nominal_balance: state.balance,
        real_balance: real(state.balance, years_elapsed, plan.inflation_rate),
        contributed: state.contributed,
        withdrawn: state.withdrawn,
    }
}

/// Share of each withdrawal that is taxable: the pre-tax pot in full and the
/// unrealised-gain part of the taxable pot.
fn withdrawal_tax_share(balances: &AccountBalances) -> f64 {
    let pre_tax = non_negative(balances.pre_tax);
    let tax_free = non_negative(balances.tax_free);
    let taxable = non_negative(balances.taxable);
    let total = pre_tax + tax_free + taxable;
    if total <= 0.0 {
        return 1.0;
    }
    let gain_fraction = if taxable > 0.0 {
        (1.0 - non_negative(balances.taxable_basis) / taxable).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (pre_tax + taxable * gain_fraction) / total
}

fn resolve_target(
    target: RetirementTarget,
    external_income_real: f64,
    withdrawal_rate: f64,
    tax_drag: f64,
) -> ResolvedTarget {
    match target {
        RetirementTarget::Income(income) => {
            let income = non_negative(income);
            let net_needed = (income - external_income_real).max(0.0);
            let gross_needed = net_needed / (1.0 - tax_drag);
            let corpus_real = if withdrawal_rate > 0.0 {
                gross_needed / withdrawal_rate
            } else {
                0.0
            };
            ResolvedTarget {
                income_real: Some(income),
                corpus_real,
                drawdown_real: gross_needed,
            }
        }
        RetirementTarget::Corpus(corpus) => {
            let corpus_real = non_negative(corpus);
            ResolvedTarget {
                income_real: None,
                corpus_real,
                drawdown_real: corpus_real * withdrawal_rate,
            }
        }
    }
}
