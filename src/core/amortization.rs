use super::projection::{ZERO_RATE_EPSILON, annual_pct_to_monthly_rate, exponent, non_negative};
use super::types::{AmortizationEntry, AmortizationSchedule, RefinanceCandidate, RefinanceScenario};

/// Balances below this are treated as paid off.
const PAYOFF_EPSILON: f64 = 1e-6;

/// Longest schedule that will be built, in years.
pub const MAX_TERM_YEARS: u32 = 100;

/// Level monthly payment that retires `principal` over `months`.
pub fn monthly_payment(principal: f64, annual_rate_pct: f64, months: u32) -> f64 {
    let principal = non_negative(principal);
    if months == 0 {
        return principal;
    }
    let r = annual_pct_to_monthly_rate(annual_rate_pct).max(0.0);
    if r < ZERO_RATE_EPSILON {
        return principal / months as f64;
    }
    principal * r / (1.0 - (1.0 + r).powi(-exponent(months)))
}

/// Everything still to be paid on an existing loan if it runs to term.
pub fn remaining_cost(balance: f64, annual_rate_pct: f64, remaining_months: u32) -> f64 {
    monthly_payment(balance, annual_rate_pct, remaining_months) * remaining_months as f64
}

pub fn build_schedule(
    principal: f64,
    annual_rate_pct: f64,
    term_years: u32,
    extra_payment: f64,
    extra_payment_start_period: u32,
) -> AmortizationSchedule {
    let principal = non_negative(principal);
    let extra_payment = non_negative(extra_payment);
    let months = term_years.min(MAX_TERM_YEARS) * 12;
    let rate = annual_pct_to_monthly_rate(annual_rate_pct).max(0.0);
    let periodic_payment = monthly_payment(principal, annual_rate_pct, months);

    let mut entries = Vec::with_capacity(months as usize);
    let mut balance = principal;
    let mut cumulative_interest = 0.0;
    let mut cumulative_paid = 0.0;

    for period in 1..=months {
        if balance <= PAYOFF_EPSILON {
            break;
        }

        let interest = balance * rate;
        let extra = if period >= extra_payment_start_period {
            extra_payment
        } else {
            0.0
        };
        let mut principal_paid = (periodic_payment - interest + extra).max(0.0);
        // Final period: clear the balance, including any floating residue.
        if principal_paid >= balance || period == months {
            principal_paid = balance;
        }

        balance = (balance - principal_paid).max(0.0);
        if balance <= PAYOFF_EPSILON {
            balance = 0.0;
        }

        let payment = principal_paid + interest;
        cumulative_interest += interest;
        cumulative_paid += payment;
        entries.push(AmortizationEntry {
            period,
            payment,
            principal_paid,
            interest_paid: interest,
            remaining_balance: balance,
            cumulative_interest,
            cumulative_paid,
        });
    }

    AmortizationSchedule {
        payoff_period: entries.last().map_or(0, |e| e.period),
        periodic_payment,
        total_paid: cumulative_paid,
        total_interest: cumulative_interest,
        entries,
    }
}

pub fn analyze_refinance(
    current_balance: f64,
    current_payment: f64,
    current_remaining_cost: f64,
    candidates: &[RefinanceCandidate],
) -> Vec<RefinanceScenario> {
    let current_balance = non_negative(current_balance);
    let current_payment = non_negative(current_payment);
    let current_remaining_cost = non_negative(current_remaining_cost);

    candidates
        .iter()
        .map(|candidate| {
            let closing_costs = non_negative(candidate.closing_costs);
            let new_term_months = candidate.term_years.saturating_mul(12);
            let new_payment = monthly_payment(current_balance, candidate.rate, new_term_months);
            let monthly_savings = current_payment - new_payment;
            let break_even_months = if monthly_savings > 0.0 {
                Some(closing_costs / monthly_savings)
            } else {
                None
            };
            let lifetime_savings =
                current_remaining_cost - (new_payment * new_term_months as f64 + closing_costs);

            RefinanceScenario {
                candidate: *candidate,
                new_payment,
                monthly_savings,
                break_even_months,
                lifetime_savings,
                is_viable: lifetime_savings > 0.0,
            }
        })
        .collect()
}

/// Viable scenario with the largest lifetime savings.
pub fn best_refinance(scenarios: &[RefinanceScenario]) -> Option<&RefinanceScenario> {
    scenarios
        .iter()
        .filter(|s| s.is_viable)
        .max_by(|a, b| a.lifetime_savings.total_cmp(&b.lifetime_savings))
}
