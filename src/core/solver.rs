use super::projection::{annuity_factor, future_value, growth_factor, non_negative, pct_to_rate};

/// Search domain for [`required_return`], in whole-number percent.
pub const RATE_FLOOR_PCT: f64 = -50.0;
pub const RATE_CEILING_PCT: f64 = 50.0;
pub const RATE_TOLERANCE_PCT: f64 = 1e-7;
pub const MAX_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchOutcome {
    /// The lower bound already reaches the target.
    MetAtLowerBound,
    Unreachable,
    Found {
        value: f64,
        iterations: u32,
        converged: bool,
    },
}

/// Smallest `x` in `[lo, hi]` with `eval(x) >= target`, for non-decreasing
/// `eval`. Work is bounded by `max_iterations`; when that runs out the upper
/// end of the last bracket is returned with `converged == false`.
pub fn bisect_increasing<F>(
    eval: F,
    target: f64,
    lo: f64,
    hi: f64,
    tolerance: f64,
    max_iterations: u32,
) -> SearchOutcome
where
    F: Fn(f64) -> f64,
{
    if eval(lo) >= target {
        return SearchOutcome::MetAtLowerBound;
    }
    if eval(hi) < target {
        return SearchOutcome::Unreachable;
    }

    let mut lo = lo;
    let mut hi = hi;
    let mut it = 0;
    while it < max_iterations {
        it += 1;
        let mid = (lo + hi) * 0.5;
        if eval(mid) >= target {
            hi = mid;
        } else {
            lo = mid;
        }

        if (hi - lo).abs() <= tolerance {
            return SearchOutcome::Found {
                value: hi,
                iterations: it,
                converged: true,
            };
        }
    }

    SearchOutcome::Found {
        value: hi,
        iterations: it,
        converged: false,
    }
}

/// Monthly contribution that grows `current_balance` into `target_nominal`
/// over `years`, crediting twelve months of contributions at each year end.
pub fn required_contribution(
    target_nominal: f64,
    current_balance: f64,
    annual_rate_pct: f64,
    years: u32,
) -> f64 {
    if years == 0 {
        return 0.0;
    }
    let target = non_negative(target_nominal);
    let balance = non_negative(current_balance);
    let rate = pct_to_rate(annual_rate_pct);

    let shortfall = target - balance * growth_factor(rate, years);
    if shortfall <= 0.0 {
        return 0.0;
    }
    let factor = annuity_factor(rate, years);
    if !factor.is_finite() || factor <= 0.0 {
        return 0.0;
    }
    shortfall / factor / 12.0
}

/// Average annual return, in percent, that reaches `target_nominal`.
///
/// `None` when no rate in the search domain is needed (the target is met even
/// at the floor) or none is enough.
pub fn required_return(
    target_nominal: f64,
    current_balance: f64,
    monthly_contribution: f64,
    years: u32,
) -> Option<f64> {
    if years == 0 {
        return None;
    }
    let target = non_negative(target_nominal);
    let balance = non_negative(current_balance);
    let annual_contribution = non_negative(monthly_contribution) * 12.0;

    let outcome = bisect_increasing(
        |pct| future_value(balance, annual_contribution, pct_to_rate(pct), years),
        target,
        RATE_FLOOR_PCT,
        RATE_CEILING_PCT,
        RATE_TOLERANCE_PCT,
        MAX_ITERATIONS,
    );
    match outcome {
        SearchOutcome::Found { value, .. } => Some(value),
        SearchOutcome::MetAtLowerBound | SearchOutcome::Unreachable => None,
    }
}
