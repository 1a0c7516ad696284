pub const ZERO_RATE_EPSILON: f64 = 1e-9;

/// Longest yearly walk the simulator and education planner will take.
pub const MAX_HORIZON_YEARS: u32 = 150;

pub fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

pub fn non_negative(value: f64) -> f64 {
    sanitize(value, 0.0).max(0.0)
}

/// Whole-number percentage (`6.5`) to a decimal fraction, clamped above -100%.
pub fn pct_to_rate(pct: f64) -> f64 {
    (sanitize(pct, 0.0) / 100.0).max(-0.99)
}

pub fn annual_pct_to_monthly_rate(pct: f64) -> f64 {
    pct_to_rate(pct) / 12.0
}

/// Period count as a `powi` exponent, saturating at `i32::MAX`.
pub fn exponent(periods: u32) -> i32 {
    i32::try_from(periods).unwrap_or(i32::MAX)
}

pub fn growth_factor(rate: f64, years: u32) -> f64 {
    (1.0 + rate).powi(exponent(years))
}

/// Future value multiplier of `periods` equal end-of-period payments.
pub fn annuity_factor(rate: f64, periods: u32) -> f64 {
    if rate.abs() < ZERO_RATE_EPSILON {
        return periods as f64;
    }
    (growth_factor(rate, periods) - 1.0) / rate
}

/// Growth first, then the contribution is credited.
pub fn accumulate_year(balance: f64, rate: f64, contribution: f64) -> f64 {
    balance * (1.0 + rate) + contribution
}

pub fn future_value(balance: f64, annual_contribution: f64, rate: f64, years: u32) -> f64 {
    balance * growth_factor(rate, years) + annual_contribution * annuity_factor(rate, years)
}

pub fn real(value: f64, years: u32, inflation_rate: f64) -> f64 {
    let factor = growth_factor(inflation_rate, years);
    if factor <= 0.0 || !factor.is_finite() {
        return value;
    }
    value / factor
}

pub fn nominal(value_real: f64, years: u32, inflation_rate: f64) -> f64 {
    value_real * growth_factor(inflation_rate, years)
}

pub fn discount(amount: f64, rate: f64, years: u32) -> f64 {
    let factor = growth_factor(rate, years);
    if factor <= 0.0 || !factor.is_finite() {
        return amount;
    }
    amount / factor
}
