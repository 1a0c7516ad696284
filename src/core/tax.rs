use super::projection::non_negative;
use super::tax_tables::{
    DeductionRules, PreferentialBucket, PreferentialTreatment, TaxTables, canada_2025,
    united_kingdom_2025, united_states_2025,
};
use super::types::{
    DeductionChoice, FilingStatus, ItemizedDeductions, Jurisdiction, PayrollBreakdown, TaxInput,
    TaxResult,
};

/// Anything that can turn one year's income into a tax bill.
pub trait TaxRegime {
    fn compute_tax(&self, input: &TaxInput) -> TaxResult;
}

impl Jurisdiction {
    pub fn tables(self) -> TaxTables {
        match self {
            Jurisdiction::UnitedStates => united_states_2025(),
            Jurisdiction::UnitedKingdom => united_kingdom_2025(),
            Jurisdiction::Canada => canada_2025(),
        }
    }
}

impl TaxRegime for Jurisdiction {
    fn compute_tax(&self, input: &TaxInput) -> TaxResult {
        self.tables().compute_tax(input)
    }
}

impl TaxRegime for TaxTables {
    fn compute_tax(&self, input: &TaxInput) -> TaxResult {
        compute_with_tables(self, input)
    }
}

#[derive(Debug, Clone, Copy)]
struct IncomeBase {
    wages: f64,
    gains: f64,
    pretax: f64,
    total_income: f64,
    adjusted_income: f64,
    ordinary_income: f64,
}

impl IncomeBase {
    fn from_input(input: &TaxInput) -> Self {
        let wages = non_negative(input.wages);
        let other = non_negative(input.other_ordinary_income);
        let gains = non_negative(input.long_term_gains);
        let pretax = non_negative(input.pretax_deductions).min(wages + other);
        let total_income = wages + other + gains;
        Self {
            wages,
            gains,
            pretax,
            total_income,
            adjusted_income: total_income - pretax,
            ordinary_income: wages + other - pretax,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IncomeTax {
    ordinary_taxable: f64,
    preferential_taxable: f64,
    ordinary_tax: f64,
    preferential_tax: f64,
    marginal_rate: f64,
}

fn compute_with_tables(tables: &TaxTables, input: &TaxInput) -> TaxResult {
    let base = IncomeBase::from_input(input);
    let status = input.filing_status;

    let standard_deduction = standard_deduction(&tables.deductions, status, base.adjusted_income);
    let itemized_deduction = itemized_deduction(
        &tables.deductions,
        &input.itemized,
        standard_deduction,
        base.adjusted_income,
    );
    let deduction_used = match input.deduction_choice {
        DeductionChoice::Standard => standard_deduction,
        DeductionChoice::Itemized => itemized_deduction,
    };

    let income_tax = income_tax(tables, status, &base, deduction_used);
    let payroll = payroll_contributions(tables, status, base.wages);
    let payroll_contributions = payroll.total();
    let total_tax = income_tax.ordinary_tax + income_tax.preferential_tax + payroll_contributions;
    let effective_rate = if base.total_income > 0.0 {
        total_tax / base.total_income
    } else {
        0.0
    };

    TaxResult {
        total_income: base.total_income,
        ordinary_taxable_income: income_tax.ordinary_taxable,
        preferential_taxable_income: income_tax.preferential_taxable,
        ordinary_tax: income_tax.ordinary_tax,
        preferential_tax: income_tax.preferential_tax,
        payroll,
        payroll_contributions,
        total_tax,
        net_pay: base.total_income - total_tax - base.pretax,
        effective_rate,
        marginal_rate: income_tax.marginal_rate,
        deduction_used,
        standard_deduction,
        itemized_deduction,
    }
}

fn standard_deduction(rules: &DeductionRules, status: FilingStatus, adjusted_income: f64) -> f64 {
    let amount = *rules.standard.get(status);
    match rules.taper {
        Some(taper) => {
            let excess = (adjusted_income - taper.start).max(0.0);
            (amount - excess * taper.withdrawal_ratio).max(0.0)
        }
        None => amount,
    }
}

fn itemized_deduction(
    rules: &DeductionRules,
    itemized: &ItemizedDeductions,
    standard: f64,
    adjusted_income: f64,
) -> f64 {
    let limits = rules.itemized;
    let state_local = non_negative(itemized.state_local_taxes).min(limits.state_local_cap.max(0.0));
    let medical = if limits.medical_floor_pct >= 100.0 {
        0.0
    } else {
        let floor = adjusted_income.max(0.0) * limits.medical_floor_pct.max(0.0) / 100.0;
        (non_negative(itemized.medical) - floor).max(0.0)
    };
    let mortgage = if limits.mortgage_interest {
        non_negative(itemized.mortgage_interest)
    } else {
        0.0
    };
    let charitable = if limits.charitable {
        non_negative(itemized.charitable)
    } else {
        0.0
    };

    let components = state_local + medical + mortgage + charitable;
    if rules.standard_always_applies {
        standard + components
    } else {
        components
    }
}

fn income_tax(
    tables: &TaxTables,
    status: FilingStatus,
    base: &IncomeBase,
    deduction: f64,
) -> IncomeTax {
    let table = tables.ordinary.get(status);
    let ordinary_tax_on = |taxable: f64| {
        table.tax(taxable) + tables.regional.as_ref().map_or(0.0, |r| r.tax(taxable))
    };

    let ordinary_taxable = (base.ordinary_income - deduction).max(0.0);
    let leftover_deduction = (deduction - base.ordinary_income).max(0.0);
    let ordinary_tax = ordinary_tax_on(ordinary_taxable);
    let marginal_rate = table.marginal_rate(ordinary_taxable)
        + tables
            .regional
            .as_ref()
            .map_or(0.0, |r| r.marginal_rate(ordinary_taxable));

    let (preferential_taxable, preferential_tax) = match &tables.preferential {
        PreferentialTreatment::Stacked { exemption, buckets } => {
            let taxable = (base.gains - leftover_deduction - exemption.max(0.0)).max(0.0);
            let tax = stacked_gains_tax(ordinary_taxable, taxable, buckets.get(status));
            (taxable, tax)
        }
        PreferentialTreatment::Inclusion { inclusion_rate } => {
            let included = base.gains * inclusion_rate.clamp(0.0, 1.0);
            let combined_taxable = (base.ordinary_income + included - deduction).max(0.0);
            let taxable = combined_taxable - ordinary_taxable;
            (taxable, ordinary_tax_on(combined_taxable) - ordinary_tax)
        }
    };

    IncomeTax {
        ordinary_taxable,
        preferential_taxable,
        ordinary_tax,
        preferential_tax,
        marginal_rate,
    }
}

/// Gains are placed above ordinary taxable income: each bucket only takes
/// what is left between the current stack height and its ceiling.
fn stacked_gains_tax(ordinary_taxable: f64, gains: f64, buckets: &[PreferentialBucket]) -> f64 {
    let mut remaining = gains;
    let mut stack_height = ordinary_taxable;
    let mut tax = 0.0;
    for bucket in buckets {
        if remaining <= 0.0 {
            break;
        }
        let room = bucket
            .ceiling
            .map_or(remaining, |ceiling| (ceiling - stack_height).max(0.0));
        let taken = remaining.min(room);
        tax += taken * bucket.rate;
        remaining -= taken;
        stack_height += taken;
    }
    tax
}

fn payroll_contributions(tables: &TaxTables, status: FilingStatus, wages: f64) -> PayrollBreakdown {
    let schedule = &tables.payroll;
    PayrollBreakdown {
        primary: schedule.primary_tier().contribution(wages),
        secondary: schedule.secondary_tier().contribution(wages),
        surtax: schedule.surtax_tier(status).contribution(wages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn input(status: FilingStatus) -> TaxInput {
        TaxInput {
            filing_status: status,
            wages: 0.0,
            other_ordinary_income: 0.0,
            long_term_gains: 0.0,
            pretax_deductions: 0.0,
            itemized: ItemizedDeductions::default(),
            deduction_choice: DeductionChoice::Standard,
        }
    }

    fn other_income(jurisdiction: Jurisdiction, amount: f64) -> TaxResult {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.other_ordinary_income = amount;
        jurisdiction.compute_tax(&tax_input)
    }

    fn assert_result_identities(result: &TaxResult, pretax: f64) {
        assert_approx(
            result.total_tax,
            result.ordinary_tax + result.preferential_tax + result.payroll_contributions,
        );
        assert_approx(
            result.net_pay,
            result.total_income - result.total_tax - pretax,
        );
        if result.total_income > 0.0 {
            assert_approx(result.effective_rate, result.total_tax / result.total_income);
        } else {
            assert_eq!(result.effective_rate, 0.0);
        }
    }

    #[test]
    fn single_filer_lands_in_twenty_two_percent_bracket() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.wages = 95_000.0;
        tax_input.pretax_deductions = 5_000.0;

        let result = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        let table = united_states_2025();
        let brackets = table.ordinary.get(FilingStatus::Single);

        assert_approx(result.deduction_used, 15_000.0);
        assert_approx(result.ordinary_taxable_income, 75_000.0);
        assert_approx(result.ordinary_tax, 11_414.0);
        assert!(result.ordinary_tax > brackets.tax(48_475.0));
        assert!(result.ordinary_tax < brackets.tax(103_350.0));
        assert_approx(result.marginal_rate, 0.22);
        assert_result_identities(&result, 5_000.0);
    }

    #[test]
    fn zero_and_negative_income_owe_nothing() {
        for jurisdiction in [
            Jurisdiction::UnitedStates,
            Jurisdiction::UnitedKingdom,
            Jurisdiction::Canada,
        ] {
            let zero = other_income(jurisdiction, 0.0);
            assert_eq!(zero.total_tax, 0.0);
            assert_eq!(zero.effective_rate, 0.0);

            let negative = other_income(jurisdiction, -50_000.0);
            assert_eq!(negative.total_tax, 0.0);
            assert_eq!(negative.total_income, 0.0);

            let nan = other_income(jurisdiction, f64::NAN);
            assert_eq!(nan.total_tax, 0.0);
        }
    }

    #[test]
    fn low_income_marginal_rate_is_lowest_bracket() {
        let below_deduction = other_income(Jurisdiction::UnitedStates, 10_000.0);
        assert_approx(below_deduction.marginal_rate, 0.10);

        let first_bracket = other_income(Jurisdiction::UnitedStates, 16_000.0);
        assert_approx(first_bracket.ordinary_taxable_income, 1_000.0);
        assert_approx(first_bracket.ordinary_tax, 100.0);
        assert_approx(first_bracket.marginal_rate, 0.10);
    }

    #[test]
    fn gains_fill_zero_bucket_room_before_fifteen_percent() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.other_ordinary_income = 55_000.0;
        tax_input.long_term_gains = 20_000.0;

        let result = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_approx(result.ordinary_taxable_income, 40_000.0);
        assert_approx(result.preferential_taxable_income, 20_000.0);
        // 8,350 of room left under the 48,350 ceiling, remaining 11,650 at 15%.
        assert_approx(result.preferential_tax, 1_747.5);
        assert_result_identities(&result, 0.0);
    }

    #[test]
    fn gains_above_top_ceiling_use_top_rate() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.other_ordinary_income = 615_000.0;
        tax_input.long_term_gains = 10_000.0;

        let result = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_approx(result.preferential_tax, 2_000.0);
        assert_approx(result.marginal_rate, 0.35);
    }

    #[test]
    fn unused_deduction_shelters_gains() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.long_term_gains = 50_000.0;

        let result = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_eq!(result.ordinary_taxable_income, 0.0);
        assert_approx(result.preferential_taxable_income, 35_000.0);
        assert_eq!(result.preferential_tax, 0.0);
    }

    #[test]
    fn joint_filers_get_wider_gain_buckets() {
        let mut single = input(FilingStatus::Single);
        single.other_ordinary_income = 80_000.0;
        single.long_term_gains = 30_000.0;
        let mut joint = single;
        joint.filing_status = FilingStatus::MarriedJoint;

        let single_result = Jurisdiction::UnitedStates.compute_tax(&single);
        let joint_result = Jurisdiction::UnitedStates.compute_tax(&joint);
        assert_approx(single_result.preferential_tax, 4_500.0);
        assert_approx(joint_result.preferential_tax, 0.0);
    }

    #[test]
    fn itemized_components_are_capped_and_floored() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.wages = 100_000.0;
        tax_input.itemized = ItemizedDeductions {
            state_local_taxes: 25_000.0,
            mortgage_interest: 8_000.0,
            charitable: 2_000.0,
            medical: 10_000.0,
        };

        let standard = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_approx(standard.standard_deduction, 15_000.0);
        // SALT capped to 10,000; medical above 7.5% of 100,000 is 2,500.
        assert_approx(standard.itemized_deduction, 22_500.0);
        assert_approx(standard.deduction_used, 15_000.0);

        tax_input.deduction_choice = DeductionChoice::Itemized;
        let itemized = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_approx(itemized.deduction_used, 22_500.0);
        assert_approx(itemized.ordinary_taxable_income, 77_500.0);
        assert!(itemized.ordinary_tax < standard.ordinary_tax);
    }

    #[test]
    fn us_payroll_tiers_follow_wage_base_and_status_threshold() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.wages = 250_000.0;

        let single = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_approx(single.payroll.primary, 10_918.2);
        assert_approx(single.payroll.secondary, 3_625.0);
        assert_approx(single.payroll.surtax, 450.0);
        assert_approx(single.payroll_contributions, 14_993.2);

        tax_input.filing_status = FilingStatus::MarriedJoint;
        let joint = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        assert_eq!(joint.payroll.surtax, 0.0);
        assert_result_identities(&joint, 0.0);
    }

    #[test]
    fn pretax_deductions_do_not_reduce_payroll() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.wages = 50_000.0;
        let without = Jurisdiction::UnitedStates.compute_tax(&tax_input);
        tax_input.pretax_deductions = 10_000.0;
        let with = Jurisdiction::UnitedStates.compute_tax(&tax_input);

        assert_approx(with.payroll_contributions, without.payroll_contributions);
        assert!(with.ordinary_tax < without.ordinary_tax);
        assert_result_identities(&with, 10_000.0);
    }

    #[test]
    fn uk_bands_and_national_insurance() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.wages = 60_000.0;

        let result = Jurisdiction::UnitedKingdom.compute_tax(&tax_input);
        assert_approx(result.ordinary_taxable_income, 47_430.0);
        assert_approx(result.ordinary_tax, 11_432.0);
        assert_approx(result.marginal_rate, 0.40);
        assert_approx(result.payroll.primary, 3_016.0);
        assert_approx(result.payroll.secondary, 194.6);
        assert_eq!(result.payroll.surtax, 0.0);
        assert_result_identities(&result, 0.0);
    }

    #[test]
    fn uk_personal_allowance_tapers_above_threshold() {
        let result = other_income(Jurisdiction::UnitedKingdom, 110_000.0);
        assert_approx(result.standard_deduction, 7_570.0);
        assert_approx(result.ordinary_tax, 33_432.0);

        let fully_tapered = other_income(Jurisdiction::UnitedKingdom, 130_000.0);
        assert_eq!(fully_tapered.standard_deduction, 0.0);
    }

    #[test]
    fn uk_gains_use_exemption_and_remaining_basic_band() {
        let mut tax_input = input(FilingStatus::Single);
        tax_input.other_ordinary_income = 30_000.0;
        tax_input.long_term_gains = 13_000.0;

        let result = Jurisdiction::UnitedKingdom.compute_tax(&tax_input);
        assert_approx(result.preferential_taxable_income, 10_000.0);
        assert_approx(result.preferential_tax, 1_800.0);
    }

    #[test]
    fn uk_itemized_keeps_personal_allowance() {
        let mut tax_input = input(FilingStatus::MarriedJoint);
        tax_input.other_ordinary_income = 40_000.0;
        tax_input.itemized.charitable = 1_000.0;
        tax_input.itemized.mortgage_interest = 5_000.0;
        tax_input.deduction_choice = DeductionChoice::Itemized;

        let result = Jurisdiction::UnitedKingdom.compute_tax(&tax_input);
        assert_approx(result.itemized_deduction, 13_570.0);
        assert_approx(result.deduction_used, 13_570.0);
    }

    #[test]
    fn canada_adds_regional_layer_and_includes_half_of_gains() {
        let result = other_income(Jurisdiction::Canada, 100_000.0);
        assert_approx(result.ordinary_taxable_income, 83_871.0);
        assert_approx(result.ordinary_tax, 19_543.8005);
        assert_approx(result.marginal_rate, 0.205 + 0.0915);

        let mut tax_input = input(FilingStatus::Single);
        tax_input.other_ordinary_income = 100_000.0;
        tax_input.long_term_gains = 20_000.0;
        let with_gains = Jurisdiction::Canada.compute_tax(&tax_input);
        assert_approx(with_gains.preferential_taxable_income, 10_000.0);
        assert_approx(with_gains.preferential_tax, 2_965.0);
        assert_approx(with_gains.ordinary_tax, result.ordinary_tax);
    }

    #[test]
    fn canada_payroll_tiers() {
        let mut tax_input = input(FilingStatus::HeadOfHousehold);
        tax_input.wages = 90_000.0;

        let result = Jurisdiction::Canada.compute_tax(&tax_input);
        assert_approx(result.payroll.primary, 4_034.1);
        assert_approx(result.payroll.secondary, 1_476.0);
        assert_approx(result.payroll.surtax, 748.0);
    }

    #[test]
    fn secondary_payroll_keeps_growing_above_every_cap() {
        for jurisdiction in [
            Jurisdiction::UnitedStates,
            Jurisdiction::UnitedKingdom,
            Jurisdiction::Canada,
        ] {
            let mut tax_input = input(FilingStatus::Single);
            tax_input.wages = 300_000.0;
            let lower = jurisdiction.compute_tax(&tax_input);
            tax_input.wages = 400_000.0;
            let higher = jurisdiction.compute_tax(&tax_input);

            assert_approx(higher.payroll.primary, lower.payroll.primary);
            assert!(
                higher.payroll.secondary > lower.payroll.secondary,
                "{jurisdiction:?} secondary stopped at {}",
                lower.payroll.secondary
            );
            assert!(higher.payroll.surtax >= lower.payroll.surtax);
        }
    }

    #[test]
    fn ordinary_tax_is_continuous_at_every_bracket_boundary() {
        for jurisdiction in [
            Jurisdiction::UnitedStates,
            Jurisdiction::UnitedKingdom,
            Jurisdiction::Canada,
        ] {
            let tables = jurisdiction.tables();
            let table = tables.ordinary.get(FilingStatus::Single);
            for bracket in table.brackets() {
                let Some(boundary) = bracket.upper_bound else {
                    continue;
                };
                for epsilon in [1.0, 1e-3, 1e-6] {
                    let jump = table.tax(boundary + epsilon) - table.tax(boundary);
                    assert!(jump >= 0.0);
                    assert!(
                        jump <= epsilon * 0.5 + 1e-9,
                        "{jurisdiction:?} jump {jump} at {boundary}"
                    );
                }
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(96))]

        #[test]
        fn prop_ordinary_tax_is_monotonic(
            low in 0u32..900_000,
            delta in 0u32..200_000,
            status_idx in 0usize..3
        ) {
            let status = [
                FilingStatus::Single,
                FilingStatus::MarriedJoint,
                FilingStatus::HeadOfHousehold,
            ][status_idx];
            for jurisdiction in [
                Jurisdiction::UnitedStates,
                Jurisdiction::UnitedKingdom,
                Jurisdiction::Canada,
            ] {
                let mut a = input(status);
                a.wages = low as f64;
                let mut b = a;
                b.wages = (low + delta) as f64;
                let tax_a = jurisdiction.compute_tax(&a);
                let tax_b = jurisdiction.compute_tax(&b);
                prop_assert!(tax_b.ordinary_tax + 1e-9 >= tax_a.ordinary_tax);
            }
        }

        #[test]
        fn prop_effective_rate_bounded_by_marginal_for_ordinary_income(
            income in 0u32..2_000_000,
        ) {
            for jurisdiction in [
                Jurisdiction::UnitedStates,
                Jurisdiction::UnitedKingdom,
                Jurisdiction::Canada,
            ] {
                let result = other_income(jurisdiction, income as f64);
                prop_assert!(result.effective_rate >= 0.0);
                prop_assert!(result.effective_rate <= result.marginal_rate + 1e-12);
            }
        }

        #[test]
        fn prop_result_identities_hold(
            wages in 0u32..500_000,
            other in 0u32..200_000,
            gains in 0u32..300_000,
            pretax in 0u32..30_000,
            itemize in proptest::bool::ANY
        ) {
            for jurisdiction in [
                Jurisdiction::UnitedStates,
                Jurisdiction::UnitedKingdom,
                Jurisdiction::Canada,
            ] {
                let mut tax_input = input(FilingStatus::Single);
                tax_input.wages = wages as f64;
                tax_input.other_ordinary_income = other as f64;
                tax_input.long_term_gains = gains as f64;
                tax_input.pretax_deductions = pretax as f64;
                tax_input.itemized.charitable = 3_000.0;
                if itemize {
                    tax_input.deduction_choice = DeductionChoice::Itemized;
                }
                let result = jurisdiction.compute_tax(&tax_input);
                let used_pretax = (pretax as f64).min((wages + other) as f64);
                prop_assert!((result.total_tax
                    - (result.ordinary_tax + result.preferential_tax + result.payroll_contributions))
                    .abs() < 1e-6);
                prop_assert!((result.net_pay
                    - (result.total_income - result.total_tax - used_pretax))
                    .abs() < 1e-6);
                prop_assert!(result.preferential_tax >= 0.0);
            }
        }
    }
}
