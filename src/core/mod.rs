mod amortization;
mod education;
mod engine;
mod projection;
mod solver;
mod tax;
mod tax_tables;
mod types;

pub use amortization::{
    analyze_refinance, best_refinance, build_schedule, monthly_payment, remaining_cost,
};
pub use education::plan_education;
pub use engine::simulate;
pub use projection::{nominal, real};
pub use solver::{
    MAX_ITERATIONS, RATE_CEILING_PCT, RATE_FLOOR_PCT, RATE_TOLERANCE_PCT, SearchOutcome,
    bisect_increasing, required_contribution, required_return,
};
pub use tax::TaxRegime;
pub use tax_tables::{
    AllowanceTaper, BracketTable, ByStatus, ContributionTier, DeductionRules, ItemizedRules,
    PayrollSchedule, PreferentialBucket, PreferentialTreatment, TaxBracket, TaxTableError,
    TaxTables, canada_2025, united_kingdom_2025, united_states_2025,
};
pub use types::{
    AccountBalances, AmortizationEntry, AmortizationSchedule, DeductionChoice, EducationInput,
    EducationPoint, EducationResult, FilingStatus, GrantRule, ItemizedDeductions, Jurisdiction,
    PayrollBreakdown, ProjectionPoint, RefinanceCandidate, RefinanceScenario, RetirementInput,
    RetirementTarget, ReturnAssumption, SimulationResult, TaxInput, TaxResult,
};
