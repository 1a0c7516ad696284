use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingStatus {
    Single,
    #[serde(alias = "married", alias = "marriedJoint", alias = "married_joint")]
    MarriedJoint,
    #[serde(alias = "headOfHousehold", alias = "head_of_household")]
    HeadOfHousehold,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Jurisdiction {
    #[serde(alias = "us", alias = "usa", alias = "unitedStates")]
    UnitedStates,
    #[serde(alias = "uk", alias = "unitedKingdom")]
    UnitedKingdom,
    #[serde(alias = "ca")]
    Canada,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeductionChoice {
    Standard,
    Itemized,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ItemizedDeductions {
    pub state_local_taxes: f64,
    pub mortgage_interest: f64,
    pub charitable: f64,
    pub medical: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxInput {
    pub filing_status: FilingStatus,
    pub wages: f64,
    pub other_ordinary_income: f64,
    pub long_term_gains: f64,
    pub pretax_deductions: f64,
    pub itemized: ItemizedDeductions,
    pub deduction_choice: DeductionChoice,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBreakdown {
    pub primary: f64,
    pub secondary: f64,
    pub surtax: f64,
}

impl PayrollBreakdown {
    pub fn total(self) -> f64 {
        self.primary + self.secondary + self.surtax
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub total_income: f64,
    pub ordinary_taxable_income: f64,
    pub preferential_taxable_income: f64,
    pub ordinary_tax: f64,
    pub preferential_tax: f64,
    pub payroll: PayrollBreakdown,
    pub payroll_contributions: f64,
    pub total_tax: f64,
    pub net_pay: f64,
    pub effective_rate: f64,
    pub marginal_rate: f64,
    pub deduction_used: f64,
    pub standard_deduction: f64,
    pub itemized_deduction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationEntry {
    pub period: u32,
    pub payment: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub remaining_balance: f64,
    pub cumulative_interest: f64,
    pub cumulative_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub entries: Vec<AmortizationEntry>,
    pub periodic_payment: f64,
    pub total_paid: f64,
    pub total_interest: f64,
    pub payoff_period: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinanceCandidate {
    pub term_years: u32,
    pub rate: f64,
    pub closing_costs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinanceScenario {
    pub candidate: RefinanceCandidate,
    pub new_payment: f64,
    pub monthly_savings: f64,
    /// `None` when the new payment saves nothing, i.e. never breaks even.
    pub break_even_months: Option<f64>,
    pub lifetime_savings: f64,
    pub is_viable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReturnAssumption {
    Conservative,
    Balanced,
    Aggressive,
    Custom(f64),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RetirementTarget {
    /// Desired yearly spending in today's money.
    Income(f64),
    /// Desired portfolio size at retirement in today's money.
    Corpus(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountBalances {
    pub pre_tax: f64,
    pub tax_free: f64,
    pub taxable: f64,
    pub taxable_basis: f64,
}

impl AccountBalances {
    pub fn total(&self) -> f64 {
        self.pre_tax + self.tax_free + self.taxable
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetirementInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub balances: AccountBalances,
    pub monthly_contribution: f64,
    pub contribution_growth_pct: f64,
    pub return_assumption: ReturnAssumption,
    pub inflation_pct: f64,
    pub withdrawal_rate_pct: f64,
    pub retirement_tax_rate_pct: f64,
    /// Pensions, social security and similar income in today's money.
    pub external_income_real: f64,
    pub target: RetirementTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub age: u32,
    pub nominal_balance: f64,
    pub real_balance: f64,
    pub contributed: f64,
    pub withdrawn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub points: Vec<ProjectionPoint>,
    pub target_corpus_real: f64,
    pub target_corpus_nominal: f64,
    pub projected_balance_nominal: f64,
    pub projected_balance_real: f64,
    pub projected_income_real: f64,
    pub solvency_age: Option<u32>,
    pub on_track: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrantRule {
    pub match_rate_pct: f64,
    pub annual_grant_cap: f64,
    pub lifetime_grant_cap: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EducationInput {
    pub child_age: u32,
    pub enrollment_age: u32,
    pub years_of_study: u32,
    pub annual_cost_today: f64,
    pub cost_inflation_pct: f64,
    pub current_savings: f64,
    pub monthly_contribution: f64,
    pub return_pct: f64,
    pub grant: Option<GrantRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationPoint {
    pub age: u32,
    pub nominal_balance: f64,
    pub real_balance: f64,
    pub yearly_cost: f64,
    pub contributed_total: f64,
    pub grant_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationResult {
    pub points: Vec<EducationPoint>,
    pub total_cost_nominal: f64,
    pub needed_at_enrollment: f64,
    pub projected_at_enrollment: f64,
    pub funding_gap: f64,
    /// `None` when no contribution level within reach closes the gap.
    pub required_monthly_contribution: Option<f64>,
    pub additional_monthly_contribution: Option<f64>,
    pub grant_received: f64,
}
