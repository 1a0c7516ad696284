use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AccountBalances, AmortizationSchedule, DeductionChoice, EducationInput, EducationResult,
    FilingStatus, GrantRule, ItemizedDeductions, Jurisdiction, RATE_CEILING_PCT, RATE_FLOOR_PCT,
    RefinanceCandidate, RefinanceScenario, RetirementInput, RetirementTarget, ReturnAssumption,
    SimulationResult, TaxInput, TaxRegime, TaxResult, analyze_refinance, best_refinance,
    build_schedule, monthly_payment, plan_education, remaining_cost, required_contribution,
    required_return, simulate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Tool {
    Tax,
    Amortization,
    Refinance,
    Retirement,
    Education,
    GoalContribution,
    GoalReturn,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Tax => "tax",
            Tool::Amortization => "amortization",
            Tool::Refinance => "refinance",
            Tool::Retirement => "retirement",
            Tool::Education => "education",
            Tool::GoalContribution => "goal-contribution",
            Tool::GoalReturn => "goal-return",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Tool::Tax => "/api/tax",
            Tool::Amortization => "/api/amortization",
            Tool::Refinance => "/api/refinance",
            Tool::Retirement => "/api/retirement",
            Tool::Education => "/api/education",
            Tool::GoalContribution => "/api/goal/contribution",
            Tool::GoalReturn => "/api/goal/return",
        }
    }
}

/// A request body for one calculator. Every field is optional; missing ones
/// fall back to the calculator's defaults before validation.
trait ToolPayload: DeserializeOwned + Send + 'static {
    const TOOL: Tool;
    type Output: Serialize;

    fn evaluate(self) -> Result<Self::Output, String>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiReturnAssumption {
    Conservative,
    Balanced,
    Aggressive,
    Custom,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTargetKind {
    Income,
    #[serde(alias = "nest-egg")]
    Corpus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    jurisdiction: Option<Jurisdiction>,
    filing_status: Option<FilingStatus>,
    wages: Option<f64>,
    other_income: Option<f64>,
    long_term_gains: Option<f64>,
    pretax_deductions: Option<f64>,
    deduction_choice: Option<DeductionChoice>,
    state_local_taxes: Option<f64>,
    mortgage_interest: Option<f64>,
    charitable: Option<f64>,
    medical: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AmortizationPayload {
    principal: Option<f64>,
    annual_rate_pct: Option<f64>,
    term_years: Option<u32>,
    extra_payment: Option<f64>,
    extra_payment_start_period: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RefinancePayload {
    current_balance: Option<f64>,
    current_rate_pct: Option<f64>,
    remaining_months: Option<u32>,
    candidates: Option<Vec<RefinanceCandidate>>,
    // Single-candidate form for query strings.
    candidate_term_years: Option<u32>,
    candidate_rate_pct: Option<f64>,
    candidate_closing_costs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RetirementPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    life_expectancy: Option<u32>,
    pre_tax_balance: Option<f64>,
    tax_free_balance: Option<f64>,
    taxable_balance: Option<f64>,
    taxable_basis: Option<f64>,
    monthly_contribution: Option<f64>,
    contribution_growth_pct: Option<f64>,
    return_assumption: Option<ApiReturnAssumption>,
    return_pct: Option<f64>,
    inflation_pct: Option<f64>,
    withdrawal_rate_pct: Option<f64>,
    retirement_tax_rate_pct: Option<f64>,
    external_income: Option<f64>,
    target_kind: Option<ApiTargetKind>,
    target_value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EducationPayload {
    child_age: Option<u32>,
    enrollment_age: Option<u32>,
    years_of_study: Option<u32>,
    annual_cost_today: Option<f64>,
    cost_inflation_pct: Option<f64>,
    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    return_pct: Option<f64>,
    grant_match_pct: Option<f64>,
    grant_annual_cap: Option<f64>,
    grant_lifetime_cap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoalContributionPayload {
    target_amount: Option<f64>,
    current_balance: Option<f64>,
    annual_rate_pct: Option<f64>,
    years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoalReturnPayload {
    target_amount: Option<f64>,
    current_balance: Option<f64>,
    monthly_contribution: Option<f64>,
    years: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    jurisdiction: Jurisdiction,
    tax_year: u16,
    filing_status: FilingStatus,
    #[serde(flatten)]
    result: TaxResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefinanceResponse {
    current_payment: f64,
    current_remaining_cost: f64,
    scenarios: Vec<RefinanceScenario>,
    best: Option<RefinanceScenario>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoalContributionResponse {
    target_amount: f64,
    years: u32,
    required_monthly_contribution: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoalReturnResponse {
    target_amount: f64,
    years: u32,
    required_return_pct: Option<f64>,
    search_floor_pct: f64,
    search_ceiling_pct: f64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn non_negative_field(name: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{name} must be >= 0"));
    }
    Ok(value)
}

fn ranged_field(name: &str, value: f64, min: f64, max: f64) -> Result<f64, String> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(format!("{name} must be between {min} and {max}"));
    }
    Ok(value)
}

fn default_tax_input() -> TaxInput {
    TaxInput {
        filing_status: FilingStatus::Single,
        wages: 75_000.0,
        other_ordinary_income: 0.0,
        long_term_gains: 0.0,
        pretax_deductions: 0.0,
        itemized: ItemizedDeductions::default(),
        deduction_choice: DeductionChoice::Standard,
    }
}

fn tax_input_from_payload(payload: &TaxPayload) -> Result<TaxInput, String> {
    let defaults = default_tax_input();
    let itemized = ItemizedDeductions {
        state_local_taxes: non_negative_field(
            "stateLocalTaxes",
            payload.state_local_taxes.unwrap_or(0.0),
        )?,
        mortgage_interest: non_negative_field(
            "mortgageInterest",
            payload.mortgage_interest.unwrap_or(0.0),
        )?,
        charitable: non_negative_field("charitable", payload.charitable.unwrap_or(0.0))?,
        medical: non_negative_field("medical", payload.medical.unwrap_or(0.0))?,
    };

    let input = TaxInput {
        filing_status: payload.filing_status.unwrap_or(defaults.filing_status),
        wages: non_negative_field("wages", payload.wages.unwrap_or(defaults.wages))?,
        other_ordinary_income: non_negative_field(
            "otherIncome",
            payload.other_income.unwrap_or(defaults.other_ordinary_income),
        )?,
        long_term_gains: non_negative_field(
            "longTermGains",
            payload.long_term_gains.unwrap_or(defaults.long_term_gains),
        )?,
        pretax_deductions: non_negative_field(
            "pretaxDeductions",
            payload.pretax_deductions.unwrap_or(defaults.pretax_deductions),
        )?,
        itemized,
        deduction_choice: payload.deduction_choice.unwrap_or(defaults.deduction_choice),
    };

    if input.pretax_deductions > input.wages + input.other_ordinary_income {
        return Err("pretaxDeductions must be <= wages + otherIncome".to_string());
    }
    Ok(input)
}

impl ToolPayload for TaxPayload {
    const TOOL: Tool = Tool::Tax;
    type Output = TaxResponse;

    fn evaluate(self) -> Result<TaxResponse, String> {
        let input = tax_input_from_payload(&self)?;
        let jurisdiction = self.jurisdiction.unwrap_or(Jurisdiction::UnitedStates);
        let tables = jurisdiction.tables();
        Ok(TaxResponse {
            jurisdiction,
            tax_year: tables.tax_year,
            filing_status: input.filing_status,
            result: tables.compute_tax(&input),
        })
    }
}

impl ToolPayload for AmortizationPayload {
    const TOOL: Tool = Tool::Amortization;
    type Output = AmortizationSchedule;

    fn evaluate(self) -> Result<AmortizationSchedule, String> {
        let principal = non_negative_field("principal", self.principal.unwrap_or(300_000.0))?;
        let rate = ranged_field("annualRatePct", self.annual_rate_pct.unwrap_or(6.5), 0.0, 100.0)?;
        let term_years = self.term_years.unwrap_or(30);
        if !(1..=50).contains(&term_years) {
            return Err("termYears must be between 1 and 50".to_string());
        }
        let extra = non_negative_field("extraPayment", self.extra_payment.unwrap_or(0.0))?;
        let start = self.extra_payment_start_period.unwrap_or(1);
        if start == 0 {
            return Err("extraPaymentStartPeriod must be >= 1".to_string());
        }
        Ok(build_schedule(principal, rate, term_years, extra, start))
    }
}

fn default_refinance_candidates() -> Vec<RefinanceCandidate> {
    vec![
        RefinanceCandidate {
            term_years: 30,
            rate: 6.0,
            closing_costs: 4_000.0,
        },
        RefinanceCandidate {
            term_years: 15,
            rate: 5.5,
            closing_costs: 4_000.0,
        },
    ]
}

impl ToolPayload for RefinancePayload {
    const TOOL: Tool = Tool::Refinance;
    type Output = RefinanceResponse;

    fn evaluate(self) -> Result<RefinanceResponse, String> {
        let balance =
            non_negative_field("currentBalance", self.current_balance.unwrap_or(250_000.0))?;
        let rate = ranged_field(
            "currentRatePct",
            self.current_rate_pct.unwrap_or(7.0),
            0.0,
            100.0,
        )?;
        let remaining_months = self.remaining_months.unwrap_or(300);
        if !(1..=600).contains(&remaining_months) {
            return Err("remainingMonths must be between 1 and 600".to_string());
        }

        let single_candidate = self.candidate_term_years.is_some()
            || self.candidate_rate_pct.is_some()
            || self.candidate_closing_costs.is_some();
        let candidates = match self.candidates {
            Some(candidates) => candidates,
            None if single_candidate => vec![RefinanceCandidate {
                term_years: self.candidate_term_years.unwrap_or(30),
                rate: self.candidate_rate_pct.unwrap_or(6.0),
                closing_costs: self.candidate_closing_costs.unwrap_or(4_000.0),
            }],
            None => default_refinance_candidates(),
        };
        if candidates.is_empty() {
            return Err("candidates must not be empty".to_string());
        }
        for candidate in &candidates {
            if !(1..=50).contains(&candidate.term_years) {
                return Err("candidate termYears must be between 1 and 50".to_string());
            }
            ranged_field("candidate rate", candidate.rate, 0.0, 100.0)?;
            non_negative_field("candidate closingCosts", candidate.closing_costs)?;
        }

        let current_payment = monthly_payment(balance, rate, remaining_months);
        let current_remaining_cost = remaining_cost(balance, rate, remaining_months);
        let scenarios =
            analyze_refinance(balance, current_payment, current_remaining_cost, &candidates);
        let best = best_refinance(&scenarios).copied();
        Ok(RefinanceResponse {
            current_payment,
            current_remaining_cost,
            scenarios,
            best,
        })
    }
}

fn default_retirement_input() -> RetirementInput {
    RetirementInput {
        current_age: 35,
        retirement_age: 65,
        life_expectancy: 90,
        balances: AccountBalances {
            pre_tax: 50_000.0,
            tax_free: 20_000.0,
            taxable: 10_000.0,
            taxable_basis: 10_000.0,
        },
        monthly_contribution: 1_000.0,
        contribution_growth_pct: 2.0,
        return_assumption: ReturnAssumption::Balanced,
        inflation_pct: 2.5,
        withdrawal_rate_pct: 4.0,
        retirement_tax_rate_pct: 15.0,
        external_income_real: 0.0,
        target: RetirementTarget::Income(60_000.0),
    }
}

fn retirement_input_from_payload(payload: RetirementPayload) -> Result<RetirementInput, String> {
    let defaults = default_retirement_input();

    let current_age = payload.current_age.unwrap_or(defaults.current_age);
    let retirement_age = payload.retirement_age.unwrap_or(defaults.retirement_age);
    let life_expectancy = payload.life_expectancy.unwrap_or(defaults.life_expectancy);
    if retirement_age < current_age {
        return Err("retirementAge must be >= currentAge".to_string());
    }
    if life_expectancy < retirement_age {
        return Err("lifeExpectancy must be >= retirementAge".to_string());
    }
    if life_expectancy > 120 {
        return Err("lifeExpectancy must be <= 120".to_string());
    }

    let taxable = non_negative_field(
        "taxableBalance",
        payload.taxable_balance.unwrap_or(defaults.balances.taxable),
    )?;
    // Basis follows the balance unless given, i.e. no unrealised gains.
    let taxable_basis =
        non_negative_field("taxableBasis", payload.taxable_basis.unwrap_or(taxable))?;
    if taxable_basis > taxable {
        return Err("taxableBasis must be <= taxableBalance".to_string());
    }
    let balances = AccountBalances {
        pre_tax: non_negative_field(
            "preTaxBalance",
            payload.pre_tax_balance.unwrap_or(defaults.balances.pre_tax),
        )?,
        tax_free: non_negative_field(
            "taxFreeBalance",
            payload.tax_free_balance.unwrap_or(defaults.balances.tax_free),
        )?,
        taxable,
        taxable_basis,
    };

    let return_assumption = match (payload.return_assumption, payload.return_pct) {
        (Some(ApiReturnAssumption::Conservative), _) => ReturnAssumption::Conservative,
        (Some(ApiReturnAssumption::Balanced), _) => ReturnAssumption::Balanced,
        (Some(ApiReturnAssumption::Aggressive), _) => ReturnAssumption::Aggressive,
        (Some(ApiReturnAssumption::Custom), None) => {
            return Err("returnPct is required when returnAssumption is custom".to_string());
        }
        (Some(ApiReturnAssumption::Custom) | None, Some(pct)) => {
            ReturnAssumption::Custom(ranged_field("returnPct", pct, -50.0, 50.0)?)
        }
        (None, None) => defaults.return_assumption,
    };

    let contribution_growth_pct = payload
        .contribution_growth_pct
        .unwrap_or(defaults.contribution_growth_pct);
    if !contribution_growth_pct.is_finite() || contribution_growth_pct <= -100.0 {
        return Err("contributionGrowthPct must be > -100".to_string());
    }

    let target_value = non_negative_field(
        "targetValue",
        payload.target_value.unwrap_or(match defaults.target {
            RetirementTarget::Income(v) | RetirementTarget::Corpus(v) => v,
        }),
    )?;
    let target = match payload.target_kind.unwrap_or(ApiTargetKind::Income) {
        ApiTargetKind::Income => RetirementTarget::Income(target_value),
        ApiTargetKind::Corpus => RetirementTarget::Corpus(target_value),
    };

    Ok(RetirementInput {
        current_age,
        retirement_age,
        life_expectancy,
        balances,
        monthly_contribution: non_negative_field(
            "monthlyContribution",
            payload
                .monthly_contribution
                .unwrap_or(defaults.monthly_contribution),
        )?,
        contribution_growth_pct,
        return_assumption,
        inflation_pct: ranged_field(
            "inflationPct",
            payload.inflation_pct.unwrap_or(defaults.inflation_pct),
            -10.0,
            50.0,
        )?,
        withdrawal_rate_pct: ranged_field(
            "withdrawalRatePct",
            payload.withdrawal_rate_pct.unwrap_or(defaults.withdrawal_rate_pct),
            0.0,
            100.0,
        )?,
        retirement_tax_rate_pct: ranged_field(
            "retirementTaxRatePct",
            payload
                .retirement_tax_rate_pct
                .unwrap_or(defaults.retirement_tax_rate_pct),
            0.0,
            100.0,
        )?,
        external_income_real: non_negative_field(
            "externalIncome",
            payload
                .external_income
                .unwrap_or(defaults.external_income_real),
        )?,
        target,
    })
}

impl ToolPayload for RetirementPayload {
    const TOOL: Tool = Tool::Retirement;
    type Output = SimulationResult;

    fn evaluate(self) -> Result<SimulationResult, String> {
        let input = retirement_input_from_payload(self)?;
        Ok(simulate(&input))
    }
}

fn education_input_from_payload(payload: EducationPayload) -> Result<EducationInput, String> {
    let child_age = payload.child_age.unwrap_or(5);
    let enrollment_age = payload.enrollment_age.unwrap_or(18);
    if child_age > 120 {
        return Err("childAge must be <= 120".to_string());
    }
    if enrollment_age > 120 {
        return Err("enrollmentAge must be <= 120".to_string());
    }
    if enrollment_age < child_age {
        return Err("enrollmentAge must be >= childAge".to_string());
    }
    let years_of_study = payload.years_of_study.unwrap_or(4);
    if years_of_study > 10 {
        return Err("yearsOfStudy must be <= 10".to_string());
    }

    let grant = match payload.grant_match_pct {
        Some(pct) => Some(GrantRule {
            match_rate_pct: ranged_field("grantMatchPct", pct, 0.0, 100.0)?,
            annual_grant_cap: non_negative_field(
                "grantAnnualCap",
                payload.grant_annual_cap.unwrap_or(500.0),
            )?,
            lifetime_grant_cap: non_negative_field(
                "grantLifetimeCap",
                payload.grant_lifetime_cap.unwrap_or(7_200.0),
            )?,
        }),
        None => None,
    };

    Ok(EducationInput {
        child_age,
        enrollment_age,
        years_of_study,
        annual_cost_today: non_negative_field(
            "annualCostToday",
            payload.annual_cost_today.unwrap_or(20_000.0),
        )?,
        cost_inflation_pct: ranged_field(
            "costInflationPct",
            payload.cost_inflation_pct.unwrap_or(4.0),
            -10.0,
            50.0,
        )?,
        current_savings: non_negative_field(
            "currentSavings",
            payload.current_savings.unwrap_or(5_000.0),
        )?,
        monthly_contribution: non_negative_field(
            "monthlyContribution",
            payload.monthly_contribution.unwrap_or(200.0),
        )?,
        return_pct: ranged_field("returnPct", payload.return_pct.unwrap_or(5.0), -50.0, 50.0)?,
        grant,
    })
}

impl ToolPayload for EducationPayload {
    const TOOL: Tool = Tool::Education;
    type Output = EducationResult;

    fn evaluate(self) -> Result<EducationResult, String> {
        let input = education_input_from_payload(self)?;
        Ok(plan_education(&input))
    }
}

fn goal_years(years: Option<u32>) -> Result<u32, String> {
    let years = years.unwrap_or(30);
    if years > 100 {
        return Err("years must be <= 100".to_string());
    }
    Ok(years)
}

impl ToolPayload for GoalContributionPayload {
    const TOOL: Tool = Tool::GoalContribution;
    type Output = GoalContributionResponse;

    fn evaluate(self) -> Result<GoalContributionResponse, String> {
        let target_amount =
            non_negative_field("targetAmount", self.target_amount.unwrap_or(1_000_000.0))?;
        let balance = non_negative_field("currentBalance", self.current_balance.unwrap_or(0.0))?;
        let rate = ranged_field(
            "annualRatePct",
            self.annual_rate_pct.unwrap_or(6.0),
            RATE_FLOOR_PCT,
            RATE_CEILING_PCT,
        )?;
        let years = goal_years(self.years)?;
        Ok(GoalContributionResponse {
            target_amount,
            years,
            required_monthly_contribution: required_contribution(
                target_amount,
                balance,
                rate,
                years,
            ),
        })
    }
}

impl ToolPayload for GoalReturnPayload {
    const TOOL: Tool = Tool::GoalReturn;
    type Output = GoalReturnResponse;

    fn evaluate(self) -> Result<GoalReturnResponse, String> {
        let target_amount =
            non_negative_field("targetAmount", self.target_amount.unwrap_or(1_000_000.0))?;
        let balance = non_negative_field("currentBalance", self.current_balance.unwrap_or(0.0))?;
        let monthly = non_negative_field(
            "monthlyContribution",
            self.monthly_contribution.unwrap_or(1_000.0),
        )?;
        let years = goal_years(self.years)?;
        Ok(GoalReturnResponse {
            target_amount,
            years,
            required_return_pct: required_return(target_amount, balance, monthly, years),
            search_floor_pct: RATE_FLOOR_PCT,
            search_ceiling_pct: RATE_CEILING_PCT,
        })
    }
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            Tool::Tax.path(),
            get(query_handler::<TaxPayload>).post(json_handler::<TaxPayload>),
        )
        .route(
            Tool::Amortization.path(),
            get(query_handler::<AmortizationPayload>).post(json_handler::<AmortizationPayload>),
        )
        .route(
            Tool::Refinance.path(),
            get(query_handler::<RefinancePayload>).post(json_handler::<RefinancePayload>),
        )
        .route(
            Tool::Retirement.path(),
            get(query_handler::<RetirementPayload>).post(json_handler::<RetirementPayload>),
        )
        .route(
            Tool::Education.path(),
            get(query_handler::<EducationPayload>).post(json_handler::<EducationPayload>),
        )
        .route(
            Tool::GoalContribution.path(),
            get(query_handler::<GoalContributionPayload>)
                .post(json_handler::<GoalContributionPayload>),
        )
        .route(
            Tool::GoalReturn.path(),
            get(query_handler::<GoalReturnPayload>).post(json_handler::<GoalReturnPayload>),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(host: &str, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "fincalc HTTP API listening");

    axum::serve(listener, router()).await
}

/// Evaluates one calculator against a JSON payload and returns the
/// pretty-printed JSON response. Empty input means "all defaults".
pub fn run_tool(tool: Tool, json: &str) -> Result<String, String> {
    match tool {
        Tool::Tax => evaluate_json::<TaxPayload>(json),
        Tool::Amortization => evaluate_json::<AmortizationPayload>(json),
        Tool::Refinance => evaluate_json::<RefinancePayload>(json),
        Tool::Retirement => evaluate_json::<RetirementPayload>(json),
        Tool::Education => evaluate_json::<EducationPayload>(json),
        Tool::GoalContribution => evaluate_json::<GoalContributionPayload>(json),
        Tool::GoalReturn => evaluate_json::<GoalReturnPayload>(json),
    }
}

fn evaluate_json<P: ToolPayload>(json: &str) -> Result<String, String> {
    let json = if json.trim().is_empty() { "{}" } else { json };
    let payload =
        serde_json::from_str::<P>(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
    debug!(tool = P::TOOL.name(), "evaluating payload");
    let output = payload.evaluate()?;
    serde_json::to_string_pretty(&output).map_err(|e| format!("Failed to encode response: {e}"))
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn query_handler<P: ToolPayload>(Query(payload): Query<P>) -> Response {
    respond(payload)
}

async fn json_handler<P: ToolPayload>(Json(payload): Json<P>) -> Response {
    respond(payload)
}

fn respond<P: ToolPayload>(payload: P) -> Response {
    let tool = P::TOOL.name();
    debug!(tool, "handling request");
    match payload.evaluate() {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            warn!(tool, error = %msg, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
