use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{FilingStatus, Jurisdiction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub rate: f64,
    pub lower_bound: f64,
    /// `None` for the open-ended top bracket.
    pub upper_bound: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TaxTableError {
    #[error("bracket table is empty")]
    Empty,
    #[error("first bracket must start at 0, found {0}")]
    NonZeroStart(f64),
    #[error("bracket {index} starts at {found}, previous bracket ends at {expected}")]
    Discontinuous {
        index: usize,
        expected: f64,
        found: f64,
    },
    #[error("bracket {index} has an upper bound at or below its lower bound")]
    EmptyBracket { index: usize },
    #[error("bracket {index} is unbounded but is not the top bracket")]
    UnboundedBeforeTop { index: usize },
    #[error("top bracket must be unbounded")]
    BoundedTop,
    #[error("bracket {index} has invalid rate {rate}")]
    InvalidRate { index: usize, rate: f64 },
}

/// Ascending, contiguous brackets covering `[0, ∞)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, TaxTableError> {
        let first = brackets.first().ok_or(TaxTableError::Empty)?;
        if first.lower_bound != 0.0 {
            return Err(TaxTableError::NonZeroStart(first.lower_bound));
        }

        let last_index = brackets.len() - 1;
        let mut expected_lower = 0.0;
        for (index, bracket) in brackets.iter().enumerate() {
            if !bracket.rate.is_finite() || !(0.0..=1.0).contains(&bracket.rate) {
                return Err(TaxTableError::InvalidRate {
                    index,
                    rate: bracket.rate,
                });
            }
            if bracket.lower_bound != expected_lower {
                return Err(TaxTableError::Discontinuous {
                    index,
                    expected: expected_lower,
                    found: bracket.lower_bound,
                });
            }
            match bracket.upper_bound {
                Some(upper) if upper <= bracket.lower_bound || !upper.is_finite() => {
                    return Err(TaxTableError::EmptyBracket { index });
                }
                Some(_) if index == last_index => return Err(TaxTableError::BoundedTop),
                Some(upper) => expected_lower = upper,
                None if index != last_index => {
                    return Err(TaxTableError::UnboundedBeforeTop { index });
                }
                None => {}
            }
        }

        Ok(Self { brackets })
    }

    // Built-in data only: each bracket starts where the previous one ends.
    pub(crate) fn from_ceilings(steps: &[(f64, Option<f64>)]) -> Self {
        let mut lower_bound = 0.0;
        let brackets = steps
            .iter()
            .map(|&(rate, upper_bound)| {
                let bracket = TaxBracket {
                    rate,
                    lower_bound,
                    upper_bound,
                };
                if let Some(upper) = upper_bound {
                    lower_bound = upper;
                }
                bracket
            })
            .collect();
        Self { brackets }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn tax(&self, income: f64) -> f64 {
        if income.is_nan() || income <= 0.0 {
            return 0.0;
        }
        self.brackets
            .iter()
            .map(|bracket| {
                let top = bracket.upper_bound.map_or(income, |upper| income.min(upper));
                (top - bracket.lower_bound).max(0.0) * bracket.rate
            })
            .sum()
    }

    pub fn marginal_rate(&self, income: f64) -> f64 {
        let mut rate = self.brackets.first().map_or(0.0, |b| b.rate);
        for bracket in &self.brackets {
            if income > bracket.lower_bound {
                rate = bracket.rate;
            }
        }
        rate
    }
}

impl TryFrom<Vec<TaxBracket>> for BracketTable {
    type Error = TaxTableError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}

impl From<BracketTable> for Vec<TaxBracket> {
    fn from(table: BracketTable) -> Self {
        table.brackets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByStatus<T> {
    pub single: T,
    pub married_joint: T,
    pub head_of_household: T,
}

impl<T> ByStatus<T> {
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedJoint => &self.married_joint,
            FilingStatus::HeadOfHousehold => &self.head_of_household,
        }
    }
}

impl<T: Clone> ByStatus<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            single: value.clone(),
            married_joint: value.clone(),
            head_of_household: value,
        }
    }
}

/// Phase-out of the standard amount once income passes `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceTaper {
    pub start: f64,
    pub withdrawal_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemizedRules {
    /// Ceiling on state and local taxes; 0 disables the deduction.
    pub state_local_cap: f64,
    /// Medical costs count only above this share of adjusted income; 100
    /// disables the deduction.
    pub medical_floor_pct: f64,
    pub mortgage_interest: bool,
    pub charitable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRules {
    pub standard: ByStatus<f64>,
    pub taper: Option<AllowanceTaper>,
    pub itemized: ItemizedRules,
    /// The standard amount is a personal allowance granted on top of any
    /// itemized relief rather than an alternative to it.
    pub standard_always_applies: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferentialBucket {
    pub rate: f64,
    /// Top of the bucket measured on the combined ordinary + gains stack.
    pub ceiling: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PreferentialTreatment {
    /// Gains sit on top of ordinary taxable income and fill each bucket's
    /// remaining room in order.
    Stacked {
        exemption: f64,
        buckets: ByStatus<Vec<PreferentialBucket>>,
    },
    Inclusion { inclusion_rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionTier {
    pub rate: f64,
    pub floor: f64,
    pub ceiling: Option<f64>,
}

impl ContributionTier {
    pub fn contribution(&self, wages: f64) -> f64 {
        let top = self.ceiling.map_or(wages, |ceiling| wages.min(ceiling));
        (top - self.floor).max(0.0) * self.rate
    }
}

/// Primary rate up to a wage base, an uncapped secondary rate, and an
/// uncapped surtax above a filing-status threshold. Only the primary tier
/// has a ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSchedule {
    pub primary_rate: f64,
    pub primary_floor: f64,
    pub wage_base: f64,
    pub secondary_rate: f64,
    pub secondary_floor: f64,
    pub surtax_rate: f64,
    pub surtax_threshold: ByStatus<f64>,
}

impl PayrollSchedule {
    pub fn primary_tier(&self) -> ContributionTier {
        ContributionTier {
            rate: self.primary_rate,
            floor: self.primary_floor,
            ceiling: Some(self.wage_base),
        }
    }

    pub fn secondary_tier(&self) -> ContributionTier {
        ContributionTier {
            rate: self.secondary_rate,
            floor: self.secondary_floor,
            ceiling: None,
        }
    }

    pub fn surtax_tier(&self, status: FilingStatus) -> ContributionTier {
        ContributionTier {
            rate: self.surtax_rate,
            floor: *self.surtax_threshold.get(status),
            ceiling: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxTables {
    pub jurisdiction: Jurisdiction,
    pub tax_year: u16,
    pub ordinary: ByStatus<BracketTable>,
    /// Sub-national brackets added on top of the national ones.
    pub regional: Option<BracketTable>,
    pub deductions: DeductionRules,
    pub preferential: PreferentialTreatment,
    pub payroll: PayrollSchedule,
}

pub fn united_states_2025() -> TaxTables {
    TaxTables {
        jurisdiction: Jurisdiction::UnitedStates,
        tax_year: 2025,
        ordinary: ByStatus {
            single: BracketTable::from_ceilings(&[
                (0.10, Some(11_925.0)),
                (0.12, Some(48_475.0)),
                (0.22, Some(103_350.0)),
                (0.24, Some(197_300.0)),
                (0.32, Some(250_525.0)),
                (0.35, Some(626_350.0)),
                (0.37, None),
            ]),
            married_joint: BracketTable::from_ceilings(&[
                (0.10, Some(23_850.0)),
                (0.12, Some(96_950.0)),
                (0.22, Some(206_700.0)),
                (0.24, Some(394_600.0)),
                (0.32, Some(501_050.0)),
                (0.35, Some(751_600.0)),
                (0.37, None),
            ]),
            head_of_household: BracketTable::from_ceilings(&[
                (0.10, Some(17_000.0)),
                (0.12, Some(64_850.0)),
                (0.22, Some(103_350.0)),
                (0.24, Some(197_300.0)),
                (0.32, Some(250_500.0)),
                (0.35, Some(626_350.0)),
                (0.37, None),
            ]),
        },
        regional: None,
        deductions: DeductionRules {
            standard: ByStatus {
                single: 15_000.0,
                married_joint: 30_000.0,
                head_of_household: 22_500.0,
            },
            taper: None,
            itemized: ItemizedRules {
                state_local_cap: 10_000.0,
                medical_floor_pct: 7.5,
                mortgage_interest: true,
                charitable: true,
            },
            standard_always_applies: false,
        },
        preferential: PreferentialTreatment::Stacked {
            exemption: 0.0,
            buckets: ByStatus {
                single: gain_buckets(48_350.0, 533_400.0),
                married_joint: gain_buckets(96_700.0, 600_050.0),
                head_of_household: gain_buckets(64_750.0, 566_700.0),
            },
        },
        payroll: PayrollSchedule {
            primary_rate: 0.062,
            primary_floor: 0.0,
            wage_base: 176_100.0,
            secondary_rate: 0.0145,
            secondary_floor: 0.0,
            surtax_rate: 0.009,
            surtax_threshold: ByStatus {
                single: 200_000.0,
                married_joint: 250_000.0,
                head_of_household: 200_000.0,
            },
        },
    }
}

fn gain_buckets(zero_ceiling: f64, mid_ceiling: f64) -> Vec<PreferentialBucket> {
    vec![
        PreferentialBucket {
            rate: 0.0,
            ceiling: Some(zero_ceiling),
        },
        PreferentialBucket {
            rate: 0.15,
            ceiling: Some(mid_ceiling),
        },
        PreferentialBucket {
            rate: 0.20,
            ceiling: None,
        },
    ]
}

pub fn united_kingdom_2025() -> TaxTables {
    TaxTables {
        jurisdiction: Jurisdiction::UnitedKingdom,
        tax_year: 2025,
        ordinary: ByStatus::uniform(BracketTable::from_ceilings(&[
            (0.20, Some(37_700.0)),
            (0.40, Some(125_140.0)),
            (0.45, None),
        ])),
        regional: None,
        deductions: DeductionRules {
            standard: ByStatus::uniform(12_570.0),
            taper: Some(AllowanceTaper {
                start: 100_000.0,
                withdrawal_ratio: 0.5,
            }),
            itemized: ItemizedRules {
                state_local_cap: 0.0,
                medical_floor_pct: 100.0,
                mortgage_interest: false,
                charitable: true,
            },
            standard_always_applies: true,
        },
        preferential: PreferentialTreatment::Stacked {
            exemption: 3_000.0,
            buckets: ByStatus::uniform(vec![
                PreferentialBucket {
                    rate: 0.18,
                    ceiling: Some(37_700.0),
                },
                PreferentialBucket {
                    rate: 0.24,
                    ceiling: None,
                },
            ]),
        },
        // Class 1 NI: main rate between the primary threshold and the upper
        // earnings limit, additional rate on everything above it. No surtax.
        payroll: PayrollSchedule {
            primary_rate: 0.08,
            primary_floor: 12_570.0,
            wage_base: 50_270.0,
            secondary_rate: 0.02,
            secondary_floor: 50_270.0,
            surtax_rate: 0.0,
            surtax_threshold: ByStatus::uniform(50_270.0),
        },
    }
}

/// Federal tables with Ontario standing in for the provincial layer.
pub fn canada_2025() -> TaxTables {
    TaxTables {
        jurisdiction: Jurisdiction::Canada,
        tax_year: 2025,
        ordinary: ByStatus::uniform(BracketTable::from_ceilings(&[
            (0.15, Some(57_375.0)),
            (0.205, Some(114_750.0)),
            (0.26, Some(177_882.0)),
            (0.29, Some(253_414.0)),
            (0.33, None),
        ])),
        regional: Some(BracketTable::from_ceilings(&[
            (0.0505, Some(52_886.0)),
            (0.0915, Some(105_775.0)),
            (0.1116, Some(150_000.0)),
            (0.1216, Some(220_000.0)),
            (0.1316, None),
        ])),
        deductions: DeductionRules {
            standard: ByStatus::uniform(16_129.0),
            taper: None,
            itemized: ItemizedRules {
                state_local_cap: 0.0,
                medical_floor_pct: 3.0,
                mortgage_interest: false,
                charitable: true,
            },
            standard_always_applies: true,
        },
        preferential: PreferentialTreatment::Inclusion {
            inclusion_rate: 0.5,
        },
        // CPP up to the YMPE, EI on all wages, CPP2 above the YMPE. The
        // statutory EI and CPP2 ceilings are not modelled.
        payroll: PayrollSchedule {
            primary_rate: 0.0595,
            primary_floor: 3_500.0,
            wage_base: 71_300.0,
            secondary_rate: 0.0164,
            secondary_floor: 0.0,
            surtax_rate: 0.04,
            surtax_threshold: ByStatus::uniform(71_300.0),
        },
    }
}
