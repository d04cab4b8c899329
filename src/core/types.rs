use serde::Serialize;

pub const TAX_RATE: f64 = 0.19;

pub const BOND_NOMINAL_VALUE: f64 = 100.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestPayment {
    Monthly,
    Yearly,
    AtEnd,
}

/// How an instrument's coupon is set. Rates and margins are annual, in percent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RateMechanics {
    #[serde(rename_all = "camelCase")]
    Fixed { rate: f64, compound: bool },
    // `initial_rate` is the quoted coupon; accrual uses the reference rate.
    #[serde(rename_all = "camelCase")]
    ReferenceRateLinked { initial_rate: f64, margin: f64 },
    #[serde(rename_all = "camelCase")]
    InflationLinked {
        first_year_rate: f64,
        margin: f64,
        compound: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub type_label: String,
    pub advantages: String,
    pub interest_details: String,
    pub interest_period: String,
    pub withdrawal_fee: String,
    pub withdrawal_conditions: String,
    pub details_url: String,
    pub buy_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondModel {
    pub name: String,
    pub series: String,
    pub display_name: String,
    pub maturity_months: u32,
    pub rate_mechanics: RateMechanics,
    pub interest_payment: InterestPayment,
    /// Charged per 100-unit nominal on early redemption.
    pub penalty: f64,
    pub lose_interest_on_early_withdrawal: bool,
    pub early_withdrawal_possible: bool,
    pub purchase_price: f64,
    pub exchange_price: Option<f64>,
    #[serde(flatten)]
    pub details: BondDetails,
}

impl BondModel {
    pub fn base_rate(&self) -> f64 {
        match self.rate_mechanics {
            RateMechanics::Fixed { rate, .. } => rate,
            RateMechanics::ReferenceRateLinked { initial_rate, .. } => initial_rate,
            RateMechanics::InflationLinked {
                first_year_rate, ..
            } => first_year_rate,
        }
    }

    pub fn margin(&self) -> f64 {
        match self.rate_mechanics {
            RateMechanics::Fixed { .. } => 0.0,
            RateMechanics::ReferenceRateLinked { margin, .. }
            | RateMechanics::InflationLinked { margin, .. } => margin,
        }
    }

    pub fn is_variable_rate(&self) -> bool {
        !matches!(self.rate_mechanics, RateMechanics::Fixed { .. })
    }

    pub fn compounds(&self) -> bool {
        match self.rate_mechanics {
            RateMechanics::Fixed { compound, .. }
            | RateMechanics::InflationLinked { compound, .. } => compound,
            RateMechanics::ReferenceRateLinked { .. } => false,
        }
    }
}

/// One what-if scenario. Inflation and reference rates are annual, in percent;
/// `tax_rate` is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub investment: f64,
    pub horizon_months: u32,
    pub inflation_rate: f64,
    pub reference_rate: f64,
    pub auto_reinvest: bool,
    pub tax_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRound {
    pub start_month: u32,
    pub end_month: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_end: Option<f64>,
}

impl PurchaseRound {
    pub fn months(&self) -> u32 {
        self.end_month - self.start_month
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub total_value: f64,
    pub profit: f64,
    /// Annualized simple-interest equivalent, in percent.
    pub effective_rate: f64,
    pub purchase_rounds: Vec<PurchaseRound>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedBond {
    #[serde(flatten)]
    pub bond: BondModel,
    #[serde(flatten)]
    pub result: CalculationResult,
}
