use super::types::{
    BOND_NOMINAL_VALUE, BondModel, CalculationResult, PurchaseRound, RankedBond, RateMechanics,
    Scenario,
};

#[derive(Debug, Clone, Copy)]
struct RoundOutcome {
    capital_start: f64,
    net_interest: f64,
    penalty: f64,
}

impl RoundOutcome {
    fn capital_end(self) -> f64 {
        self.capital_start + self.net_interest - self.penalty
    }
}

/// Rates are annual, in percent. `months` must not exceed the bond's maturity.
pub fn accrue(
    capital: f64,
    bond: &BondModel,
    months: u32,
    reference_rate: f64,
    inflation_rate: f64,
) -> f64 {
    if months == 0 {
        return 0.0;
    }

    match bond.rate_mechanics {
        RateMechanics::ReferenceRateLinked { margin, .. } => {
            let monthly_rate = (reference_rate + margin) / 12.0 / 100.0;
            capital * monthly_rate * f64::from(months)
        }
        RateMechanics::InflationLinked {
            first_year_rate,
            margin,
            compound,
        } => inflation_linked_interest(
            capital,
            months,
            first_year_rate / 100.0,
            (inflation_rate + margin) / 100.0,
            compound,
        ),
        RateMechanics::Fixed {
            rate,
            compound: true,
        } => compound_fixed_interest(capital, months, rate / 100.0),
        RateMechanics::Fixed {
            rate,
            compound: false,
        } => capital * (rate / 100.0) * (f64::from(months) / 12.0),
    }
}

fn compound_fixed_interest(capital: f64, months: u32, rate: f64) -> f64 {
    let full_years = months / 12;
    let remaining_months = months % 12;

    let mut balance = capital;
    for _ in 0..full_years {
        balance *= 1.0 + rate;
    }
    if remaining_months > 0 {
        balance += balance * rate * (f64::from(remaining_months) / 12.0);
    }
    balance - capital
}

fn inflation_linked_interest(
    capital: f64,
    months: u32,
    first_year_rate: f64,
    indexed_rate: f64,
    compound: bool,
) -> f64 {
    let full_years = months / 12;
    let remaining_months = months % 12;

    if full_years == 0 {
        return capital * first_year_rate * (f64::from(months) / 12.0);
    }

    let mut balance = capital;
    let mut interest = 0.0;
    for year in 0..full_years {
        let rate = if year == 0 {
            first_year_rate
        } else {
            indexed_rate
        };
        let base = if compound { balance } else { capital };
        let year_interest = base * rate;
        interest += year_interest;
        if compound {
            balance += year_interest;
        }
    }

    if remaining_months > 0 {
        let base = if compound { balance } else { capital };
        interest += base * indexed_rate * (f64::from(remaining_months) / 12.0);
    }
    interest
}

pub fn simulate(bond: &BondModel, scenario: &Scenario) -> CalculationResult {
    if scenario.horizon_months == 0 {
        return untouched_investment(scenario.investment, Vec::new());
    }

    if scenario.auto_reinvest {
        simulate_reinvested(bond, scenario)
    } else {
        simulate_terminal(bond, scenario)
    }
}

fn simulate_terminal(bond: &BondModel, scenario: &Scenario) -> CalculationResult {
    let investment = scenario.investment;
    let effective_months = scenario.horizon_months.min(bond.maturity_months);
    let completed = effective_months >= bond.maturity_months;
    let round = PurchaseRound {
        start_month: 0,
        end_month: effective_months,
        completed,
        capital_start: None,
        capital_end: None,
    };

    if bond.lose_interest_on_early_withdrawal && !completed {
        return untouched_investment(investment, vec![round]);
    }

    let outcome = close_round(bond, scenario, investment, effective_months);
    finish(investment, outcome.capital_end(), scenario.horizon_months, vec![round])
}

fn simulate_reinvested(bond: &BondModel, scenario: &Scenario) -> CalculationResult {
    let mut capital = scenario.investment;
    let mut rounds = Vec::new();

    let schedule = round_schedule(scenario.horizon_months, bond.maturity_months);
    for (start_month, end_month) in schedule {
        let months = end_month - start_month;
        let capital_end = close_round(bond, scenario, capital, months).capital_end();
        rounds.push(PurchaseRound {
            start_month,
            end_month,
            completed: months >= bond.maturity_months,
            capital_start: Some(capital),
            capital_end: Some(capital_end),
        });
        capital = capital_end;
    }

    finish(scenario.investment, capital, scenario.horizon_months, rounds)
}

pub fn round_schedule(
    horizon_months: u32,
    maturity_months: u32,
) -> impl Iterator<Item = (u32, u32)> {
    let step = maturity_months.max(1);
    (0..horizon_months)
        .step_by(step as usize)
        .map(move |start| (start, start + step.min(horizon_months - start)))
}

fn close_round(bond: &BondModel, scenario: &Scenario, capital: f64, months: u32) -> RoundOutcome {
    let partial = months < bond.maturity_months;
    let gross_interest = accrue(
        capital,
        bond,
        months,
        scenario.reference_rate,
        scenario.inflation_rate,
    );
    let mut net_interest = gross_interest - gross_interest * scenario.tax_rate;
    if partial && bond.lose_interest_on_early_withdrawal {
        net_interest = 0.0;
    }
    let penalty = if partial && bond.penalty > 0.0 {
        capital / BOND_NOMINAL_VALUE * bond.penalty
    } else {
        0.0
    };

    RoundOutcome {
        capital_start: capital,
        net_interest,
        penalty,
    }
}

fn finish(
    investment: f64,
    total_value: f64,
    horizon_months: u32,
    purchase_rounds: Vec<PurchaseRound>,
) -> CalculationResult {
    let profit = total_value - investment;
    CalculationResult {
        total_value,
        profit,
        effective_rate: annualized_rate(profit, investment, horizon_months),
        purchase_rounds,
    }
}

fn untouched_investment(
    investment: f64,
    purchase_rounds: Vec<PurchaseRound>,
) -> CalculationResult {
    CalculationResult {
        total_value: investment,
        profit: 0.0,
        effective_rate: 0.0,
        purchase_rounds,
    }
}

pub fn annualized_rate(profit: f64, investment: f64, horizon_months: u32) -> f64 {
    if horizon_months == 0 || investment <= 0.0 {
        return 0.0;
    }
    profit / investment * 100.0 * (12.0 / f64::from(horizon_months))
}

pub fn rank_bonds(
    bonds: &[BondModel],
    scenario: &Scenario,
    excluded: &[String],
) -> Vec<RankedBond> {
    let mut ranked: Vec<RankedBond> = bonds
        .iter()
        .filter(|bond| !excluded.iter().any(|name| name == &bond.name))
        .map(|bond| RankedBond {
            bond: bond.clone(),
            result: simulate(bond, scenario),
        })
        .collect();
    ranked.sort_by(|a, b| b.result.profit.total_cmp(&a.result.profit));
    ranked
}
