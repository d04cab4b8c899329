use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::types::{BondDetails, BondModel, InterestPayment, RateMechanics};

const DEFAULT_CATALOG_JSON: &str = include_str!("../../catalog/bonds.json");

pub const FAMILY_BONDS: [&str; 2] = ["ROS", "ROD"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog contains no bonds")]
    Empty,
    #[error("bond at index {0} has an empty name")]
    MissingName(usize),
    #[error("duplicate bond name {0}")]
    DuplicateName(String),
    #[error("bond {0}: basedOnReferenceRate and basedOnInflation are mutually exclusive")]
    ConflictingMechanics(String),
    #[error("bond {name}: variableRate={declared} contradicts its rate mechanics")]
    VariableRateMismatch { name: String, declared: bool },
    #[error("bond {0}: maturityMonths must be >= 1")]
    ZeroMaturity(String),
    #[error("bond {name}: {field} must be a finite number >= 0")]
    InvalidAmount { name: String, field: &'static str },
    #[error("bond {0}: margin must be finite")]
    InvalidMargin(String),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordInterestPayment {
    Monthly,
    Yearly,
    AtEnd,
}

impl From<RecordInterestPayment> for InterestPayment {
    fn from(value: RecordInterestPayment) -> Self {
        match value {
            RecordInterestPayment::Monthly => InterestPayment::Monthly,
            RecordInterestPayment::Yearly => InterestPayment::Yearly,
            RecordInterestPayment::AtEnd => InterestPayment::AtEnd,
        }
    }
}

// `"-"` marks an instrument without an exchange price.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RecordPrice {
    Quoted(f64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRecord {
    name: String,
    series: String,
    display_name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    type_label: String,
    interest_rate: f64,
    maturity_months: u32,
    #[serde(default)]
    variable_rate: Option<bool>,
    #[serde(default, alias = "basedOnNBP")]
    based_on_reference_rate: bool,
    #[serde(default)]
    based_on_inflation: bool,
    #[serde(default)]
    compound: bool,
    #[serde(default)]
    margin: f64,
    interest_payment: RecordInterestPayment,
    #[serde(default)]
    penalty: f64,
    #[serde(default)]
    lose_interest_on_early_withdrawal: bool,
    #[serde(default)]
    early_withdrawal_possible: bool,
    #[serde(default = "default_price")]
    purchase_price: f64,
    exchange_price: Option<RecordPrice>,
    #[serde(default)]
    advantages: String,
    #[serde(default)]
    interest_details: String,
    #[serde(default)]
    interest_period: String,
    #[serde(default)]
    withdrawal_fee: String,
    #[serde(default)]
    withdrawal_conditions: String,
    #[serde(default)]
    details_url: String,
    #[serde(default)]
    buy_url: String,
}

fn default_price() -> f64 {
    100.0
}

fn check_amount(name: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidAmount {
            name: name.to_string(),
            field,
        })
    }
}

impl TryFrom<CatalogRecord> for BondModel {
    type Error = CatalogError;

    fn try_from(record: CatalogRecord) -> Result<Self, Self::Error> {
        let name = record.name;

        if record.based_on_reference_rate && record.based_on_inflation {
            return Err(CatalogError::ConflictingMechanics(name));
        }
        if record.maturity_months == 0 {
            return Err(CatalogError::ZeroMaturity(name));
        }
        check_amount(&name, "interestRate", record.interest_rate)?;
        check_amount(&name, "penalty", record.penalty)?;
        check_amount(&name, "purchasePrice", record.purchase_price)?;
        if !record.margin.is_finite() {
            return Err(CatalogError::InvalidMargin(name));
        }

        let rate_mechanics = if record.based_on_reference_rate {
            RateMechanics::ReferenceRateLinked {
                initial_rate: record.interest_rate,
                margin: record.margin,
            }
        } else if record.based_on_inflation {
            RateMechanics::InflationLinked {
                first_year_rate: record.interest_rate,
                margin: record.margin,
                compound: record.compound,
            }
        } else {
            RateMechanics::Fixed {
                rate: record.interest_rate,
                compound: record.compound,
            }
        };

        let variable = !matches!(rate_mechanics, RateMechanics::Fixed { .. });
        if record.variable_rate.is_some_and(|declared| declared != variable) {
            return Err(CatalogError::VariableRateMismatch {
                name,
                declared: !variable,
            });
        }

        let exchange_price = match record.exchange_price {
            Some(RecordPrice::Quoted(price)) => {
                check_amount(&name, "exchangePrice", price)?;
                Some(price)
            }
            Some(RecordPrice::Text(text)) if text.trim() == "-" => None,
            Some(RecordPrice::Text(_)) => {
                return Err(CatalogError::InvalidAmount {
                    name,
                    field: "exchangePrice",
                });
            }
            None => None,
        };

        Ok(BondModel {
            name,
            series: record.series,
            display_name: record.display_name,
            maturity_months: record.maturity_months,
            rate_mechanics,
            interest_payment: record.interest_payment.into(),
            penalty: record.penalty,
            lose_interest_on_early_withdrawal: record.lose_interest_on_early_withdrawal,
            early_withdrawal_possible: record.early_withdrawal_possible,
            purchase_price: record.purchase_price,
            exchange_price,
            details: BondDetails {
                kind: record.kind,
                type_label: record.type_label,
                advantages: record.advantages,
                interest_details: record.interest_details,
                interest_period: record.interest_period,
                withdrawal_fee: record.withdrawal_fee,
                withdrawal_conditions: record.withdrawal_conditions,
                details_url: record.details_url,
                buy_url: record.buy_url,
            },
        })
    }
}

pub fn parse_catalog(json: &str) -> Result<Vec<BondModel>, CatalogError> {
    let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
    if records.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut seen = HashSet::new();
    let mut bonds = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(CatalogError::MissingName(idx));
        }
        if !seen.insert(record.name.clone()) {
            return Err(CatalogError::DuplicateName(record.name));
        }
        bonds.push(BondModel::try_from(record)?);
    }
    Ok(bonds)
}

pub fn load_catalog(path: &Path) -> Result<Vec<BondModel>, CatalogError> {
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalog(&json)
}

pub fn default_catalog() -> Result<Vec<BondModel>, CatalogError> {
    parse_catalog(DEFAULT_CATALOG_JSON)
}

pub fn exclusion_list(exclude_family: bool, extra: &[String]) -> Vec<String> {
    let mut excluded: Vec<String> = extra
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if exclude_family {
        for name in FAMILY_BONDS {
            if !excluded.iter().any(|n| n == name) {
                excluded.push(name.to_string());
            }
        }
    }
    excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(extra: &str) -> String {
        format!(
            r#"[{{
              "name": "XYZ",
              "series": "XYZ0130",
              "displayName": "Test bond",
              "interestRate": 5.0,
              "maturityMonths": 24,
              "interestPayment": "yearly"{extra}
            }}]"#
        )
    }

    #[test]
    fn default_catalog_loads_all_instruments() {
        let bonds = default_catalog().expect("embedded catalog must be valid");
        let names: Vec<_> = bonds.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["OTS", "ROR", "DOR", "TOS", "COI", "ROS", "EDO", "ROD"]
        );
    }

    #[test]
    fn default_catalog_maps_rate_mechanics() {
        let bonds = default_catalog().expect("embedded catalog must be valid");
        let by_name = |name: &str| {
            bonds
                .iter()
                .find(|b| b.name == name)
                .cloned()
                .expect("bond present")
        };

        let ots = by_name("OTS");
        assert_eq!(
            ots.rate_mechanics,
            RateMechanics::Fixed {
                rate: 2.75,
                compound: false
            }
        );
        assert!(ots.lose_interest_on_early_withdrawal);
        assert_eq!(ots.exchange_price, Some(100.0));

        let dor = by_name("DOR");
        assert_eq!(
            dor.rate_mechanics,
            RateMechanics::ReferenceRateLinked {
                initial_rate: 4.9,
                margin: 0.15
            }
        );
        assert_eq!(dor.interest_payment, InterestPayment::Monthly);

        let rod = by_name("ROD");
        assert_eq!(
            rod.rate_mechanics,
            RateMechanics::InflationLinked {
                first_year_rate: 6.25,
                margin: 2.25,
                compound: true
            }
        );
        assert_eq!(rod.exchange_price, None);
        assert_eq!(rod.maturity_months, 144);
        assert!(rod.is_variable_rate());
        assert!(rod.compounds());
    }

    #[test]
    fn accepts_legacy_reference_rate_key() {
        let bonds = parse_catalog(&record_json(r#", "basedOnNBP": true, "margin": 0.5"#))
            .expect("valid record");
        assert_eq!(
            bonds[0].rate_mechanics,
            RateMechanics::ReferenceRateLinked {
                initial_rate: 5.0,
                margin: 0.5
            }
        );
        assert_eq!(bonds[0].margin(), 0.5);
        assert_eq!(bonds[0].base_rate(), 5.0);
    }

    #[test]
    fn rejects_conflicting_mechanics() {
        let err = parse_catalog(&record_json(
            r#", "basedOnReferenceRate": true, "basedOnInflation": true"#,
        ))
        .expect_err("must reject");
        assert!(matches!(err, CatalogError::ConflictingMechanics(name) if name == "XYZ"));
    }

    #[test]
    fn rejects_variable_rate_mismatch() {
        let err =
            parse_catalog(&record_json(r#", "variableRate": true"#)).expect_err("must reject");
        assert!(matches!(
            err,
            CatalogError::VariableRateMismatch { declared: true, .. }
        ));
    }

    #[test]
    fn rejects_zero_maturity_and_negative_penalty() {
        let json = record_json("").replace("\"maturityMonths\": 24", "\"maturityMonths\": 0");
        assert!(matches!(
            parse_catalog(&json),
            Err(CatalogError::ZeroMaturity(_))
        ));

        let err = parse_catalog(&record_json(r#", "penalty": -1"#)).expect_err("must reject");
        assert!(err.to_string().contains("penalty"));
    }

    #[test]
    fn rejects_duplicates_empty_and_bad_json() {
        let one = record_json("");
        let body = one.trim().trim_start_matches('[').trim_end_matches(']');
        let twice = format!("[{body},{body}]");
        assert!(matches!(
            parse_catalog(&twice),
            Err(CatalogError::DuplicateName(name)) if name == "XYZ"
        ));
        assert!(matches!(parse_catalog("[]"), Err(CatalogError::Empty)));
        assert!(matches!(parse_catalog("{"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn exchange_price_accepts_only_dash_placeholder() {
        let bonds = parse_catalog(&record_json(r#", "exchangePrice": "-""#))
            .expect("dash marks a missing price");
        assert_eq!(bonds[0].exchange_price, None);

        let err = parse_catalog(&record_json(r#", "exchangePrice": "99,9""#))
            .expect_err("must reject");
        assert!(matches!(
            err,
            CatalogError::InvalidAmount { ref name, field: "exchangePrice" } if name == "XYZ"
        ));
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        let err = load_catalog(Path::new("/nonexistent/bonds.json")).expect_err("must fail");
        assert!(err.to_string().contains("/nonexistent/bonds.json"));
    }

    #[test]
    fn exclusion_list_merges_family_preset() {
        let excluded = exclusion_list(true, &[" EDO ".to_string(), "ROS".to_string()]);
        assert_eq!(excluded, vec!["EDO", "ROS", "ROD"]);
        assert!(exclusion_list(false, &[]).is_empty());
    }
}
