mod catalog;
mod engine;
mod types;

pub use catalog::{
    CatalogError, FAMILY_BONDS, default_catalog, exclusion_list, load_catalog, parse_catalog,
};
pub use engine::{accrue, annualized_rate, rank_bonds, round_schedule, simulate};
pub use types::{
    BOND_NOMINAL_VALUE, BondDetails, BondModel, CalculationResult, InterestPayment,
    PurchaseRound, RankedBond, RateMechanics, Scenario, TAX_RATE,
};
