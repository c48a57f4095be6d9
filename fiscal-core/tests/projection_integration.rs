//! Scenario projections and fiscal cliff analysis over the in-memory store
//!
//! Run with: cargo test -p fiscal-core --test projection_integration

use fiscal_core::projection::{ProjectionSettings, ScenarioAssumptions};
use fiscal_core::store::FiscalStore;
use fiscal_core::{FinancialFacts, FiscalConfig, FiscalError, FiscalYear, MemoryStore, ProjectionEngine};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

async fn seed(
    store: &MemoryStore,
    revenues: i64,
    expenditures: i64,
    pension: i64,
    balance: i64,
) -> FiscalYear {
    let fy = FiscalYear::new(Uuid::new_v4(), 2024).completed();
    store.save_fiscal_year(&fy).await.unwrap();

    let mut facts = FinancialFacts::new(fy.id);
    facts.total_revenues = Some(Decimal::from(revenues));
    facts.total_expenditures = Some(Decimal::from(expenditures));
    facts.pension_contributions = Some(Decimal::from(pension));
    facts.general_fund_balance = Some(Decimal::from(balance));
    store.save_financial_facts(&facts).await.unwrap();
    fy
}

fn engine(store: Arc<MemoryStore>) -> ProjectionEngine {
    ProjectionEngine::new(store, FiscalConfig::default().projection_settings())
}

#[tokio::test]
async fn test_base_scenario_projects_horizon() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 100_000_000, 100_000_000, 15_000_000, 20_000_000).await;

    let projection = engine(store).project(fy.id, "base").await.unwrap();

    assert_eq!(projection.years.len(), 5);
    assert_eq!(projection.years[0].fiscal_year, 2025);
    assert_eq!(projection.years[4].fiscal_year, 2029);
    // Expenditures grow faster than revenues under the base scenario
    assert!(projection.years.iter().all(|y| y.is_deficit));
    assert!(projection
        .years
        .windows(2)
        .all(|pair| pair[1].beginning_balance == pair[0].ending_balance));
}

#[tokio::test]
async fn test_pessimistic_cliff_with_sensitivity() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 100_000_000, 101_000_000, 20_000_000, 4_000_000).await;

    let analysis = engine(store).fiscal_cliff(fy.id, "pessimistic").await.unwrap();

    assert!(analysis.has_cliff);
    let cliff_year = analysis.cliff_year.unwrap();
    assert_eq!(
        analysis.years_until_cliff,
        Some((cliff_year - 2024) as u32)
    );
    assert!(analysis.cliff_balance.unwrap() <= Decimal::ZERO);

    let revenue = analysis.revenue_increase_needed_percent.unwrap();
    let expenditure = analysis.expenditure_decrease_needed_percent.unwrap();
    assert!(revenue > Decimal::ZERO);
    assert!(expenditure > Decimal::ZERO);
    // Expenditures exceed revenues, so the same gap is a smaller share of them
    assert!(expenditure <= revenue);
    assert!(analysis.summary.contains("pessimistic"));
}

#[tokio::test]
async fn test_healthy_city_has_no_cliff() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 120_000_000, 100_000_000, 10_000_000, 30_000_000).await;

    let analysis = engine(store).fiscal_cliff(fy.id, "optimistic").await.unwrap();

    assert!(!analysis.has_cliff);
    assert_eq!(analysis.cliff_year, None);
    assert_eq!(analysis.years_until_cliff, None);
    assert_eq!(analysis.revenue_increase_needed_percent, None);
    assert_eq!(analysis.expenditure_decrease_needed_percent, None);
}

#[tokio::test]
async fn test_compare_orders_scenarios() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 100_000_000, 100_000_000, 15_000_000, 20_000_000).await;

    let comparison = engine(store).compare(fy.id).await.unwrap();

    assert_eq!(comparison.projections.len(), 3);
    assert_eq!(comparison.cliffs.len(), 3);
    assert_eq!(comparison.years.len(), 5);
    for year in &comparison.years {
        assert_eq!(year.best_scenario, "optimistic");
        assert_eq!(year.worst_scenario, "pessimistic");
        assert!(year.spread > Decimal::ZERO);
    }
}

#[tokio::test]
async fn test_incomplete_base_year() {
    let store = Arc::new(MemoryStore::new());
    let fy = FiscalYear::new(Uuid::new_v4(), 2024);
    store.save_fiscal_year(&fy).await.unwrap();

    let err = engine(store).project(fy.id, "base").await.unwrap_err();
    assert!(matches!(
        err,
        FiscalError::IncompleteData { fiscal_year: 2024, .. }
    ));
}

#[tokio::test]
async fn test_unknown_year_and_scenario() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 100, 100, 10, 10).await;
    let engine = engine(store);

    assert!(matches!(
        engine.project(Uuid::new_v4(), "base").await,
        Err(FiscalError::NotFound { entity: "Fiscal year", .. })
    ));
    assert!(matches!(
        engine.project(fy.id, "stagflation").await,
        Err(FiscalError::NotFound { entity: "Scenario", .. })
    ));
}

#[tokio::test]
async fn test_custom_horizon_and_scenarios() {
    let store = Arc::new(MemoryStore::new());
    let fy = seed(&store, 1_000, 1_000, 0, 100).await;

    let settings = ProjectionSettings {
        horizon_years: 10,
        minimum_reserve_ratio: Decimal::ZERO,
        scenarios: vec![ScenarioAssumptions::new(
            "austerity",
            Decimal::ZERO,
            Decimal::new(-1, 2),
            Decimal::ZERO,
        )],
    };
    let engine = ProjectionEngine::new(store, settings);
    let projection = engine.project(fy.id, "Austerity").await.unwrap();

    assert_eq!(projection.years.len(), 10);
    assert!(projection.years.iter().all(|y| !y.is_deficit));
    assert!(projection.years.iter().all(|y| !y.reserves_below_minimum));
}
