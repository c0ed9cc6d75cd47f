use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fieldops::domain::order::{Customer, OrderDraft, ServiceItem, TechnicianRef};
use fieldops::domain::payroll::{
    CompensationProfile, CompensationScheme, Month, SupportAdditions, SupportDeductions, SupportPayslipInput,
    Technician,
};
use fieldops::metrics::Metrics;
use fieldops::store::{InMemoryOrderStore, InMemoryPayrollStore, InMemoryTechnicianDirectory};
use fieldops::{ActingUser, CoreConfig, OperationContext, OrderLifecycle, PayrollEngine, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fieldops=debug"))
        )
        .init();

    tracing::info!("🚀 Starting field-service order & payroll demo");

    // === 1. Configuration & metrics ===
    let config = CoreConfig::from_env();
    tracing::info!(
        utc_offset = %config.utc_offset,
        salary_day = config.payout.salary_day,
        bonus_day = config.payout.bonus_day,
        currency_decimals = config.currency_decimals,
        "Configuration loaded"
    );

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. In-memory stores ===
    let orders = Arc::new(InMemoryOrderStore::new(config.order_number_width));
    let payroll = Arc::new(InMemoryPayrollStore::new());
    let directory = Arc::new(InMemoryTechnicianDirectory::new(vec![Technician {
        email: "t1@example.com".to_string(),
        name: "T1".to_string(),
        code: Some("T001".to_string()),
        profile: Some(CompensationProfile {
            scheme: CompensationScheme::RevenueShare,
            base_salary: Decimal::from(20000),
            bonus: Decimal::ZERO,
            revenue_share_rate: Decimal::new(1, 1),
        }),
    }]));

    let lifecycle = OrderLifecycle::new(orders.clone()).with_metrics(metrics.clone());
    let engine = PayrollEngine::new(orders, payroll, directory, config.clone()).with_metrics(metrics.clone());

    let dispatcher = OperationContext::new(ActingUser::new("dispatch@example.com", Role::Support));
    let admin = OperationContext::new(ActingUser::new("admin@example.com", Role::Admin));

    // === 3. Order lifecycle ===
    tracing::info!("📝 Demonstrating order lifecycle");

    let order = lifecycle
        .create(
            &dispatcher,
            OrderDraft {
                customer: Customer {
                    name: "Demo Customer".to_string(),
                    phone: "0900000000".to_string(),
                    address: "1 Demo Road".to_string(),
                },
                assigned_technicians: vec![TechnicianRef::new("t1@example.com", "T1")],
                service_items: vec![ServiceItem {
                    name: "Split AC cleaning".to_string(),
                    quantity: 1,
                    unit_price: Decimal::from(3000),
                }],
                ..Default::default()
            },
        )
        .await?;
    let number = order.order_number.to_string();

    let now = Utc::now();
    lifecycle.confirm(&dispatcher, &number).await?;
    lifecycle.start_work(&dispatcher, &number, now - Duration::hours(2)).await?;
    lifecycle.finish_work(&dispatcher, &number, now).await?;

    if let Err(e) = lifecycle.cancel(&dispatcher, &number, "too late").await {
        tracing::warn!("Expected rejection: {}", e);
    }

    // === 4. Payroll ===
    let month = Month::containing(now, config.utc_offset).to_string();
    tracing::info!(%month, "💰 Computing payroll");

    engine
        .save_support_payslip(
            &admin,
            "support@example.com",
            &month,
            SupportPayslipInput {
                additions: SupportAdditions {
                    base_salary: Decimal::from(30000),
                    ..Default::default()
                },
                deductions: SupportDeductions {
                    labor_insurance: Decimal::from(1000),
                    health_insurance: Decimal::from(500),
                    ..Default::default()
                },
            },
        )
        .await?;

    let monthly = engine.monthly_payroll(&admin, &month).await?;
    tracing::info!(
        salary_date = %monthly.payout.salary_date,
        bonus_date = %monthly.payout.bonus_date,
        "Payout dates"
    );
    for entry in &monthly.entries {
        tracing::info!(
            user_email = %entry.record.user_email,
            source = ?entry.source,
            total = %entry.record.total,
            "Payroll entry"
        );
    }

    println!("{}", serde_json::to_string_pretty(&monthly)?);

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
