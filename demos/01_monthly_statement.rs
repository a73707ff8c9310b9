/// monthly statement - full cycle against the in-memory data source
///
/// run with `RUST_LOG=common_expense_rs=debug` to see the engine's logs
use common_expense_rs::chrono::{NaiveDate, TimeZone, Utc};
use common_expense_rs::{
    ApartmentFinancialState, BillingPeriod, BillingService, BuildingPolicyConfig, Decimal,
    DistributionType, ExpenseCategory, ExpenseRecord, InMemoryDataSource, MeterReading, MeterType,
    Money, PayerResponsibility, PayerType, PaymentMethod, SafeTimeProvider, TimeSource, Uuid,
};
use tracing_subscriber::EnvFilter;

fn expense(
    title: &str,
    amount: i64,
    category: ExpenseCategory,
    distribution_type: DistributionType,
    payer_responsibility: PayerResponsibility,
) -> ExpenseRecord {
    ExpenseRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        amount: Money::from_major(amount),
        date: NaiveDate::from_ymd_opt(2024, 11, 5).expect("valid date"),
        category,
        distribution_type,
        payer_responsibility,
    }
}

fn reading(apartment_id: Uuid, month: u32, value: i64) -> MeterReading {
    MeterReading {
        apartment_id,
        meter_type: MeterType::HeatingHours,
        reading_date: NaiveDate::from_ymd_opt(2024, month, 30).expect("valid date"),
        value: Decimal::from(value),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let building_id = Uuid::new_v4();
    let apartments = vec![
        ApartmentFinancialState::new(Uuid::new_v4(), "1", Decimal::from(350))
            .with_heating_mills(Decimal::from(380))
            .with_previous_balance(Money::from_major(120)),
        ApartmentFinancialState::new(Uuid::new_v4(), "2", Decimal::from(350))
            .with_heating_mills(Decimal::from(340)),
        ApartmentFinancialState::new(Uuid::new_v4(), "3", Decimal::from(300))
            .with_heating_mills(Decimal::from(280))
            .with_previous_balance(Money::from_major(-40)),
    ];

    let readings = apartments
        .iter()
        .enumerate()
        .flat_map(|(i, apt)| {
            let start = 1000 * (i as i64 + 1);
            [reading(apt.apartment_id, 10, start), reading(apt.apartment_id, 11, start + 40 + 20 * i as i64)]
        })
        .collect();

    let source = InMemoryDataSource::new(building_id)
        .with_apartments(apartments.clone())
        .with_expenses(vec![
            expense("Heating oil", 900, ExpenseCategory::Heating, DistributionType::ByMeters, PayerResponsibility::Resident),
            expense("Elevator service", 60, ExpenseCategory::Elevator, DistributionType::Equal, PayerResponsibility::Shared),
            expense("Management fee", 120, ExpenseCategory::Management, DistributionType::ByParticipationMills, PayerResponsibility::Owner),
        ])
        .with_readings(readings);

    let policy = BuildingPolicyConfig::central_heating(30)
        .with_reserve_goal(Money::from_major(12_000), 24);
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 11, 25, 10, 0, 0).single().ok_or("bad time")?));
    let service = BillingService::new(source, policy)?
        .with_time_provider(time)
        .collect_reserve_fund(true);

    let november = BillingPeriod::month(2024, 11)?;
    let statement = service.prepare_statement(building_id, &november).await?;

    println!("statement for {}", november.month_label());
    for (state, rec) in statement.apartments.iter().zip(&statement.summary.reconciliations) {
        println!(
            "  apt {:>3}  share {:>8}  reserve {:>7}  net {:>8}  {:?}",
            state.number, state.expense_share, state.reserve_fund_share, rec.net_obligation, rec.status
        );
    }
    println!(
        "  total debt {}  total credit {}",
        statement.summary.total_debt, statement.summary.total_credit
    );

    // pay the first apartment in full
    let settlement = service
        .settle(&statement.apartments[0], None, PaymentMethod::BankTransfer, PayerType::Owner)
        .await?;
    println!("posted payment {:?}", settlement.record);

    Ok(())
}
