use chrono::NaiveDate;
use common_expense_rs::{
    allocate_payment, compute_expense_shares, reconcile_balance, resolve_meter_consumption,
    ApartmentFinancialState, BalanceStatus, BillingPeriod, BuildingPolicyConfig, DistributionType,
    Event, ExpenseCategory, ExpenseRecord, LedgerError, MeterReading, MeterType, Money,
    OutstandingDebts, PayerResponsibility,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn expense(
    category: ExpenseCategory,
    amount: Money,
    distribution_type: DistributionType,
) -> ExpenseRecord {
    ExpenseRecord {
        id: Uuid::new_v4(),
        title: format!("{:?}", category),
        amount,
        date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        category,
        distribution_type,
        payer_responsibility: PayerResponsibility::Owner,
    }
}

#[test]
fn critical_apartment_settles_in_priority_order() {
    let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(250))
        .with_previous_balance(Money::from_major(50))
        .with_expense_share(Money::from_major(80), Money::from_major(10));

    let rec = reconcile_balance(&state, &BuildingPolicyConfig::standard());
    assert_eq!(rec.net_obligation, Money::from_major(130));
    assert_eq!(rec.status, BalanceStatus::Critical);

    let allocation = allocate_payment(&OutstandingDebts::from_state(&state), rec.suggested_payment).unwrap();
    assert_eq!(allocation.previous_obligations_amount, Money::from_major(50));
    assert_eq!(allocation.reserve_fund_amount, Money::from_major(10));
    assert_eq!(allocation.common_expense_amount, Money::from_major(70));
}

#[test]
fn ten_cent_share_paid_in_full_is_settled() {
    let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(1))
        .with_expense_share(Money::from_minor(10), Money::ZERO)
        .with_total_payments(Money::from_minor(10));

    let rec = reconcile_balance(&state, &BuildingPolicyConfig::standard());
    assert_eq!(rec.net_obligation, Money::ZERO);
    assert_eq!(rec.status, BalanceStatus::Paid);
    assert_eq!(rec.suggested_payment, Money::ZERO);
}

#[test]
fn heating_expense_skipped_when_building_has_no_heating_mills() {
    let apartments = vec![
        ApartmentFinancialState::new(Uuid::new_v4(), "1", dec!(500)),
        ApartmentFinancialState::new(Uuid::new_v4(), "2", dec!(500)).with_heating_mills(dec!(0)),
    ];
    let heating = expense(
        ExpenseCategory::Heating,
        Money::from_major(400),
        DistributionType::ByHeatingMills,
    );
    let cleaning = expense(
        ExpenseCategory::Cleaning,
        Money::from_major(100),
        DistributionType::ByParticipationMills,
    );

    let batch = compute_expense_shares(
        &[heating.clone(), cleaning],
        &apartments,
        &[],
        &BuildingPolicyConfig::standard(),
    )
    .unwrap();

    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].expense_id, heating.id);
    assert!(batch.skipped[0].error.is_distribution());
    assert_eq!(
        batch.skipped[0].error,
        LedgerError::ZeroHeatingMills { expense_id: heating.id }
    );
    assert!(batch
        .events
        .events()
        .iter()
        .any(|e| matches!(e, Event::ExpenseSkipped { expense_id, .. } if *expense_id == heating.id)));

    for apt in &apartments {
        assert_eq!(batch.share_for(apt.apartment_id).unwrap().expense_share, Money::from_major(50));
    }
}

#[test]
fn reserve_expense_stays_inside_the_share() {
    let apartments = vec![
        ApartmentFinancialState::new(Uuid::new_v4(), "1", dec!(700)),
        ApartmentFinancialState::new(Uuid::new_v4(), "2", dec!(300)),
    ];
    let reserve = expense(
        ExpenseCategory::Reserve,
        Money::from_major(200),
        DistributionType::ByParticipationMills,
    );
    let management = expense(
        ExpenseCategory::Management,
        Money::from_major(100),
        DistributionType::ByParticipationMills,
    );

    let batch = compute_expense_shares(
        &[reserve, management],
        &apartments,
        &[],
        &BuildingPolicyConfig::standard(),
    )
    .unwrap();

    let first = batch.share_for(apartments[0].apartment_id).unwrap();
    assert_eq!(first.expense_share, Money::from_major(210));
    assert_eq!(first.reserve_fund_share, Money::from_major(140));

    let state = apartments[0]
        .clone()
        .with_expense_share(first.expense_share, first.reserve_fund_share);
    let rec = reconcile_balance(&state, &BuildingPolicyConfig::standard());
    assert_eq!(rec.net_obligation, Money::from_major(210));
}

#[test]
fn meter_history_resolves_consumption() {
    let apt = Uuid::new_v4();
    let point = |month: u32, day: u32, value| MeterReading {
        apartment_id: apt,
        meter_type: MeterType::Water,
        reading_date: NaiveDate::from_ymd_opt(2024, month, day).unwrap(),
        value,
    };
    let readings = vec![point(1, 31, dec!(10)), point(2, 29, dec!(14.5)), point(3, 31, dec!(20))];
    let march = BillingPeriod::month(2024, 3).unwrap();

    let resolved = resolve_meter_consumption(&readings, apt, MeterType::Water, &march).unwrap();
    assert_eq!(resolved.previous_reading, Some(dec!(14.5)));
    assert_eq!(resolved.consumption, dec!(5.5));

    let broken = vec![point(2, 29, dec!(14.5)), point(3, 31, dec!(9))];
    let err = resolve_meter_consumption(&broken, apt, MeterType::Water, &march).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.apartment_id(), Some(apt));
}
