/// quick start - split one month's expenses and settle an apartment
use common_expense_rs::chrono::NaiveDate;
use common_expense_rs::{
    allocate_payment, compute_expense_shares, reconcile_balance, ApartmentFinancialState,
    BuildingPolicyConfig, Decimal, DistributionType, ExpenseCategory, ExpenseRecord, Money,
    OutstandingDebts, PayerResponsibility, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let policy = BuildingPolicyConfig::standard();

    // two apartments, 600 and 400 mills
    let apartments = vec![
        ApartmentFinancialState::new(Uuid::new_v4(), "A1", Decimal::from(600))
            .with_previous_balance(Money::from_major(50)),
        ApartmentFinancialState::new(Uuid::new_v4(), "A2", Decimal::from(400)),
    ];

    let expenses = vec![ExpenseRecord {
        id: Uuid::new_v4(),
        title: "Cleaning".to_string(),
        amount: Money::from_major(150),
        date: NaiveDate::from_ymd_opt(2024, 5, 3).ok_or("bad date")?,
        category: ExpenseCategory::Cleaning,
        distribution_type: DistributionType::ByParticipationMills,
        payer_responsibility: PayerResponsibility::Shared,
    }];

    // distribute
    let batch = compute_expense_shares(&expenses, &apartments, &[], &policy)?;

    for apartment in &apartments {
        let Some(share) = batch.share_for(apartment.apartment_id) else {
            continue;
        };
        let state = apartment
            .clone()
            .with_expense_share(share.expense_share, share.reserve_fund_share)
            .with_payer_split(share.resident_expenses, share.owner_expenses);

        // reconcile and allocate the suggested payment
        let rec = reconcile_balance(&state, &policy);
        let allocation = allocate_payment(&OutstandingDebts::from_state(&state), rec.suggested_payment)?;

        println!(
            "{}: share {} net {} ({:?}) -> previous {} / reserve {} / common {}",
            state.number,
            share.expense_share,
            rec.net_obligation,
            rec.status,
            allocation.previous_obligations_amount,
            allocation.reserve_fund_amount,
            allocation.common_expense_amount,
        );
    }

    Ok(())
}
