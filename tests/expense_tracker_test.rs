mod common;

use std::sync::Arc;

use common::{FailingTable, FlakyTable, TEST_USER_ID, setup_store};
use my_pms::models::{CategoryUpdate, ExpenseUpdate, NewCategory, NewExpense};
use my_pms::{AuthManager, ExpenseTracker, PmsError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::{date, datetime};
use uuid::Uuid;

fn expense(amount: Decimal, category_id: Uuid, description: &str) -> NewExpense {
    NewExpense {
        amount,
        category_id,
        date: None,
        description: description.to_string(),
        associated_object_id: None,
    }
}

#[tokio::test]
async fn test_over_budget_scenario() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let groceries = tracker
        .add_category(NewCategory::new("Groceries", Some(dec!(500))))
        .await?;
    tracker
        .add_expense(expense(dec!(350), groceries.id, "Weekly shop"))
        .await?;
    tracker
        .add_expense(expense(dec!(250), groceries.id, "Party supplies"))
        .await?;

    assert_eq!(tracker.total_for_category(groceries.id), dec!(600));
    assert!(tracker.is_over_budget(groceries.id));
    assert_eq!(tracker.remaining_budget(groceries.id), Some(dec!(-100)));

    Ok(())
}

#[tokio::test]
async fn test_category_without_budget_is_never_over_budget() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let travel = tracker
        .add_category(NewCategory::new("Travel", None))
        .await?;
    tracker
        .add_expense(expense(dec!(10000), travel.id, "Flights"))
        .await?;

    assert!(!tracker.is_over_budget(travel.id));
    assert_eq!(tracker.remaining_budget(travel.id), None);
    assert_eq!(tracker.total_for_category(travel.id), dec!(10000));

    Ok(())
}

#[tokio::test]
async fn test_totals_for_empty_and_unknown_categories() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let empty = tracker
        .add_category(NewCategory::new("Books", Some(dec!(50))))
        .await?;
    let unknown = Uuid::new_v4();

    assert_eq!(tracker.total_for_category(empty.id), Decimal::ZERO);
    assert_eq!(tracker.remaining_budget(empty.id), Some(dec!(50)));
    assert!(!tracker.is_over_budget(empty.id));

    assert_eq!(tracker.total_for_category(unknown), Decimal::ZERO);
    assert!(!tracker.is_over_budget(unknown));
    assert_eq!(tracker.remaining_budget(unknown), None);

    Ok(())
}

#[tokio::test]
async fn test_total_matches_exactly_the_category_expenses() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let food = tracker.add_category(NewCategory::new("Food", None)).await?;
    let rent = tracker.add_category(NewCategory::new("Rent", None)).await?;

    tracker.add_expense(expense(dec!(12.5), food.id, "Lunch")).await?;
    tracker.add_expense(expense(dec!(7.25), food.id, "Coffee")).await?;
    tracker.add_expense(expense(dec!(1200), rent.id, "March rent")).await?;

    let food_expenses = tracker.expenses_for_category(food.id);
    assert_eq!(food_expenses.len(), 2);
    assert!(food_expenses.iter().all(|e| e.category_id == food.id));
    assert_eq!(tracker.total_for_category(food.id), dec!(19.75));
    assert_eq!(tracker.total_for_category(rent.id), dec!(1200));

    Ok(())
}

#[tokio::test]
async fn test_object_tracking_aggregates() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let parts = tracker.add_category(NewCategory::new("Parts", None)).await?;
    let labour = tracker.add_category(NewCategory::new("Labour", None)).await?;

    let mut brake_pads = expense(dec!(80), parts.id, "Brake pads");
    brake_pads.associated_object_id = Some("car-42".to_string());
    let mut fitting = expense(dec!(120), labour.id, "Fitting");
    fitting.associated_object_id = Some("  car-42 ".to_string());
    let mut bike_chain = expense(dec!(30), parts.id, "Chain");
    bike_chain.associated_object_id = Some("bike-1".to_string());

    tracker.add_expense(brake_pads).await?;
    tracker.add_expense(fitting).await?;
    tracker.add_expense(bike_chain).await?;
    tracker.add_expense(expense(dec!(5), parts.id, "Untracked")).await?;

    assert_eq!(tracker.expenses_for_object("car-42").len(), 2);
    assert_eq!(tracker.total_for_object("car-42"), dec!(200));
    assert_eq!(
        tracker.total_for_object_in_category("car-42", parts.id),
        dec!(80)
    );
    assert_eq!(
        tracker.expenses_for_object_in_category("car-42", labour.id)[0].description,
        "Fitting"
    );
    assert_eq!(tracker.total_for_object("unknown"), Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_month_filter_matches_year_and_month() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());
    let bills = tracker.add_category(NewCategory::new("Bills", None)).await?;

    let dated = [
        (dec!(40), datetime!(2024-03-01 00:00 UTC)),
        (dec!(60), datetime!(2024-03-31 23:59 UTC)),
        (dec!(100), datetime!(2023-03-15 12:00 UTC)),
        (dec!(7), datetime!(2024-04-01 00:00 UTC)),
    ];
    for (amount, date) in dated {
        let mut new = expense(amount, bills.id, "Utility");
        new.date = Some(date);
        tracker.add_expense(new).await?;
    }

    let march = tracker.expenses_for_month(date!(2024 - 03 - 17));
    assert_eq!(march.len(), 2);
    assert_eq!(tracker.total_for_month(date!(2024 - 03 - 01)), dec!(100));
    assert_eq!(tracker.total_for_month(date!(2024 - 02 - 01)), Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_add_round_trip_and_ordering() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());
    let food = tracker.add_category(NewCategory::new("Food", Some(dec!(300)))).await?;

    let first = tracker.add_expense(expense(dec!(10), food.id, "First")).await?;
    let second = tracker.add_expense(expense(dec!(20), food.id, "Second")).await?;

    let expenses = tracker.expenses();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].id, second.id);
    assert_eq!(expenses[1].id, first.id);
    assert!(expenses.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let stored = &expenses[1];
    assert_eq!(stored.amount, dec!(10));
    assert_eq!(stored.description, "First");
    assert_eq!(stored.category_id, food.id);
    assert_eq!(stored.user_id, TEST_USER_ID);

    let categories = tracker.categories();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Food");
    assert_eq!(categories[0].budget, Some(dec!(300)));
    assert_eq!(categories[0].color, "#007AFF");

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_expense() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());
    let food = tracker.add_category(NewCategory::new("Food", None)).await?;
    let fun = tracker.add_category(NewCategory::new("Fun", None)).await?;

    let created = tracker.add_expense(expense(dec!(15), food.id, "Cinema")).await?;
    tracker
        .update_expense(
            &created,
            ExpenseUpdate {
                amount: dec!(18),
                category_id: fun.id,
                date: created.date,
                description: "Cinema and popcorn".to_string(),
                associated_object_id: None,
            },
        )
        .await?;

    let updated = tracker.expenses();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, created.id);
    assert_eq!(updated[0].amount, dec!(18));
    assert_eq!(updated[0].category_id, fun.id);
    assert_eq!(tracker.total_for_category(food.id), Decimal::ZERO);

    tracker.delete_expense(&updated[0]).await?;
    assert!(tracker.expenses().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_update_category_budget() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());
    let food = tracker.add_category(NewCategory::new("Food", Some(dec!(100)))).await?;
    tracker.add_expense(expense(dec!(150), food.id, "Feast")).await?;
    assert!(tracker.is_over_budget(food.id));

    tracker
        .update_category(
            &food,
            CategoryUpdate {
                name: " Food & Drink ".to_string(),
                budget: Some(dec!(200)),
                color: "#FF9500".to_string(),
            },
        )
        .await?;

    let category = tracker.category(food.id).expect("category still present");
    assert_eq!(category.name, "Food & Drink");
    assert_eq!(category.color, "#FF9500");
    assert!(!tracker.is_over_budget(food.id));
    assert_eq!(tracker.remaining_budget(food.id), Some(dec!(50)));

    Ok(())
}

#[tokio::test]
async fn test_orphaned_expenses_drop_out_of_joined_view() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());
    let kept = tracker.add_category(NewCategory::new("Kept", None)).await?;
    let removed = tracker.add_category(NewCategory::new("Removed", None)).await?;

    tracker.add_expense(expense(dec!(1), kept.id, "Stays")).await?;
    tracker.add_expense(expense(dec!(2), removed.id, "Orphaned")).await?;
    tracker.delete_category(&removed).await?;

    assert_eq!(tracker.expenses().len(), 2);
    let joined = tracker.categorized_expenses();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].expense.description, "Stays");
    assert_eq!(joined[0].category.id, kept.id);
    assert!(!tracker.is_over_budget(removed.id));

    Ok(())
}

#[tokio::test]
async fn test_validation_rejects_before_any_round_trip() -> anyhow::Result<()> {
    let remote = Arc::new(FailingTable::new("should not be called"));
    let auth = Arc::new(AuthManager::new());
    let tracker = ExpenseTracker::new(remote.clone(), auth);
    let category_id = Uuid::new_v4();

    let zero = tracker
        .add_expense(expense(Decimal::ZERO, category_id, "Nothing"))
        .await;
    assert!(matches!(zero, Err(PmsError::Validation(_))));

    let negative = tracker
        .add_expense(expense(dec!(-5), category_id, "Refund"))
        .await;
    assert!(matches!(negative, Err(PmsError::Validation(_))));

    let blank = tracker
        .add_expense(expense(dec!(5), category_id, "   "))
        .await;
    assert!(matches!(blank, Err(PmsError::Validation(_))));

    let unnamed = tracker.add_category(NewCategory::new("", None)).await;
    assert!(matches!(unnamed, Err(PmsError::Validation(_))));

    let negative_budget = tracker
        .add_category(NewCategory::new("Savings", Some(dec!(-1))))
        .await;
    assert!(matches!(negative_budget, Err(PmsError::Validation(_))));

    assert_eq!(remote.call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_add_without_session_is_not_authenticated() -> anyhow::Result<()> {
    let store = setup_store().await?;
    store.auth.sign_out();
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let result = tracker.add_category(NewCategory::new("Food", None)).await;
    assert_eq!(result.unwrap_err(), PmsError::NotAuthenticated);
    assert!(tracker.categories().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_add_failure_is_propagated() -> anyhow::Result<()> {
    let remote = Arc::new(FailingTable::new("new row violates row-level security policy"));
    let auth = Arc::new(AuthManager::with_session(my_pms::Session::new(
        TEST_USER_ID,
        "token",
    )));
    let tracker = ExpenseTracker::new(remote.clone(), auth);

    let result = tracker
        .add_expense(expense(dec!(9.99), Uuid::new_v4(), "Snacks"))
        .await;
    assert_eq!(
        result.unwrap_err(),
        PmsError::Remote("new row violates row-level security policy".to_string())
    );
    assert_eq!(remote.call_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_failure_is_propagated() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let flaky = Arc::new(FlakyTable::new(store.tables.clone()));
    let tracker = ExpenseTracker::new(flaky.clone(), store.auth.clone());
    let food = tracker.add_category(NewCategory::new("Food", None)).await?;
    let created = tracker.add_expense(expense(dec!(3), food.id, "Tea")).await?;

    flaky
        .fail_deletes
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let result = tracker.delete_expense(&created).await;

    assert!(matches!(result, Err(PmsError::Remote(_))));
    assert_eq!(tracker.expenses().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_mutation_commits_even_when_refetch_fails() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let flaky = Arc::new(FlakyTable::new(store.tables.clone()));
    let tracker = ExpenseTracker::new(flaky.clone(), store.auth.clone());
    let food = tracker.add_category(NewCategory::new("Food", None)).await?;
    tracker.fetch_expenses().await;

    flaky
        .fail_selects
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let created = tracker.add_expense(expense(dec!(4), food.id, "Bagel")).await;
    assert!(created.is_ok());

    let state = tracker.expenses_state();
    assert!(state.records.is_empty());
    assert_eq!(state.last_error.as_deref(), Some("connection reset"));
    assert!(!state.is_loading);

    flaky
        .fail_selects
        .store(false, std::sync::atomic::Ordering::SeqCst);
    tracker.fetch_expenses().await;
    assert_eq!(tracker.expenses().len(), 1);
    assert_eq!(tracker.expenses_state().last_error, None);

    Ok(())
}

#[tokio::test]
async fn test_large_amounts_stay_exact() -> anyhow::Result<()> {
    let store = setup_store().await?;
    let tracker = ExpenseTracker::new(store.remote(), store.auth.clone());

    let savings = tracker
        .add_category(NewCategory::new("Savings", Some(dec!(100000000000000.01))))
        .await?;
    tracker
        .add_expense(expense(dec!(99999999999999.99), savings.id, "Transfer"))
        .await?;

    let stored = tracker.category(savings.id).expect("category loaded");
    assert_eq!(stored.budget, Some(dec!(100000000000000.01)));
    assert_eq!(tracker.expenses()[0].amount, dec!(99999999999999.99));
    assert_eq!(tracker.remaining_budget(savings.id), Some(dec!(0.02)));
    assert!(!tracker.is_over_budget(savings.id));

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_without_session_make_no_round_trip() -> anyhow::Result<()> {
    let remote = Arc::new(FailingTable::new("should not be called"));
    let tracker = ExpenseTracker::new(remote.clone(), Arc::new(AuthManager::new()));
    let category = my_pms::models::Category {
        id: Uuid::new_v4(),
        user_id: TEST_USER_ID.to_string(),
        name: "Food".to_string(),
        budget: None,
        color: "#007AFF".to_string(),
        created_at: datetime!(2024-03-01 12:00 UTC),
    };
    let existing = my_pms::models::Expense {
        id: Uuid::new_v4(),
        user_id: TEST_USER_ID.to_string(),
        amount: dec!(12),
        category_id: category.id,
        date: datetime!(2024-03-02 12:00 UTC),
        description: "Lunch".to_string(),
        associated_object_id: None,
        created_at: datetime!(2024-03-02 12:00 UTC),
    };

    let update = tracker
        .update_category(
            &category,
            CategoryUpdate {
                name: "Meals".to_string(),
                budget: None,
                color: category.color.clone(),
            },
        )
        .await;
    assert_eq!(update.unwrap_err(), PmsError::NotAuthenticated);

    let update = tracker
        .update_expense(
            &existing,
            ExpenseUpdate {
                amount: dec!(15),
                category_id: category.id,
                date: existing.date,
                description: "Lunch".to_string(),
                associated_object_id: None,
            },
        )
        .await;
    assert_eq!(update.unwrap_err(), PmsError::NotAuthenticated);

    assert_eq!(
        tracker.delete_expense(&existing).await.unwrap_err(),
        PmsError::NotAuthenticated
    );
    assert_eq!(
        tracker.delete_category(&category).await.unwrap_err(),
        PmsError::NotAuthenticated
    );
    assert_eq!(remote.call_count(), 0);

    Ok(())
}
