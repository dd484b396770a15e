//! Property-based tests for balance derivation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use payhub_shared::types::{ClientId, Currency, MerchantId};

use super::balance::ClientBalance;
use super::entry::{EntryKind, EntryStatus, LedgerEntry, NewEntry};

fn amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 100,000.00
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![
        Just(EntryKind::Deposit),
        Just(EntryKind::CashOut),
        Just(EntryKind::Charge {
            merchant_id: MerchantId::from_uuid(uuid::Uuid::nil()),
        }),
    ]
}

fn status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        4 => Just(EntryStatus::Completed),
        1 => Just(EntryStatus::Pending),
        1 => Just(EntryStatus::Failed),
    ]
}

fn history(client_id: ClientId) -> impl Strategy<Value = Vec<LedgerEntry>> {
    prop::collection::vec((kind(), amount(), status()), 0..40).prop_map(move |rows| {
        rows.into_iter()
            .map(|(kind, amount, status)| {
                let mut entry = LedgerEntry::create(NewEntry {
                    kind,
                    amount,
                    currency: Currency::Mxn,
                    client_id,
                    reference: String::new(),
                    idempotency_key: String::new(),
                    store_name: None,
                    external_id: None,
                });
                entry.status = status;
                entry
            })
            .collect()
    })
}

fn client() -> ClientId {
    ClientId::from_uuid(uuid::Uuid::from_u128(7))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The balance equals completed deposits minus completed debits.
    #[test]
    fn prop_balance_matches_sums(entries in history(client())) {
        let balance = ClientBalance::from_entries(client(), &entries).unwrap();

        let sum = |pred: fn(&EntryKind) -> bool| -> Decimal {
            entries
                .iter()
                .filter(|e| e.status == EntryStatus::Completed && pred(&e.kind))
                .map(|e| e.amount)
                .sum()
        };
        let deposits = sum(|k| matches!(k, EntryKind::Deposit));
        let charges = sum(|k| matches!(k, EntryKind::Charge { .. }));
        let cash_outs = sum(|k| matches!(k, EntryKind::CashOut));

        prop_assert_eq!(balance.deposits, deposits);
        prop_assert_eq!(balance.charges, charges);
        prop_assert_eq!(balance.cash_outs, cash_outs);
        prop_assert_eq!(balance.available, deposits - charges - cash_outs);
    }

    /// Signed amounts of completed entries add up to the balance.
    #[test]
    fn prop_balance_is_sum_of_signed_amounts(entries in history(client())) {
        let signed: Decimal = entries
            .iter()
            .filter(|e| e.is_completed())
            .map(LedgerEntry::signed_amount)
            .sum();

        prop_assert_eq!(ClientBalance::from_entries(client(), &entries).unwrap().available, signed);
    }

    /// Entry order does not affect the balance.
    #[test]
    fn prop_balance_is_order_independent(entries in history(client())) {
        let mut reversed = entries.clone();
        reversed.reverse();

        prop_assert_eq!(
            ClientBalance::from_entries(client(), &entries).unwrap(),
            ClientBalance::from_entries(client(), &reversed).unwrap()
        );
    }
}
