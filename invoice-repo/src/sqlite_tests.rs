//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use invoice_types::{
        Account, AccountId, DomainError, Invoice, InvoiceId, InvoiceState, LedgerRepository,
        Money, OpenAccountRequest, RepoError, TransferOrder,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn open(repo: &SqliteRepo, email: &str, balance: i64) -> Account {
        repo.create_account(OpenAccountRequest {
            name: "Test".to_string(),
            surname: "Holder".to_string(),
            email: email.to_string(),
            phone_number: Some("+44 20 7946 0000".to_string()),
            initial_balance: balance,
        })
        .await
        .unwrap()
    }

    async fn pending(repo: &SqliteRepo, payer: &Account, receiver: &Account, amount: i64) -> Invoice {
        let invoice =
            Invoice::new(amount, Utc::now() + Duration::days(7), payer.id, receiver.id).unwrap();
        repo.insert_invoice(invoice).await.unwrap()
    }

    async fn balance(repo: &SqliteRepo, id: AccountId) -> i64 {
        repo.get_account_balance(id).await.unwrap().cents()
    }

    #[tokio::test]
    async fn test_create_and_get_account() {
        let repo = setup_repo().await;

        let created = open(&repo, "alice@example.com", 2500).await;
        let fetched = repo.get_account(created.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.phone_number.as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(fetched.balance.cents(), 2500);
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let repo = setup_repo().await;

        assert!(repo.get_account(AccountId::new()).await.unwrap().is_none());
        assert!(matches!(
            repo.get_account_balance(AccountId::new()).await,
            Err(RepoError::Domain(DomainError::AccountNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_repo().await;
        open(&repo, "same@example.com", 0).await;

        let result = repo
            .create_account(OpenAccountRequest {
                name: "Other".to_string(),
                surname: "Holder".to_string(),
                email: "same@example.com".to_string(),
                phone_number: None,
                initial_balance: 0,
            })
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_account_by_email() {
        let repo = setup_repo().await;
        let account = open(&repo, "bob@example.com", 0).await;

        let found = repo.find_account_id_by_email("bob@example.com").await.unwrap();
        let missing = repo.find_account_id_by_email("nobody@example.com").await.unwrap();

        assert_eq!(found, Some(account.id));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_get_invoice() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;

        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        let fetched = repo.get_invoice(invoice.id).await.unwrap();

        assert_eq!(fetched.id, invoice.id);
        assert_eq!(fetched.amount.cents(), 4000);
        assert_eq!(fetched.state, InvoiceState::Pending);
        assert_eq!(fetched.payer_account_id, payer.id);
        assert_eq!(fetched.receiver_account_id, receiver.id);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_rejected() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;

        let result = repo.insert_invoice(invoice).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::AlreadyExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_insert_unknown_account_rejected() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let invoice = Invoice::new(100, Utc::now(), payer.id, AccountId::new()).unwrap();

        let result = repo.insert_invoice(invoice.clone()).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InvalidInvoice(_)))
        ));
        assert!(matches!(
            repo.get_invoice(invoice.id).await,
            Err(RepoError::Domain(DomainError::InvoiceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_invoice_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_invoice(InvoiceId::new()).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InvoiceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_pay_invoice_moves_funds() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 500).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;

        let settlement = repo.apply_transfer(TransferOrder::pay(&invoice)).await.unwrap();

        assert_eq!(settlement.invoice.state, InvoiceState::Paid);
        assert_eq!(settlement.payer_balance.cents(), 6000);
        assert_eq!(settlement.receiver_balance.cents(), 4500);
        assert_eq!(balance(&repo, payer.id).await, 6000);
        assert_eq!(balance(&repo, receiver.id).await, 4500);
        assert_eq!(
            repo.get_invoice(invoice.id).await.unwrap().state,
            InvoiceState::Paid
        );
    }

    #[tokio::test]
    async fn test_pay_twice_rejected() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        let order = TransferOrder::pay(&invoice);

        repo.apply_transfer(order).await.unwrap();
        let result = repo.apply_transfer(order).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::AlreadyPaid(_)))
        ));
        assert_eq!(balance(&repo, payer.id).await, 6000);
        assert_eq!(balance(&repo, receiver.id).await, 4000);
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 100).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;

        let result = repo.apply_transfer(TransferOrder::pay(&invoice)).await;

        match result {
            Err(RepoError::Domain(DomainError::InsufficientFunds {
                available,
                requested,
            })) => {
                assert_eq!(available, 100);
                assert_eq!(requested, 4000);
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other.err()),
        }
        assert_eq!(balance(&repo, payer.id).await, 100);
        assert_eq!(balance(&repo, receiver.id).await, 0);
        assert_eq!(
            repo.get_invoice(invoice.id).await.unwrap().state,
            InvoiceState::Pending
        );
    }

    #[tokio::test]
    async fn test_mismatched_order_rejected() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        let mut order = TransferOrder::pay(&invoice);
        order.amount = Money::from_cents(1);

        let result = repo.apply_transfer(order).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
        assert_eq!(balance(&repo, payer.id).await, 10000);
    }

    #[tokio::test]
    async fn test_failed_credit_rolls_back_everything() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;

        // Any balance increase aborts, so the unit fails after the debit ran
        sqlx::query(
            r#"CREATE TRIGGER fail_credit BEFORE UPDATE OF balance ON accounts
               WHEN NEW.balance > OLD.balance
               BEGIN SELECT RAISE(ABORT, 'injected credit failure'); END"#,
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let result = repo.apply_transfer(TransferOrder::pay(&invoice)).await;

        assert!(matches!(result, Err(RepoError::Database(_))));
        assert_eq!(balance(&repo, payer.id).await, 10000);
        assert_eq!(balance(&repo, receiver.id).await, 0);
        assert_eq!(
            repo.get_invoice(invoice.id).await.unwrap().state,
            InvoiceState::Pending
        );

        sqlx::query("DROP TRIGGER fail_credit")
            .execute(repo.pool())
            .await
            .unwrap();

        repo.apply_transfer(TransferOrder::pay(&invoice)).await.unwrap();
        assert_eq!(balance(&repo, payer.id).await, 6000);
        assert_eq!(balance(&repo, receiver.id).await, 4000);
    }

    #[tokio::test]
    async fn test_delete_invoice() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;

        repo.delete_invoice(invoice.id).await.unwrap();

        assert!(matches!(
            repo.get_invoice(invoice.id).await,
            Err(RepoError::Domain(DomainError::InvoiceNotFound(_)))
        ));
        assert!(matches!(
            repo.delete_invoice(invoice.id).await,
            Err(RepoError::Domain(DomainError::InvoiceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_paid_invoice_refused() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        repo.apply_transfer(TransferOrder::pay(&invoice)).await.unwrap();

        let result = repo.delete_invoice(invoice.id).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InvoiceSettled(_)))
        ));
        assert!(repo.get_invoice(invoice.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_pay_deleted_invoice_not_found() {
        let repo = setup_repo().await;
        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        repo.delete_invoice(invoice.id).await.unwrap();

        let result = repo.apply_transfer(TransferOrder::pay(&invoice)).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InvoiceNotFound(_)))
        ));
        assert_eq!(balance(&repo, payer.id).await, 10000);
    }

    #[tokio::test]
    async fn test_list_invoices_for_account() {
        let repo = setup_repo().await;
        let alice = open(&repo, "alice@example.com", 10000).await;
        let bob = open(&repo, "bob@example.com", 10000).await;
        let carol = open(&repo, "carol@example.com", 10000).await;

        let first = pending(&repo, &alice, &bob, 100).await;
        let second = pending(&repo, &bob, &alice, 200).await;
        pending(&repo, &bob, &carol, 300).await;

        let listed = repo.list_invoices_for_account(alice.id).await.unwrap();

        assert_eq!(
            listed.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert!(
            repo.list_invoices_for_account(AccountId::new())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_concurrent_payments_settle_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
        let repo = Arc::new(SqliteRepo::new(&url).await.unwrap());

        let payer = open(&repo, "payer@example.com", 10000).await;
        let receiver = open(&repo, "receiver@example.com", 0).await;
        let invoice = pending(&repo, &payer, &receiver, 4000).await;
        let order = TransferOrder::pay(&invoice);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.apply_transfer(order).await })
            })
            .collect();

        let mut settled = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => settled += 1,
                Err(e) => assert!(
                    matches!(e, RepoError::Domain(DomainError::AlreadyPaid(_))),
                    "unexpected error: {}",
                    e
                ),
            }
        }

        assert_eq!(settled, 1);
        assert_eq!(balance(&repo, payer.id).await, 6000);
        assert_eq!(balance(&repo, receiver.id).await, 4000);
    }

    #[tokio::test]
    async fn test_balances_conserved_across_payments() {
        let repo = setup_repo().await;
        let alice = open(&repo, "alice@example.com", 5000).await;
        let bob = open(&repo, "bob@example.com", 3000).await;
        let carol = open(&repo, "carol@example.com", 0).await;

        // Carol holds 4000 when the 9999 invoice comes due
        let invoices = vec![
            (pending(&repo, &alice, &bob, 1500).await, true),
            (pending(&repo, &bob, &carol, 4000).await, true),
            (pending(&repo, &carol, &alice, 9999).await, false),
            (pending(&repo, &alice, &carol, 3500).await, true),
        ];

        for (invoice, settles) in &invoices {
            let result = repo.apply_transfer(TransferOrder::pay(invoice)).await;

            if *settles {
                assert!(result.is_ok(), "{} failed: {:?}", invoice.amount, result.err());
            } else {
                assert!(
                    matches!(
                        result,
                        Err(RepoError::Domain(DomainError::InsufficientFunds {
                            available: 4000,
                            requested: 9999
                        }))
                    ),
                    "{} unexpected: {:?}",
                    invoice.amount,
                    result.err()
                );
            }
        }

        let mut total = 0;
        for id in [alice.id, bob.id, carol.id] {
            total += balance(&repo, id).await;
        }
        assert_eq!(total, 8000);
        assert_eq!(balance(&repo, alice.id).await, 0);
        assert_eq!(balance(&repo, bob.id).await, 500);
        assert_eq!(balance(&repo, carol.id).await, 7500);
    }
}
