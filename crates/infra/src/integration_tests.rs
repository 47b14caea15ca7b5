//! Integration tests for the inventory ledger running against the
//! in-memory store.
//!
//! Verifies:
//! - Attaching parts consumes stock atomically and merges duplicate rows
//! - Failed attaches leave no side effects
//! - Detaching restores the full reserved quantity
//! - Concurrent attaches never oversell a part

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fixtrack_auth::{NewUser, UserRole};
    use fixtrack_core::{PartId, TicketId};
    use fixtrack_inventory::NewPart;
    use fixtrack_workshop::{NewDevice, NewTicket};

    use crate::store::{Entity, InMemoryStore, Store, StoreError};

    async fn seed_ticket(store: &InMemoryStore) -> TicketId {
        let customer = store
            .create_user(NewUser {
                email: format!("{}@example.com", uuid::Uuid::now_v7()),
                password_hash: "not-a-real-hash".to_string(),
                name: Some("Jane Doe".to_string()),
                role: UserRole::Customer,
            })
            .await
            .unwrap();

        let device = store
            .create_device(NewDevice {
                brand: "Apple".to_string(),
                model: "iPhone 13".to_string(),
                serial_number: format!("SN-{}", uuid::Uuid::now_v7()),
                status: None,
                price: None,
                customer_id: customer.id,
            })
            .await
            .unwrap();

        store
            .create_ticket(NewTicket {
                device_id: device.id,
                issue_description: "Cracked screen".to_string(),
                status: None,
                priority: None,
                estimated_cost: None,
                due_date: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_part(store: &InMemoryStore, stock: i64) -> PartId {
        store
            .create_part(NewPart {
                name: "iPhone 13 screen".to_string(),
                sku: Some(format!("SCR-{}", uuid::Uuid::now_v7())),
                stock_quantity: stock,
                price: 129.99,
                cost: 80.0,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn attach_consumes_stock_and_merges_duplicate_rows() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        let first = store.attach_part(ticket_id, part_id, 4).await.unwrap();
        assert_eq!(first.record.quantity, 4);
        assert_eq!(first.part.stock_quantity, 6);
        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 6);

        let second = store.attach_part(ticket_id, part_id, 3).await.unwrap();
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.quantity, 7);
        assert_eq!(second.part.stock_quantity, 3);

        let rows = store.list_ticket_parts_for_ticket(ticket_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.quantity, 7);
    }

    #[tokio::test]
    async fn attach_beyond_stock_fails_without_side_effects() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        store.attach_part(ticket_id, part_id, 4).await.unwrap();

        let err = store.attach_part(ticket_id, part_id, 7).await.unwrap_err();
        match err {
            StoreError::InsufficientStock(short) => {
                assert_eq!(short.available, 6);
                assert_eq!(short.requested, 7);
                assert_eq!(
                    short.to_string(),
                    "Insufficient stock. Available: 6, Requested: 7"
                );
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 6);
        let rows = store.list_ticket_parts_for_ticket(ticket_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.quantity, 4);
    }

    #[tokio::test]
    async fn attach_to_missing_ticket_or_part_leaves_stock_untouched() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        let err = store
            .attach_part(TicketId::new(), part_id, 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: Entity::Ticket,
                ..
            }
        ));

        let err = store
            .attach_part(ticket_id, PartId::new(), 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: Entity::Part,
                ..
            }
        ));

        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 10);
        assert!(store.list_ticket_parts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attach_rejects_non_positive_quantity() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        for quantity in [0, -3] {
            let err = store
                .attach_part(ticket_id, part_id, quantity)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Invalid(_)));
        }
        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn detach_restores_the_full_reserved_quantity() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        store.attach_part(ticket_id, part_id, 4).await.unwrap();
        let row = store.attach_part(ticket_id, part_id, 3).await.unwrap();

        store.detach_part(row.record.id).await.unwrap();

        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 10);
        assert!(store
            .list_ticket_parts_for_ticket(ticket_id)
            .await
            .unwrap()
            .is_empty());

        let err = store.detach_part(row.record.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: Entity::TicketPart,
                ..
            }
        ));
        // The second detach must not restore stock again.
        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn ticket_scoped_listing_filters_by_ticket() {
        let store = InMemoryStore::new();
        let ticket_a = seed_ticket(&store).await;
        let ticket_b = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        store.attach_part(ticket_a, part_id, 2).await.unwrap();
        store.attach_part(ticket_b, part_id, 3).await.unwrap();

        let rows_a = store.list_ticket_parts_for_ticket(ticket_a).await.unwrap();
        assert_eq!(rows_a.len(), 1);
        assert_eq!(rows_a[0].record.quantity, 2);

        let all = store.list_ticket_parts().await.unwrap();
        assert_eq!(all.len(), 2);

        let err = store
            .list_ticket_parts_for_ticket(TicketId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: Entity::Ticket,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_attaches_never_oversell() {
        let store = Arc::new(InMemoryStore::new());
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.attach_part(ticket_id, part_id, 1).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StoreError::InsufficientStock(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(store.get_part(part_id).await.unwrap().stock_quantity, 0);

        let rows = store.list_ticket_parts_for_ticket(ticket_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.quantity, 10);
    }

    #[tokio::test]
    async fn deleting_referenced_rows_is_rejected() {
        let store = InMemoryStore::new();
        let ticket_id = seed_ticket(&store).await;
        let part_id = seed_part(&store, 10).await;

        store.attach_part(ticket_id, part_id, 1).await.unwrap();

        assert!(matches!(
            store.delete_part(part_id).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            store.delete_ticket(ticket_id).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn duplicate_natural_keys_are_rejected() {
        let store = InMemoryStore::new();

        store
            .create_user(NewUser {
                email: "dup@example.com".to_string(),
                password_hash: "h".to_string(),
                name: None,
                role: UserRole::Customer,
            })
            .await
            .unwrap();
        let err = store
            .create_user(NewUser {
                email: "dup@example.com".to_string(),
                password_hash: "h".to_string(),
                name: None,
                role: UserRole::Customer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
