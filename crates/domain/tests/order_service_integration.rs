//! Integration tests for the order service.
//!
//! These tests drive the service against the in-memory repository and check
//! the write-through and cache-aside contracts end to end.

use std::sync::Arc;

use cache::{CacheMetrics, OrderCache};
use common::{Item, Order, OrderUid};
use domain::{OrderService, ServiceError, ValidationError};
use futures_util::future::join_all;
use order_store::{InMemoryOrderRepository, OrderRepository};

fn create_service() -> OrderService<InMemoryOrderRepository> {
    OrderService::new(InMemoryOrderRepository::new(), OrderCache::new())
}

fn make_payload(uid: &str) -> Vec<u8> {
    serde_json::json!({
        "order_uid": uid,
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {"name": "Test Testov", "zip": "2639809", "city": "Kiryat Mozkin"},
        "payment": {"transaction": uid, "currency": "USD", "amount": 1817, "payment_dt": 1637907727},
        "items": [{"chrt_id": 9934930, "name": "Mascaras", "price": 453, "sale": 30}],
        "locale": "en",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z"
    })
    .to_string()
    .into_bytes()
}

fn make_order(uid: &str) -> Order {
    Order {
        order_uid: OrderUid::new(uid),
        track_number: "WBILMTESTTRACK".to_string(),
        items: vec![Item {
            chrt_id: 1,
            name: "Widget".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

mod ingestion {
    use super::*;

    #[tokio::test]
    async fn valid_message_is_stored_once_then_cached() {
        let service = create_service();
        let payload = make_payload("order-1");

        service.process_message(&payload).await.unwrap();

        let expected = Order::from_json(&payload).unwrap();
        assert_eq!(service.repository().create_calls(), 1);
        assert_eq!(
            service.repository().read(&OrderUid::new("order-1")).await.unwrap(),
            expected
        );
        assert_eq!(
            service.cache().get(&OrderUid::new("order-1")).await,
            Some(expected)
        );
    }

    #[tokio::test]
    async fn malformed_payload_never_reaches_store_or_cache() {
        let service = create_service();

        let err = service.process_message(b"not json at all").await.unwrap_err();

        assert!(matches!(err, ServiceError::MalformedPayload(_)));
        assert_eq!(service.repository().create_calls(), 0);
        assert_eq!(service.cache_size().await, 0);
    }

    #[tokio::test]
    async fn missing_order_uid_fails_validation_without_store_call() {
        let service = create_service();
        let payload = br#"{"track_number": "WBILMTESTTRACK", "items": [{"name": "x"}]}"#;

        let err = service.process_message(payload).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::ValidationFailed(ValidationError::MissingOrderUid)
        ));
        assert_eq!(service.repository().create_calls(), 0);
        assert_eq!(service.cache_size().await, 0);
    }

    #[tokio::test]
    async fn empty_items_fail_validation() {
        let service = create_service();
        let payload = br#"{"order_uid": "order-1", "track_number": "T", "items": []}"#;

        let err = service.process_message(payload).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::ValidationFailed(ValidationError::NoItems)
        ));
    }

    #[tokio::test]
    async fn store_failure_leaves_cache_untouched() {
        let service = create_service();
        service.repository().set_fail_writes(true);

        let err = service
            .process_message(&make_payload("order-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::PersistenceFailed(_)));
        assert!(err.is_transient());
        assert_eq!(service.repository().create_calls(), 1);
        assert_eq!(service.cache_size().await, 0);
    }

    #[tokio::test]
    async fn ingestion_does_not_touch_cache_counters() {
        let service = create_service();

        service.process_message(&make_payload("order-1")).await.unwrap();

        assert_eq!(service.cache_metrics(), CacheMetrics::default());
    }
}

mod lookup {
    use super::*;

    #[tokio::test]
    async fn miss_reads_store_once_then_serves_from_cache() {
        let repository = InMemoryOrderRepository::with_orders(vec![make_order("order-1")]).await;
        let service = OrderService::new(repository, OrderCache::new());
        let uid = OrderUid::new("order-1");

        let first = service.get_order(&uid).await.unwrap();
        let second = service.get_order(&uid).await.unwrap();

        assert_eq!(first, make_order("order-1"));
        assert_eq!(second, first);
        assert_eq!(service.repository().read_calls(), 1);
        assert_eq!(service.cache_metrics(), CacheMetrics { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn cached_order_is_served_without_store_access() {
        let service = create_service();
        service.process_message(&make_payload("order-1")).await.unwrap();
        service.repository().set_fail_reads(true);

        let order = service.get_order(&OrderUid::new("order-1")).await.unwrap();

        assert_eq!(order.order_uid.as_str(), "order-1");
        assert_eq!(service.repository().read_calls(), 0);
    }

    #[tokio::test]
    async fn empty_identifier_is_rejected() {
        let repository = InMemoryOrderRepository::with_orders(vec![make_order("order-1")]).await;
        let cache = OrderCache::new();
        cache.set(OrderUid::default(), make_order("")).await;
        let service = OrderService::new(repository, cache);

        let err = service.get_order(&OrderUid::new("")).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidIdentifier));
        assert_eq!(service.repository().read_calls(), 0);
        assert_eq!(service.cache_metrics(), CacheMetrics::default());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let service = create_service();

        let err = service
            .get_order(&OrderUid::new("missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(uid) if uid.as_str() == "missing"));
        assert_eq!(service.cache_size().await, 0);
    }

    #[tokio::test]
    async fn store_error_on_miss_is_persistence_failure() {
        let service = create_service();
        service.repository().set_fail_reads(true);

        let err = service
            .get_order(&OrderUid::new("order-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::PersistenceFailed(_)));
    }

    #[tokio::test]
    async fn returned_order_is_a_detached_copy() {
        let service = create_service();
        service.process_message(&make_payload("order-1")).await.unwrap();
        let uid = OrderUid::new("order-1");

        let mut order = service.get_order(&uid).await.unwrap();
        order.items.clear();
        order.delivery.city = "Elsewhere".to_string();

        let again = service.get_order(&uid).await.unwrap();
        assert_eq!(again.items.len(), 1);
        assert_eq!(again.delivery.city, "Kiryat Mozkin");
    }
}

mod warm_up {
    use super::*;

    #[tokio::test]
    async fn loads_every_stored_order() {
        let repository = InMemoryOrderRepository::with_orders(vec![
            make_order("a"),
            make_order("b"),
            make_order("c"),
        ])
        .await;
        let service = OrderService::new(repository, OrderCache::new());

        assert_eq!(service.warm_cache().await.unwrap(), 3);
        assert_eq!(service.cache_size().await, 3);

        service.get_order(&OrderUid::new("b")).await.unwrap();
        assert_eq!(service.repository().read_calls(), 0);
    }

    #[tokio::test]
    async fn listing_failure_caches_nothing() {
        let repository = InMemoryOrderRepository::with_orders(vec![make_order("a")]).await;
        repository.set_fail_reads(true);
        let service = OrderService::new(repository, OrderCache::new());

        let err = service.warm_cache().await.unwrap_err();

        assert!(matches!(err, ServiceError::PersistenceFailed(_)));
        assert_eq!(service.cache_size().await, 0);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ingest_and_lookup() {
        let service = Arc::new(create_service());
        let orders = 50;

        let writers = (0..orders).map(|n| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .process_message(&make_payload(&format!("order-{n}")))
                    .await
                    .unwrap();
            })
        });
        let readers = (0..orders).map(|n| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                // Either outcome is fine while the writer may not have run yet.
                match service.get_order(&OrderUid::new(format!("order-{n}"))).await {
                    Ok(order) => assert_eq!(order.order_uid.as_str(), format!("order-{n}")),
                    Err(err) => assert!(matches!(err, ServiceError::NotFound(_))),
                }
            })
        });

        let (written, read) = tokio::join!(join_all(writers), join_all(readers));
        for result in written.into_iter().chain(read) {
            result.unwrap();
        }

        assert_eq!(service.cache_size().await, orders);
        assert_eq!(service.repository().order_count().await, orders);
        assert_eq!(service.cache_metrics().lookups(), orders as u64);
    }
}
