//! # Kitchen Order Store
//!
//! [`KitchenOrderStore`] is the seam to whatever persists kitchen orders. The
//! one requirement the lifecycle places on it is [`KitchenOrderStore::update`]:
//! a read-modify-write that is serialized per row, so the completion timer and
//! an explicit cancel can never interleave on the same order.
//!
//! [`InMemoryKitchenOrderStore`] keeps one [`Mutex`] per row behind a map-wide
//! [`RwLock`]. The map lock is only held long enough to find the row, so
//! writers on different orders never wait on each other.

use crate::{error::StoreError, model::KitchenOrder};
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

pub trait KitchenOrderStore: Send + Sync + 'static {
    /// Persists a new order and returns the stored copy.
    fn insert(&self, order: KitchenOrder) -> Result<KitchenOrder, StoreError>;

    fn find(&self, id: Uuid) -> Result<Option<KitchenOrder>, StoreError>;

    /// All orders for `source_order_id`, oldest first.
    fn find_by_source_order(&self, source_order_id: Uuid) -> Result<Vec<KitchenOrder>, StoreError>;

    /// Atomically applies `apply` to the row `id`.
    ///
    /// `apply` works on a draft; the draft replaces the stored row only when
    /// `apply` returns `Ok`. Returns `Ok(None)` if no such row exists.
    fn update<T, E, F>(&self, id: Uuid, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut KitchenOrder) -> Result<T, E>,
        E: From<StoreError>;

    /// Removes the row. Returns whether it existed.
    fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

type Row = Arc<Mutex<KitchenOrder>>;

#[derive(Default)]
pub struct InMemoryKitchenOrderStore {
    rows: RwLock<HashMap<Uuid, Row>>,
}

impl InMemoryKitchenOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn row(&self, id: Uuid) -> Option<Row> {
        self.rows.read().get(&id).cloned()
    }
}

impl KitchenOrderStore for InMemoryKitchenOrderStore {
    fn insert(&self, order: KitchenOrder) -> Result<KitchenOrder, StoreError> {
        self.rows
            .write()
            .insert(order.id, Arc::new(Mutex::new(order.clone())));
        Ok(order)
    }

    fn find(&self, id: Uuid) -> Result<Option<KitchenOrder>, StoreError> {
        Ok(self.row(id).map(|row| row.lock().clone()))
    }

    fn find_by_source_order(&self, source_order_id: Uuid) -> Result<Vec<KitchenOrder>, StoreError> {
        let rows: Vec<Row> = self.rows.read().values().cloned().collect();
        let mut orders: Vec<KitchenOrder> = rows
            .iter()
            .map(|row| row.lock().clone())
            .filter(|order| order.source_order_id == source_order_id)
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    fn update<T, E, F>(&self, id: Uuid, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut KitchenOrder) -> Result<T, E>,
        E: From<StoreError>,
    {
        let Some(row) = self.row(id) else {
            return Ok(None);
        };
        let mut current = row.lock();

        // A delete may have won the race between the lookup and the lock.
        let still_present = self
            .rows
            .read()
            .get(&id)
            .is_some_and(|live| Arc::ptr_eq(live, &row));
        if !still_present {
            return Ok(None);
        }

        let mut draft = current.clone();
        let out = apply(&mut draft)?;
        *current = draft;
        Ok(Some(out))
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.rows.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_core::KitchenStatus;
    use std::thread;

    fn order() -> KitchenOrder {
        KitchenOrder::accept(Uuid::new_v4(), "[]".to_string())
    }

    #[test]
    fn update_commits_only_on_success() {
        let store = InMemoryKitchenOrderStore::new();
        let stored = store.insert(order()).unwrap();

        let res: Result<Option<()>, StoreError> = store.update(stored.id, |o| {
            o.status = KitchenStatus::Ready;
            Err(StoreError::Unavailable("boom".into()))
        });
        assert!(res.is_err());
        assert_eq!(
            store.find(stored.id).unwrap().unwrap().status,
            KitchenStatus::Preparing
        );

        let res: Result<_, StoreError> = store.update(stored.id, |o| {
            o.status = KitchenStatus::Ready;
            Ok(o.status)
        });
        assert_eq!(res.unwrap(), Some(KitchenStatus::Ready));
        assert_eq!(
            store.find(stored.id).unwrap().unwrap().status,
            KitchenStatus::Ready
        );
    }

    #[test]
    fn update_on_missing_row_is_none() {
        let store = InMemoryKitchenOrderStore::new();
        let res: Result<Option<()>, StoreError> = store.update(Uuid::new_v4(), |_| Ok(()));
        assert!(res.unwrap().is_none());
    }

    #[test]
    fn find_by_source_order_filters_and_orders() {
        let store = InMemoryKitchenOrderStore::new();
        let source = Uuid::new_v4();
        let first = store
            .insert(KitchenOrder::accept(source, "a".into()))
            .unwrap();
        let mut second = KitchenOrder::accept(source, "b".into());
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        store.insert(second.clone()).unwrap();
        store.insert(order()).unwrap();

        let found = store.find_by_source_order(source).unwrap();
        assert_eq!(
            found.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[test]
    fn delete_reports_existence() {
        let store = InMemoryKitchenOrderStore::new();
        let stored = store.insert(order()).unwrap();
        assert!(store.delete(stored.id).unwrap());
        assert!(!store.delete(stored.id).unwrap());
        assert!(store.find(stored.id).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_updates_on_one_row_are_serialized() {
        let store = Arc::new(InMemoryKitchenOrderStore::new());
        let stored = store.insert(order()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _: Result<_, StoreError> = store.update(stored.id, |o| {
                            o.items_payload.push('x');
                            Ok(())
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let row = store.find(stored.id).unwrap().unwrap();
        assert_eq!(row.items_payload.len(), "[]".len() + 800);
    }
}
