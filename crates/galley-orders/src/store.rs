//! Order persistence seam.
//!
//! Same shape as the kitchen's store: writes go through a per-row
//! read-modify-write so the readiness callback and an operator request on the
//! same order never interleave.

use crate::{error::StoreError, model::Order};
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

pub trait OrderStore: Send + Sync + 'static {
    fn insert(&self, order: Order) -> Result<Order, StoreError>;

    fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    fn find_by_kitchen_order_id(&self, kitchen_order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Applies `apply` to a draft of row `id` and commits the draft only if
    /// `apply` succeeds. `Ok(None)` when the row does not exist.
    fn update<T, E, F>(&self, id: Uuid, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Order) -> Result<T, E>,
        E: From<StoreError>;
}

type Row = Arc<Mutex<Order>>;

#[derive(Default)]
pub struct InMemoryOrderStore {
    rows: RwLock<HashMap<Uuid, Row>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> Result<Order, StoreError> {
        self.rows
            .write()
            .insert(order.id, Arc::new(Mutex::new(order.clone())));
        Ok(order)
    }

    fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = self.rows.read().get(&id).cloned();
        Ok(row.map(|row| row.lock().clone()))
    }

    fn find_by_kitchen_order_id(&self, kitchen_order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let rows: Vec<Row> = self.rows.read().values().cloned().collect();
        Ok(rows
            .iter()
            .map(|row| row.lock().clone())
            .find(|order| order.kitchen_order_id == Some(kitchen_order_id)))
    }

    fn update<T, E, F>(&self, id: Uuid, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut Order) -> Result<T, E>,
        E: From<StoreError>,
    {
        let Some(row) = self.rows.read().get(&id).cloned() else {
            return Ok(None);
        };
        let mut current = row.lock();
        let mut draft = current.clone();
        let out = apply(&mut draft)?;
        *current = draft;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderItem, OrderStatus};

    #[test]
    fn lookup_by_kitchen_order_id() {
        let store = InMemoryOrderStore::new();
        let mut order = Order::new(None, None, vec![OrderItem::new("soup", 1, true)]);
        let kitchen_order_id = Uuid::new_v4();
        order.kitchen_order_id = Some(kitchen_order_id);
        store.insert(order.clone()).unwrap();
        store.insert(Order::new(None, None, vec![])).unwrap();

        assert_eq!(
            store.find_by_kitchen_order_id(kitchen_order_id).unwrap(),
            Some(order)
        );
        assert_eq!(store.find_by_kitchen_order_id(Uuid::new_v4()).unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let store = InMemoryOrderStore::new();
        let order = store.insert(Order::new(None, None, vec![])).unwrap();

        let res: Result<Option<()>, StoreError> = store.update(order.id, |o| {
            o.set_status(OrderStatus::Paid);
            Err(StoreError::Unavailable("nope".into()))
        });
        assert!(res.is_err());
        assert_eq!(store.find(order.id).unwrap().unwrap().status, OrderStatus::New);

        let res: Result<_, StoreError> = store.update(order.id, |o| {
            o.set_status(OrderStatus::Paid);
            Ok(o.status)
        });
        assert_eq!(res.unwrap(), Some(OrderStatus::Paid));
    }
}
