//! In-memory storage handles.
//!
//! Handles are cheap to clone and are injected into request handlers; there is
//! no process-wide storage.

use std::sync::{Arc, RwLock};

use crate::error::{DomainError, DomainResult};
use crate::model::{Customer, Order};

/// Shared, mutable list of customers.
#[derive(Debug, Clone, Default)]
pub struct CustomerStore {
    inner: Arc<RwLock<Vec<Customer>>>,
}

impl CustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> DomainResult<Vec<Customer>> {
        let guard = self.inner.read().map_err(|_| DomainError::Unavailable)?;
        Ok(guard.clone())
    }

    pub fn get(&self, id: i64) -> DomainResult<Customer> {
        let guard = self.inner.read().map_err(|_| DomainError::Unavailable)?;
        guard
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    /// Append a customer. Identifiers must be unique within the store.
    pub fn add(&self, customer: Customer) -> DomainResult<()> {
        let mut guard = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        if guard.iter().any(|c| c.id == customer.id) {
            return Err(DomainError::conflict(format!(
                "customer {} already exists",
                customer.id
            )));
        }
        tracing::debug!(customer_id = customer.id, "customer stored");
        guard.push(customer);
        Ok(())
    }

    /// Remove a customer by id. Returns `false` when nothing matched.
    pub fn remove(&self, id: i64) -> DomainResult<bool> {
        let mut guard = self.inner.write().map_err(|_| DomainError::Unavailable)?;
        let before = guard.len();
        guard.retain(|c| c.id != id);
        Ok(guard.len() != before)
    }
}

/// Immutable snapshot of orders, fixed at startup.
#[derive(Debug, Clone)]
pub struct OrderStore {
    orders: Arc<[Order]>,
}

impl OrderStore {
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders: orders.into(),
        }
    }

    pub fn list(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, number: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.number == number)
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new(crate::model::sample_orders())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_get_remove_customer() {
        let store = CustomerStore::new();
        store.add(Customer::new(1, "Jane", "Smith")).unwrap();

        assert_eq!(store.get(1).unwrap().first_name, "Jane");
        assert!(store.remove(1).unwrap());
        assert!(!store.remove(1).unwrap());
        assert_eq!(store.get(1), Err(DomainError::NotFound));
    }

    #[test]
    fn duplicate_customer_id_is_a_conflict() {
        let store = CustomerStore::new();
        store.add(Customer::new(1, "Jane", "Smith")).unwrap();

        let err = store.add(Customer::new(1, "John", "Doe")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn clones_share_the_same_list() {
        let store = CustomerStore::new();
        let handle = store.clone();
        handle.add(Customer::new(2, "Ada", "Lovelace")).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_adds_are_all_kept() {
        let store = CustomerStore::new();
        let threads = (1..=8)
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || store.add(Customer::new(id, "A", "B")).unwrap())
            })
            .collect::<Vec<_>>();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(store.list().unwrap().len(), 8);
    }

    #[test]
    fn order_lookup_by_number() {
        let store = OrderStore::default();

        assert_eq!(store.list().len(), 2);
        assert!(store.get("2020-04-06-01").is_some());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let store = CustomerStore::new();
        store.add(Customer::new(1, "Jane", "Smith")).unwrap();

        let handle = store.clone();
        let writer = std::thread::spawn(move || {
            let _guard = handle.inner.write().unwrap();
            panic!("writer died holding the lock");
        });
        assert!(writer.join().is_err());

        assert_eq!(store.list(), Err(DomainError::Unavailable));
        assert_eq!(store.get(1), Err(DomainError::Unavailable));
        assert_eq!(store.add(Customer::new(2, "Ada", "Lovelace")), Err(DomainError::Unavailable));
        assert_eq!(store.remove(1), Err(DomainError::Unavailable));
    }
}
