//! In-process fakes shared by unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use kubti_core::{
    CartItemId, DeliveryAddress, DirectOrderRequest, LocalCartItem, LocalItemId, Order, OrderId,
    OrderStatus, ProductId, ProductRef, Quantity, ServerCartItem, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, Semaphore};

use crate::remote::{CartRemote, Confirmation, RemoteError};
use crate::store::{KeyValueStore, MemoryStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Add,
    Update,
    Remove,
    Clear,
    Order,
    DirectOrder,
}

#[derive(Default)]
struct State {
    items: Vec<ServerCartItem>,
    calls: Vec<Call>,
    failures: VecDeque<(Call, u16, String)>,
    unauthorized: bool,
    unavailable: bool,
    update_order: Vec<(CartItemId, u32)>,
    direct_orders: Vec<DirectOrderRequest>,
    orders: Vec<DeliveryAddress>,
}

/// Backend cart kept in memory.
///
/// Failures are queued per call kind and consumed in order. When built
/// with [`FakeRemote::gated`], update and remove calls wait for a permit
/// from [`FakeRemote::release`] before answering.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn with_items(items: Vec<ServerCartItem>) -> Self {
        Self {
            state: Mutex::new(State {
                items,
                ..State::default()
            }),
            ..Self::default()
        }
    }

    pub fn gated(items: Vec<ServerCartItem>) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::with_items(items)
        }
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub async fn fail_next(&self, call: Call, status: u16, detail: &str) {
        self.state
            .lock()
            .await
            .failures
            .push_back((call, status, detail.to_string()));
    }

    pub async fn set_unauthorized(&self) {
        self.state.lock().await.unauthorized = true;
    }

    /// Fail every call with a 503 from now on.
    pub async fn set_unavailable(&self) {
        self.state.lock().await.unavailable = true;
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count(&self, call: Call) -> usize {
        self.calls().await.iter().filter(|c| **c == call).count()
    }

    pub async fn items(&self) -> Vec<ServerCartItem> {
        self.state.lock().await.items.clone()
    }

    pub async fn update_order(&self) -> Vec<(CartItemId, u32)> {
        self.state.lock().await.update_order.clone()
    }

    pub async fn direct_orders(&self) -> Vec<DirectOrderRequest> {
        self.state.lock().await.direct_orders.clone()
    }

    pub async fn orders(&self) -> Vec<DeliveryAddress> {
        self.state.lock().await.orders.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, call: Call) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        if state.unauthorized {
            return Err(RemoteError::Unauthorized("Not authenticated".to_string()));
        }
        if state.unavailable {
            return Err(RemoteError::Api {
                status: 503,
                detail: "Service unavailable".to_string(),
            });
        }
        if let Some(index) = state.failures.iter().position(|(c, _, _)| *c == call) {
            let (_, status, detail) = state.failures.remove(index).unwrap();
            return Err(RemoteError::Api { status, detail });
        }
        Ok(())
    }

    async fn hold(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartRemote for FakeRemote {
    async fn fetch_cart(&self) -> Result<Vec<ServerCartItem>, RemoteError> {
        self.begin(Call::Fetch).await?;
        Ok(self.items().await)
    }

    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
        selected_size: Option<&str>,
    ) -> Result<ServerCartItem, RemoteError> {
        self.begin(Call::Add).await?;
        let mut state = self.state.lock().await;
        if let Some(line) = state
            .items
            .iter_mut()
            .find(|i| i.product.id == product_id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(line.clone());
        }
        let id = i64::try_from(state.items.len()).unwrap() + 100;
        let mut line = server_item(id, product_id.as_i64(), "Added", 50, quantity.get());
        line.selected_size = selected_size.map(String::from);
        state.items.push(line.clone());
        Ok(line)
    }

    async fn update_quantity(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<ServerCartItem, RemoteError> {
        self.state
            .lock()
            .await
            .update_order
            .push((id, quantity.get()));
        self.hold().await;
        self.begin(Call::Update).await?;
        let mut state = self.state.lock().await;
        let line = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RemoteError::Api {
                status: 404,
                detail: "Cart item not found".to_string(),
            })?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn remove_item(&self, id: CartItemId) -> Result<Confirmation, RemoteError> {
        self.hold().await;
        self.begin(Call::Remove).await?;
        self.state.lock().await.items.retain(|i| i.id != id);
        Ok(Confirmation {
            message: Some("Item removed from cart".to_string()),
        })
    }

    async fn clear_cart(&self) -> Result<Confirmation, RemoteError> {
        self.begin(Call::Clear).await?;
        self.state.lock().await.items.clear();
        Ok(Confirmation::default())
    }

    async fn place_order(&self, address: &DeliveryAddress) -> Result<Order, RemoteError> {
        self.begin(Call::Order).await?;
        self.state.lock().await.orders.push(address.clone());
        Ok(order(1))
    }

    async fn place_direct_order(&self, request: &DirectOrderRequest) -> Result<Order, RemoteError> {
        self.begin(Call::DirectOrder).await?;
        self.state.lock().await.direct_orders.push(request.clone());
        Ok(order(2))
    }
}

/// Memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn with_entries(entries: Vec<(&str, String)>) -> Self {
        Self {
            inner: MemoryStore::with_entries(entries),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.remove(key).await
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn server_item(id: i64, product_id: i64, name: &str, price: i64, quantity: u32) -> ServerCartItem {
    ServerCartItem {
        id: CartItemId::new(id),
        product_id: Some(ProductId::new(product_id)),
        quantity: Quantity::new(quantity).unwrap(),
        selected_size: None,
        product: ProductRef {
            id: ProductId::new(product_id),
            name: name.to_string(),
            price: Decimal::from(price),
            original_price: None,
            discount_percent: None,
            image_path: None,
            size: None,
            stock: None,
        },
        subtotal: None,
    }
}

pub fn local_item(id: &str, price: i64, quantity: u32) -> LocalCartItem {
    LocalCartItem {
        id: LocalItemId::parse(id).unwrap(),
        name: id.to_string(),
        price: Decimal::from(price),
        original_price: None,
        discount_percent: None,
        image_path: None,
        quantity: Quantity::new(quantity).unwrap(),
        selected_size: None,
        custom_request: None,
        is_hardcoded: true,
    }
}

pub fn address() -> DeliveryAddress {
    DeliveryAddress {
        delivery_address: "12 Lake Road".to_string(),
        delivery_city: "Pune".to_string(),
        delivery_state: "Maharashtra".to_string(),
        delivery_pincode: "411001".to_string(),
        delivery_phone: "9876543210".to_string(),
    }
}

fn order(id: i64) -> Order {
    Order {
        id: OrderId::new(id),
        user_id: UserId::new(7),
        order_number: Some(format!("ORD-{id:04}")),
        total_amount: Decimal::from(100),
        original_amount: Decimal::from(100),
        discount_amount: Decimal::ZERO,
        status: OrderStatus::Pending,
        delivery_address: "12 Lake Road".to_string(),
        points_earned: 0,
        created_at: None,
        order_items: Vec::new(),
    }
}
