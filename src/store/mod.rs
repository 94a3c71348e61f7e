//! Repository interfaces, one per entity.
//!
//! Handlers and services talk to `Repositories`, never to a concrete
//! backend. `PgStore` is the production backend; `MemoryStore` keeps the
//! same semantics in process and backs the test suite.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        ImportBatch, ImportStatus, NewProduct, NewPurchase, NewSale, NewUser, Product, Purchase,
        Sale, User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Product>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Product>>;

    async fn insert(&self, product: NewProduct) -> AppResult<Product>;

    /// Returns `None` when no product has this id.
    async fn update(&self, id: i64, product: NewProduct) -> AppResult<Option<Product>>;

    /// Deletes the product and, by cascade, its purchases and sales.
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Purchase>>;

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Purchase>>;

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64>;

    /// Fails validation on `product` when the product does not exist.
    async fn insert(&self, purchase: NewPurchase) -> AppResult<Purchase>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Sale>>;

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Sale>>;

    async fn list_by_batch(&self, batch_id: i64) -> AppResult<Vec<Sale>>;

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64>;

    /// Inserts without any stock check. Used by bulk import.
    async fn insert(&self, sale: NewSale) -> AppResult<Sale>;

    /// Checks available stock and inserts atomically: concurrent calls for
    /// the same product are serialized, so stock can never go negative.
    async fn record_checked(&self, sale: NewSale) -> AppResult<Sale>;
}

#[async_trait]
pub trait ImportBatchRepository: Send + Sync {
    async fn insert(&self, file_name: &str, status: ImportStatus) -> AppResult<ImportBatch>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImportBatch>>;

    async fn set_status(&self, id: i64, status: ImportStatus) -> AppResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn insert(&self, user: NewUser) -> AppResult<User>;
}

/// The full set of repositories shared through application state.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub sales: Arc<dyn SaleRepository>,
    pub import_batches: Arc<dyn ImportBatchRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProductRepository
            + PurchaseRepository
            + SaleRepository
            + ImportBatchRepository
            + UserRepository
            + 'static,
    {
        Self {
            products: store.clone(),
            purchases: store.clone(),
            sales: store.clone(),
            import_batches: store.clone(),
            users: store,
        }
    }

    pub fn postgres(pool: crate::database::Database) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }
}

fn invalid_reference(field: &str, id: i64) -> crate::error::AppError {
    crate::error::FieldErrors::single(
        field,
        format!("Invalid pk \"{id}\" - object does not exist."),
    )
    .into()
}

/// The error both backends report when a row references a missing product.
pub(crate) fn unknown_product(product_id: i64) -> crate::error::AppError {
    invalid_reference("product", product_id)
}

pub(crate) fn unknown_import_batch(batch_id: i64) -> crate::error::AppError {
    invalid_reference("import_batch", batch_id)
}
