use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    unknown_import_batch, unknown_product, ImportBatchRepository, ProductRepository,
    PurchaseRepository, SaleRepository, UserRepository,
};
use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{
        ImportBatch, ImportStatus, NewProduct, NewPurchase, NewSale, NewUser, Product, Purchase,
        Sale, User,
    },
    services::stock,
};

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    purchases: Vec<Purchase>,
    sales: Vec<Sale>,
    import_batches: Vec<ImportBatch>,
    users: Vec<User>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn has_product(&self, id: i64) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    fn purchased(&self, product_id: i64) -> i64 {
        self.purchases
            .iter()
            .filter(|p| p.product_id == product_id)
            .map(|p| i64::from(p.quantity))
            .sum()
    }

    fn sold(&self, product_id: i64) -> i64 {
        self.sales
            .iter()
            .filter(|s| s.product_id == product_id)
            .map(|s| i64::from(s.quantity))
            .sum()
    }

    fn insert_sale(&mut self, sale: NewSale) -> AppResult<Sale> {
        if !self.has_product(sale.product_id) {
            return Err(unknown_product(sale.product_id));
        }
        if let Some(batch_id) = sale.import_batch_id {
            if !self.import_batches.iter().any(|b| b.id == batch_id) {
                return Err(unknown_import_batch(batch_id));
            }
        }
        let sale = Sale {
            id: self.next_id(),
            product_id: sale.product_id,
            quantity: sale.quantity,
            sales_date: sale.sales_date,
            import_batch_id: sale.import_batch_id,
        };
        self.sales.push(sale.clone());
        Ok(sale)
    }
}

/// Process-local store with the same observable behaviour as `PgStore`:
/// foreign keys are checked, product deletes cascade, and checked sales
/// run under a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // No invariant spans a panic point, so a poisoned lock is still usable.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Product>> {
        Ok(self.tables().products.clone())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Product>> {
        Ok(self.tables().products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        let mut tables = self.tables();
        let product = Product {
            id: tables.next_id(),
            name: product.name,
            price: product.price,
            description: product.description,
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, product: NewProduct) -> AppResult<Option<Product>> {
        let mut tables = self.tables();
        Ok(tables.products.iter_mut().find(|p| p.id == id).map(|existing| {
            existing.name = product.name;
            existing.price = product.price;
            existing.description = product.description;
            existing.clone()
        }))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables();
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Ok(false);
        }
        tables.purchases.retain(|p| p.product_id != id);
        tables.sales.retain(|s| s.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl PurchaseRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Purchase>> {
        Ok(self.tables().purchases.clone())
    }

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Purchase>> {
        Ok(self
            .tables()
            .purchases
            .iter()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64> {
        Ok(self.tables().purchased(product_id))
    }

    async fn insert(&self, purchase: NewPurchase) -> AppResult<Purchase> {
        let mut tables = self.tables();
        if !tables.has_product(purchase.product_id) {
            return Err(unknown_product(purchase.product_id));
        }
        let purchase = Purchase {
            id: tables.next_id(),
            product_id: purchase.product_id,
            quantity: purchase.quantity,
            purchase_date: purchase.purchase_date,
        };
        tables.purchases.push(purchase.clone());
        Ok(purchase)
    }
}

#[async_trait]
impl SaleRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Sale>> {
        Ok(self.tables().sales.clone())
    }

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Sale>> {
        Ok(self
            .tables()
            .sales
            .iter()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_by_batch(&self, batch_id: i64) -> AppResult<Vec<Sale>> {
        Ok(self
            .tables()
            .sales
            .iter()
            .filter(|s| s.import_batch_id == Some(batch_id))
            .cloned()
            .collect())
    }

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64> {
        Ok(self.tables().sold(product_id))
    }

    async fn insert(&self, sale: NewSale) -> AppResult<Sale> {
        self.tables().insert_sale(sale)
    }

    async fn record_checked(&self, sale: NewSale) -> AppResult<Sale> {
        let mut tables = self.tables();
        if !tables.has_product(sale.product_id) {
            return Err(unknown_product(sale.product_id));
        }
        stock::ensure_available(
            sale.product_id,
            tables.purchased(sale.product_id),
            tables.sold(sale.product_id),
            i64::from(sale.quantity),
        )?;
        tables.insert_sale(sale)
    }
}

#[async_trait]
impl ImportBatchRepository for MemoryStore {
    async fn insert(&self, file_name: &str, status: ImportStatus) -> AppResult<ImportBatch> {
        let mut tables = self.tables();
        let batch = ImportBatch {
            id: tables.next_id(),
            file_name: file_name.to_string(),
            status,
            created_at: Utc::now(),
        };
        tables.import_batches.push(batch.clone());
        Ok(batch)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImportBatch>> {
        Ok(self
            .tables()
            .import_batches
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn set_status(&self, id: i64, status: ImportStatus) -> AppResult<()> {
        let mut tables = self.tables();
        let batch = tables
            .import_batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(AppError::NotFound {
                entity: "import batch",
                id,
            })?;
        batch.status = status;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )
            .into());
        }
        let user = User {
            id: tables.next_id(),
            username: user.username,
            password_hash: user.password_hash,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}
