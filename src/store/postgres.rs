use async_trait::async_trait;
use sqlx::PgExecutor;

use super::{
    unknown_import_batch, unknown_product, ImportBatchRepository, ProductRepository,
    PurchaseRepository, SaleRepository, UserRepository,
};
use crate::{
    database::Database,
    error::{AppError, AppResult, FieldErrors},
    models::{
        ImportBatch, ImportStatus, NewProduct, NewPurchase, NewSale, NewUser, Product, Purchase,
        Sale, User,
    },
    services::stock,
};

const SALE_COLUMNS: &str = "id, product_id, quantity, sales_date, import_batch_id";
const SALE_BATCH_FK: &str = "sales_import_batch_id_fkey";

pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => db.constraint(),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn sum_purchased<'e, E>(executor: E, product_id: i64) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM purchases WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await
}

async fn sum_sold<'e, E>(executor: E, product_id: i64) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM sales WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await
}

async fn insert_sale<'e, E>(executor: E, sale: &NewSale) -> AppResult<Sale>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Sale>(&format!(
        "INSERT INTO sales (product_id, quantity, sales_date, import_batch_id) \
         VALUES ($1, $2, $3, $4) RETURNING {SALE_COLUMNS}"
    ))
    .bind(sale.product_id)
    .bind(sale.quantity)
    .bind(sale.sales_date)
    .bind(sale.import_batch_id)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        let batch_missing = violated_constraint(&e) == Some(SALE_BATCH_FK);
        match sale.import_batch_id {
            Some(batch_id) if batch_missing => unknown_import_batch(batch_id),
            _ if is_foreign_key_violation(&e) => unknown_product(sale.product_id),
            _ => e.into(),
        }
    })
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, description FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, description FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, description
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update(&self, id: i64, product: NewProduct) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET name = $1, price = $2, description = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, price, description
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PurchaseRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT id, product_id, quantity, purchase_date FROM purchases ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT id, product_id, quantity, purchase_date FROM purchases \
             WHERE product_id = $1 ORDER BY purchase_date, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64> {
        Ok(sum_purchased(&self.pool, product_id).await?)
    }

    async fn insert(&self, purchase: NewPurchase) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (product_id, quantity, purchase_date)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, quantity, purchase_date
            "#,
        )
        .bind(purchase.product_id)
        .bind(purchase.quantity)
        .bind(purchase.purchase_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                unknown_product(purchase.product_id)
            } else {
                e.into()
            }
        })
    }
}

#[async_trait]
impl SaleRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    async fn list_by_product(&self, product_id: i64) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE product_id = $1 ORDER BY sales_date, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    async fn list_by_batch(&self, batch_id: i64) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE import_batch_id = $1 ORDER BY id"
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    async fn sum_quantity_by_product(&self, product_id: i64) -> AppResult<i64> {
        Ok(sum_sold(&self.pool, product_id).await?)
    }

    async fn insert(&self, sale: NewSale) -> AppResult<Sale> {
        insert_sale(&self.pool, &sale).await
    }

    async fn record_checked(&self, sale: NewSale) -> AppResult<Sale> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent sales of the same product.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(sale.product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(unknown_product(sale.product_id));
        }

        let purchased = sum_purchased(&mut *tx, sale.product_id).await?;
        let sold = sum_sold(&mut *tx, sale.product_id).await?;
        stock::ensure_available(sale.product_id, purchased, sold, i64::from(sale.quantity))?;

        let sale = insert_sale(&mut *tx, &sale).await?;
        tx.commit().await?;
        Ok(sale)
    }
}

#[async_trait]
impl ImportBatchRepository for PgStore {
    async fn insert(&self, file_name: &str, status: ImportStatus) -> AppResult<ImportBatch> {
        let batch = sqlx::query_as::<_, ImportBatch>(
            r#"
            INSERT INTO import_batches (file_name, status)
            VALUES ($1, $2)
            RETURNING id, file_name, status, created_at
            "#,
        )
        .bind(file_name)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImportBatch>> {
        let batch = sqlx::query_as::<_, ImportBatch>(
            "SELECT id, file_name, status, created_at FROM import_batches WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn set_status(&self, id: i64, status: ImportStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE import_batches SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound {
                entity: "import batch",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_active, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, is_active, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::from(FieldErrors::single(
                    "username",
                    "A user with that username already exists.",
                ))
            } else {
                e.into()
            }
        })
    }
}
