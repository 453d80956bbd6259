//! # Discount Repository
//!
//! Discounts and the products they are limited to.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use satchmo_core::discount::Discount;
use satchmo_core::Money;

const DISCOUNT_COLUMNS: &str = r#"
    id, code, description, amount_cents, percentage, automatic,
    allowed_uses, num_uses, min_order_cents, start_date, end_date,
    active, free_shipping, include_shipping
"#;

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: String,
    code: String,
    description: String,
    amount_cents: Option<i64>,
    percentage: Option<String>,
    automatic: bool,
    allowed_uses: Option<i64>,
    num_uses: i64,
    min_order_cents: Option<i64>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    active: bool,
    free_shipping: bool,
    include_shipping: bool,
}

impl DiscountRow {
    fn into_discount(self, valid_products: BTreeSet<String>) -> DbResult<Discount> {
        let percentage = self
            .percentage
            .as_deref()
            .map(Decimal::from_str)
            .transpose()
            .map_err(|e| DbError::corrupt("discount", &self.id, e))?;

        let mut discount =
            Discount::new(self.code, self.description, self.start_date, self.end_date);
        discount.id = self.id;
        discount.amount = self.amount_cents.map(Money::from_cents);
        discount.percentage = percentage;
        discount.automatic = self.automatic;
        discount.allowed_uses = self.allowed_uses;
        discount.num_uses = self.num_uses;
        discount.min_order = self.min_order_cents.map(Money::from_cents);
        discount.active = self.active;
        discount.free_shipping = self.free_shipping;
        discount.include_shipping = self.include_shipping;
        discount.valid_products = valid_products;
        Ok(discount)
    }
}

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Validates and inserts a discount with its valid-product set.
    ///
    /// ## Errors
    /// * `DbError::Validation` - the definition breaks a rule
    /// * `DbError::UniqueViolation` - the code is taken
    pub async fn insert(&self, discount: &Discount) -> DbResult<()> {
        discount.validate()?;

        if self.get_by_code(&discount.code).await?.is_some() {
            return Err(DbError::duplicate("code", &discount.code));
        }

        debug!(id = %discount.id, code = %discount.code, "Inserting discount");
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, description, amount_cents, percentage, automatic,
                allowed_uses, num_uses, min_order_cents, start_date, end_date,
                active, free_shipping, include_shipping, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?15
            )
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(&discount.description)
        .bind(discount.amount.map(|m| m.cents()))
        .bind(discount.percentage.map(|p| p.to_string()))
        .bind(discount.automatic)
        .bind(discount.allowed_uses)
        .bind(discount.num_uses)
        .bind(discount.min_order.map(|m| m.cents()))
        .bind(discount.start_date)
        .bind(discount.end_date)
        .bind(discount.active)
        .bind(discount.free_shipping)
        .bind(discount.include_shipping)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for product_id in &discount.valid_products {
            sqlx::query(
                "INSERT INTO discount_valid_products (discount_id, product_id) VALUES (?1, ?2)",
            )
            .bind(&discount.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(code = %discount.code, "Discount created");
        Ok(())
    }

    /// Gets a discount by code, active or not.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let sql = format!("SELECT {} FROM discounts WHERE code = ?1", DISCOUNT_COLUMNS);
        let row: Option<DiscountRow> = sqlx::query_as(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let products = self.valid_products(&row.id).await?;
                Ok(Some(row.into_discount(products)?))
            }
            None => Ok(None),
        }
    }

    /// Gets an active discount by code.
    pub async fn find_active_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        Ok(self.get_by_code(code).await?.filter(|d| d.active))
    }

    /// Active automatic discounts.
    pub async fn list_automatic(&self) -> DbResult<Vec<Discount>> {
        let sql = format!(
            "SELECT {} FROM discounts WHERE automatic = 1 AND active = 1 ORDER BY code",
            DISCOUNT_COLUMNS
        );
        let rows: Vec<DiscountRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        let mut discounts = Vec::with_capacity(rows.len());
        for row in rows {
            let products = self.valid_products(&row.id).await?;
            discounts.push(row.into_discount(products)?);
        }
        Ok(discounts)
    }

    async fn valid_products(&self, discount_id: &str) -> DbResult<BTreeSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM discount_valid_products WHERE discount_id = ?1",
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    /// Counts one use of the discount.
    pub async fn record_use(&self, code: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE discounts SET num_uses = num_uses + 1, updated_at = ?2 WHERE code = ?1",
        )
        .bind(code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", code));
        }

        debug!(code = %code, "Discount use recorded");
        Ok(())
    }

    /// Enables or disables a discount.
    pub async fn set_active(&self, code: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE discounts SET active = ?2, updated_at = ?3 WHERE code = ?1",
        )
        .bind(code)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", code));
        }

        info!(code = %code, active, "Discount active flag changed");
        Ok(())
    }

    /// Number of discounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn coupon(code: &str) -> Discount {
        Discount::new(code, "Test coupon", date(2024, 1, 1), date(2024, 12, 31))
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_round_trip() {
        let db = setup().await;
        let repo = db.discounts();

        let discount = coupon("SPRING")
            .with_percentage(Decimal::new(125, 1))
            .with_min_order(Money::from_cents(2000))
            .with_allowed_uses(10)
            .with_free_shipping()
            .with_valid_products(["p-1", "p-2"]);
        repo.insert(&discount).await.unwrap();

        let loaded = repo.get_by_code("SPRING").await.unwrap().unwrap();
        assert_eq!(loaded.id, discount.id);
        assert_eq!(loaded.percentage, Some(Decimal::new(125, 1)));
        assert_eq!(loaded.amount, None);
        assert_eq!(loaded.min_order, Some(Money::from_cents(2000)));
        assert_eq!(loaded.allowed_uses, Some(10));
        assert!(loaded.free_shipping);
        assert_eq!(loaded.valid_products.len(), 2);
        assert_eq!(loaded.start_date, date(2024, 1, 1));
        assert!(!loaded.is_calculated());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = setup().await;
        let repo = db.discounts();

        repo.insert(&coupon("ONCE").with_amount(Money::from_cents(500)))
            .await
            .unwrap();
        let result = repo
            .insert(&coupon("ONCE").with_amount(Money::from_cents(700)))
            .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_definition_rejected() {
        let db = setup().await;
        let result = db
            .discounts()
            .insert(
                &coupon("BOTH")
                    .with_amount(Money::from_cents(500))
                    .with_percentage(Decimal::from(10)),
            )
            .await;

        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_active_lookup_and_usage() {
        let db = setup().await;
        let repo = db.discounts();
        repo.insert(&coupon("FLAT").with_amount(Money::from_cents(500)))
            .await
            .unwrap();

        repo.record_use("FLAT").await.unwrap();
        repo.record_use("FLAT").await.unwrap();
        assert_eq!(repo.get_by_code("FLAT").await.unwrap().unwrap().num_uses, 2);

        repo.set_active("FLAT", false).await.unwrap();
        assert!(repo.find_active_by_code("FLAT").await.unwrap().is_none());
        assert!(repo.get_by_code("FLAT").await.unwrap().is_some());

        assert!(matches!(
            repo.record_use("MISSING").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_automatic() {
        let db = setup().await;
        let repo = db.discounts();
        repo.insert(&coupon("AUTO").automatic().with_percentage(Decimal::from(5)))
            .await
            .unwrap();
        repo.insert(&coupon("MANUAL").with_percentage(Decimal::from(50)))
            .await
            .unwrap();
        repo.insert(
            &coupon("AUTOOFF")
                .automatic()
                .with_percentage(Decimal::from(90))
                .inactive(),
        )
        .await
        .unwrap();

        let autos = repo.list_automatic().await.unwrap();
        assert_eq!(autos.len(), 1);
        assert_eq!(autos[0].code, "AUTO");
    }
}
