//! Platform read model backed by SQLite.
//!
//! Holds the slice of the store platform the sync engine reads: customers,
//! their addresses, placed orders, the region directory and newsletter
//! subscribers. Customer rows are returned fully joined with the default
//! billing address and order aggregates.

use crate::error::StorageResult;
use crate::{id_placeholders, lock, open_sqlite, SharedConnection, MAX_BOUND_IDS};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use storesync_types::{CustomerRow, Scalar};
use tracing::debug;

/// A customer account as written into the catalog.
#[derive(Clone, Debug, Default)]
pub struct CustomerEntity {
    pub id: i64,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub store_id: u32,
    /// Store view the customer was assigned to for e-commerce sync, if any.
    pub mailchimp_store_view: Option<u32>,
}

/// A customer address.
#[derive(Clone, Debug, Default)]
pub struct AddressEntity {
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub region_id: Option<i64>,
    pub postcode: Option<String>,
    pub country_id: Option<String>,
    pub company: Option<String>,
}

#[derive(Clone)]
pub struct SqliteCatalog {
    conn: SharedConnection,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_sqlite(path)?;
        initialize_catalog_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_catalog_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ── Writes ──

    pub fn upsert_customer(&self, customer: &CustomerEntity) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO customers (entity_id, email, firstname, lastname, store_id, mailchimp_store_view)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (entity_id) DO UPDATE SET
                email = excluded.email,
                firstname = excluded.firstname,
                lastname = excluded.lastname,
                store_id = excluded.store_id,
                mailchimp_store_view = excluded.mailchimp_store_view
            "#,
            params![
                customer.id,
                customer.email,
                customer.firstname,
                customer.lastname,
                customer.store_id,
                customer.mailchimp_store_view,
            ],
        )?;
        Ok(())
    }

    /// Adds an address for a customer and returns its id.
    pub fn add_address(
        &self,
        customer_id: i64,
        address: &AddressEntity,
        default_billing: bool,
    ) -> StorageResult<i64> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO customer_addresses (
                customer_id, street, city, region, region_id, postcode, country_id, company
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                customer_id,
                address.street,
                address.city,
                address.region,
                address.region_id,
                address.postcode,
                address.country_id,
                address.company,
            ],
        )?;
        let address_id = tx.last_insert_rowid();
        if default_billing {
            tx.execute(
                "UPDATE customers SET default_billing = ?1 WHERE entity_id = ?2",
                params![address_id, customer_id],
            )?;
        }
        tx.commit()?;
        Ok(address_id)
    }

    /// Records a placed order. `customer_id` is `None` for guest orders.
    pub fn add_order(&self, customer_id: Option<i64>, grand_total: f64) -> StorageResult<i64> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO sales_orders (customer_id, grand_total) VALUES (?1, ?2)",
            params![customer_id, grand_total],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_region(
        &self,
        region_id: i64,
        country_id: &str,
        code: Option<&str>,
        name: &str,
    ) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO directory_regions (region_id, country_id, code, default_name) \
             VALUES (?1, ?2, ?3, ?4)",
            params![region_id, country_id, code, name],
        )?;
        Ok(())
    }

    // ── Reads ──

    /// Up to `limit` customer ids belonging to a store view, ascending, all
    /// greater than `after` when given. Callers page through a store view by
    /// passing the last id of the previous page.
    pub fn customer_ids_in_store(
        &self,
        store_id: u32,
        after: Option<i64>,
        limit: usize,
    ) -> StorageResult<Vec<i64>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT entity_id FROM customers \
             WHERE (store_id = ?1 OR mailchimp_store_view = ?1) AND entity_id > ?2 \
             ORDER BY entity_id LIMIT ?3",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let ids = stmt
            .query_map(params![store_id, after.unwrap_or(i64::MIN), limit], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Loads customers joined with their default billing address and order
    /// aggregates. One row per customer; unknown ids are skipped. Ids are
    /// queried in chunks of at most `MAX_BOUND_IDS`.
    pub fn load_customers(&self, ids: &[i64]) -> StorageResult<Vec<CustomerRow>> {
        let conn = lock(&self.conn)?;
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            rows.extend(load_customer_chunk(&conn, chunk)?);
        }

        debug!("loaded {} of {} requested customers", rows.len(), ids.len());
        Ok(rows)
    }

    /// Region code (e.g. `TX`) for a region id, if the directory has one.
    pub fn region_code(&self, region_id: i64) -> StorageResult<Option<String>> {
        let conn = lock(&self.conn)?;
        let code: Option<Option<String>> = conn
            .query_row(
                "SELECT code FROM directory_regions WHERE region_id = ?1",
                params![region_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(code.flatten())
    }

    // ── Newsletter ──

    pub fn is_subscribed(&self, email: &str) -> StorageResult<bool> {
        let conn = lock(&self.conn)?;
        let id: Option<i64> = conn
            .query_row(
                "SELECT subscriber_id FROM newsletter_subscribers WHERE subscriber_email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.is_some())
    }

    /// Subscribes an email. Subscribing twice is a no-op.
    pub fn subscribe(&self, email: &str) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO newsletter_subscribers (subscriber_email) VALUES (?1)",
            params![email],
        )?;
        Ok(())
    }
}

fn load_customer_chunk(conn: &Connection, ids: &[i64]) -> StorageResult<Vec<CustomerRow>> {
    let sql = format!(
        r#"
        SELECT e.entity_id, e.email, e.firstname, e.lastname,
               COUNT(s.entity_id) AS orders_count,
               SUM(s.grand_total) AS total_spent,
               a.street, a.city, a.region, a.region_id, a.postcode, a.country_id, a.company
        FROM customers e
        LEFT JOIN customer_addresses a ON a.entity_id = e.default_billing
        LEFT JOIN sales_orders s ON s.customer_id = e.entity_id
        WHERE e.entity_id IN ({})
        GROUP BY e.entity_id
        "#,
        id_placeholders(ids.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), |row| {
            Ok(CustomerRow {
                id: row.get(0)?,
                email: row.get(1)?,
                firstname: row.get(2)?,
                lastname: row.get(3)?,
                orders_count: to_scalar(row.get(4)?),
                total_spent: to_scalar(row.get(5)?),
                street: row.get(6)?,
                city: row.get(7)?,
                region: row.get(8)?,
                region_id: row.get(9)?,
                postcode: row.get(10)?,
                country_id: row.get(11)?,
                company: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn to_scalar(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Integer(v) => Scalar::Integer(v),
        Value::Real(v) => Scalar::Real(v),
        Value::Text(s) => Scalar::Text(s),
        Value::Blob(b) => Scalar::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn initialize_catalog_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            entity_id INTEGER PRIMARY KEY,
            email TEXT,
            firstname TEXT,
            lastname TEXT,
            store_id INTEGER NOT NULL,
            mailchimp_store_view INTEGER,
            default_billing INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_customers_store ON customers(store_id);

        CREATE TABLE IF NOT EXISTS customer_addresses (
            entity_id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            street TEXT,
            city TEXT,
            region TEXT,
            region_id INTEGER,
            postcode TEXT,
            country_id TEXT,
            company TEXT
        );

        CREATE TABLE IF NOT EXISTS sales_orders (
            entity_id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER,
            grand_total REAL NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sales_orders_customer ON sales_orders(customer_id);

        CREATE TABLE IF NOT EXISTS directory_regions (
            region_id INTEGER PRIMARY KEY,
            country_id TEXT NOT NULL,
            code TEXT,
            default_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS newsletter_subscribers (
            subscriber_id INTEGER PRIMARY KEY AUTOINCREMENT,
            subscriber_email TEXT NOT NULL UNIQUE
        );
        "#,
    )?;
    Ok(())
}
