//! Persisted table of known cities (`city_bd`) with the user's saved flag.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{fmt::Debug, path::Path};
use tokio::sync::watch;

use crate::{
    error::{Result, WeatherError},
    model::{City, CityUpdate},
};

const BUNDLED_CITIES: &str = include_str!("../assets/cities.json");

#[async_trait]
pub trait CityRepository: Send + Sync + Debug {
    /// Cities whose name starts with exactly `key` (case-sensitive).
    async fn search(&self, key: &str) -> Result<Vec<City>>;

    /// Cities whose saved flag equals `saved`. Unset flags never match.
    async fn saved(&self, saved: bool) -> Result<Vec<City>>;

    /// Emits the current `saved(flag)` rows, then again after every write.
    fn watch_saved(&self, saved: bool) -> BoxStream<'static, Result<Vec<City>>>;

    /// Apply `update` to the row with its id; returns the number of rows touched.
    async fn update_saved(&self, update: CityUpdate) -> Result<u64>;

    /// Remove the row equal to `city` in every column.
    async fn delete(&self, city: &City) -> Result<u64>;
}

/// Entry of the bundled seed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedCity {
    pub id: i64,
    pub name: String,
}

pub fn bundled_cities() -> Result<Vec<SeedCity>> {
    serde_json::from_str(BUNDLED_CITIES)
        .map_err(|source| WeatherError::Decode {
            what: "bundled city list",
            source,
        })
}

#[derive(Debug)]
pub struct SqliteCityStore {
    pool: SqlitePool,
    /// Bumped after every write so `watch_saved` streams re-query.
    changes: watch::Sender<u64>,
}

impl SqliteCityStore {
    /// Open (or create) the database file, upgrade the schema and seed it on first use.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self::from_pool(pool).await?;
        let seeded = store.seed_if_empty(&bundled_cities()?).await?;
        if seeded > 0 {
            tracing::info!(seeded, path = %path.display(), "seeded city database");
        }

        Ok(store)
    }

    /// An empty in-memory store, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        // An in-memory database lives as long as its connection; keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let (changes, _) = watch::channel(0);
        let store = Self { pool, changes };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS city_bd (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                saved INTEGER DEFAULT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // Older seed files ship without the saved column.
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('city_bd')")
                .fetch_all(&self.pool)
                .await?;
        if !columns.iter().any(|column| column == "saved") {
            tracing::warn!("city_bd has no saved column, adding it");
            sqlx::query("ALTER TABLE city_bd ADD COLUMN saved INTEGER DEFAULT NULL")
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Insert `cities` if the table is empty. Returns how many rows were inserted.
    pub async fn seed_if_empty(&self, cities: &[SeedCity]) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM city_bd")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;
        for city in cities {
            inserted += sqlx::query("INSERT OR IGNORE INTO city_bd (id, name) VALUES (?1, ?2)")
                .bind(city.id)
                .bind(&city.name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        self.notify();
        Ok(inserted as usize)
    }

    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }
}

async fn fetch_saved(pool: &SqlitePool, saved: bool) -> Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>(
        "SELECT id, name, saved FROM city_bd WHERE saved = ?1 ORDER BY name",
    )
    .bind(saved)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[async_trait]
impl CityRepository for SqliteCityStore {
    async fn search(&self, key: &str) -> Result<Vec<City>> {
        // substr/length instead of LIKE: exact, case-sensitive, no wildcards.
        let rows = sqlx::query_as::<_, City>(
            "SELECT id, name, saved FROM city_bd
             WHERE substr(name, 1, length(?1)) = ?1
             ORDER BY name",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn saved(&self, saved: bool) -> Result<Vec<City>> {
        fetch_saved(&self.pool, saved).await
    }

    fn watch_saved(&self, saved: bool) -> BoxStream<'static, Result<Vec<City>>> {
        let pool = self.pool.clone();
        let changes = self.changes.subscribe();

        stream::unfold((pool, changes, true), move |(pool, mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let rows = fetch_saved(&pool, saved).await;
            Some((rows, (pool, changes, false)))
        })
        .boxed()
    }

    async fn update_saved(&self, update: CityUpdate) -> Result<u64> {
        let result = sqlx::query("UPDATE city_bd SET saved = ?1 WHERE id = ?2")
            .bind(update.saved)
            .bind(update.id)
            .execute(&self.pool)
            .await?;

        self.notify();
        Ok(result.rows_affected())
    }

    async fn delete(&self, city: &City) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM city_bd WHERE id = ?1 AND name = ?2 AND saved IS ?3")
                .bind(city.id)
                .bind(&city.name)
                .bind(city.saved)
                .execute(&self.pool)
                .await?;

        self.notify();
        Ok(result.rows_affected())
    }
}
