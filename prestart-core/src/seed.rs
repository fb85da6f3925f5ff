//! Idempotent baseline-data seeding.
//!
//! Each store exposes one capability: make sure its baseline records exist.
//! Calling it repeatedly must never duplicate data or fail because the data
//! is already there. The relational seeder is existence-check-then-create
//! keyed on the admin email, with a unique-constraint guard so concurrent
//! replicas racing the insert stay safe; the document seeder creates its
//! collection only when absent.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use mongodb::{Client, bson::doc, error::ErrorKind};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{BootstrapError, Result};

/// Capability to ensure a store's baseline data is present.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Create baseline records if and only if they are absent.
    async fn ensure_seed_data(&self) -> Result<()>;
}

/// Identity of the initial administrator account.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    /// Natural key for the find-or-create.
    pub email: String,
    /// Plaintext password, hashed with argon2 before insert.
    pub password: String,
}

/// Seeds the relational store with the initial admin user.
#[derive(Debug, Clone)]
pub struct PostgresSeeder {
    pool: PgPool,
    admin: AdminSeed,
}

impl PostgresSeeder {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool, admin: AdminSeed) -> Self {
        Self { pool, admin }
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| {
                BootstrapError::Seed(anyhow::anyhow!(
                    "failed to hash admin password: {err}"
                ))
            })?;
        Ok(hash.to_string())
    }
}

#[async_trait]
impl SeedStore for PostgresSeeder {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ensure_seed_data(&self) -> Result<()> {
        let existing =
            sqlx::query("SELECT 1 FROM users WHERE email = $1 LIMIT 1")
                .bind(&self.admin.email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| BootstrapError::Seed(err.into()))?;

        if existing.is_some() {
            info!(email = %self.admin.email, "admin user already present");
            return Ok(());
        }

        let hashed = Self::hash_password(&self.admin.password)?;

        // ON CONFLICT keeps a sibling replica racing this insert from
        // turning the unique constraint into a failed bootstrap.
        sqlx::query(
            "INSERT INTO users \
                 (id, email, username, full_name, hashed_password, role, status) \
             VALUES ($1, $2, 'administrator', 'Super User', $3, 'admin', 'active') \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&self.admin.email)
        .bind(&hashed)
        .execute(&self.pool)
        .await
        .map_err(|err| BootstrapError::Seed(err.into()))?;

        info!(email = %self.admin.email, "admin user created");
        Ok(())
    }
}

/// Seeds the document store with the validated `product` collection.
#[derive(Debug, Clone)]
pub struct MongoSeeder {
    client: Client,
    database: String,
}

impl MongoSeeder {
    /// Wrap an existing client, targeting the named database.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }
}

#[async_trait]
impl SeedStore for MongoSeeder {
    fn name(&self) -> &str {
        "mongo"
    }

    async fn ensure_seed_data(&self) -> Result<()> {
        let db = self.client.database(&self.database);

        let collections = db
            .list_collection_names()
            .await
            .map_err(|err| BootstrapError::Seed(err.into()))?;
        if collections.iter().any(|name| name == "product") {
            info!(database = %self.database, "product collection already present");
            return Ok(());
        }

        let created = db
            .create_collection("product")
            .validator(doc! {
                "$jsonSchema": {
                    "bsonType": "object",
                    "required": ["title", "category", "price", "rating"],
                    "properties": {
                        "title": {
                            "bsonType": "string",
                            "description": "Title of the product",
                        },
                        "category": {
                            "bsonType": "string",
                            "description": "Category of the product",
                        },
                        "price": {
                            "bsonType": "double",
                            "description": "Price of the product",
                        },
                        "rating": {
                            "bsonType": "double",
                            "description": "Rating of the product",
                        },
                    },
                },
            })
            .await;

        if let Err(err) = created {
            // A sibling replica may have created the collection between the
            // listing and the create; that is the same outcome as ON
            // CONFLICT DO NOTHING on the relational side.
            if !collection_already_present(&err.kind) {
                return Err(BootstrapError::Seed(err.into()));
            }
            info!(database = %self.database, "product collection already present");
            return Ok(());
        }

        info!(database = %self.database, "product collection created");
        Ok(())
    }
}

/// Server error code for "namespace exists".
const NAMESPACE_EXISTS: i32 = 48;

fn collection_already_present(kind: &ErrorKind) -> bool {
    matches!(kind, ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::error::CommandError;

    fn command_error(code: i32, code_name: &str) -> ErrorKind {
        let command: CommandError = mongodb::bson::from_document(doc! {
            "code": code,
            "codeName": code_name,
            "errmsg": "command failed",
        })
        .expect("valid command error document");
        ErrorKind::Command(command)
    }

    #[test]
    fn concurrent_collection_creation_counts_as_present() {
        let kind = command_error(NAMESPACE_EXISTS, "NamespaceExists");
        assert!(collection_already_present(&kind));
    }

    #[test]
    fn other_command_failures_still_fail_seeding() {
        let kind = command_error(26, "NamespaceNotFound");
        assert!(!collection_already_present(&kind));
    }
}
