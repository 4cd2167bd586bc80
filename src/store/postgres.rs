use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Postgres, Row};
use std::collections::HashMap;

use crate::model::{Group, Id, NewGroup, NewTrait, Pet, PetFields, Sex, Trait};
use crate::store::traits::{GroupRepository, PetRepository, Store, TraitRepository, Transaction};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        scientific_name: row.get("scientific_name"),
        created_at: row.get("created_at"),
    }
}

fn trait_from_row(row: &PgRow) -> Trait {
    Trait {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn parse_sex(raw: &str) -> Result<Sex> {
    Sex::parse(raw).with_context(|| format!("Unknown sex value stored: {:?}", raw))
}

const PET_SELECT: &str = r#"
    SELECT p.id, p.name, p.age, p.weight, p.sex,
           g.id AS group_id, g.scientific_name, g.created_at AS group_created_at
    FROM pets p
    JOIN groups g ON g.id = p.group_id
"#;

impl PostgresTransaction {
    /// Load trait sets for the given pets, keyed by pet id, in attachment order
    async fn traits_for(&mut self, pet_ids: &[Id]) -> Result<HashMap<Id, Vec<Trait>>> {
        let rows = sqlx::query(
            r#"
            SELECT pt.pet_id, t.id, t.name, t.created_at
            FROM pet_traits pt
            JOIN traits t ON t.id = pt.trait_id
            WHERE pt.pet_id = ANY($1)
            ORDER BY pt.pet_id, pt.position
            "#,
        )
        .bind(pet_ids)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to load pet traits")?;

        let mut by_pet: HashMap<Id, Vec<Trait>> = HashMap::new();
        for row in rows {
            by_pet
                .entry(row.get("pet_id"))
                .or_default()
                .push(trait_from_row(&row));
        }
        Ok(by_pet)
    }

    async fn expand(&mut self, rows: Vec<PgRow>) -> Result<Vec<Pet>> {
        let ids: Vec<Id> = rows.iter().map(|row| row.get("id")).collect();
        let mut traits = self.traits_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let id: Id = row.get("id");
                let sex: String = row.get("sex");
                Ok(Pet {
                    id,
                    name: row.get("name"),
                    age: row.get("age"),
                    weight: row.get("weight"),
                    sex: parse_sex(&sex)?,
                    group: Group {
                        id: row.get("group_id"),
                        scientific_name: row.get("scientific_name"),
                        created_at: row.get("group_created_at"),
                    },
                    traits: traits.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl GroupRepository for PostgresTransaction {
    async fn find_group(&mut self, scientific_name: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            r#"
            SELECT id, scientific_name, created_at
            FROM groups
            WHERE lower(scientific_name) = lower($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(scientific_name)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch group")?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn insert_group_if_absent(&mut self, group: &NewGroup) -> Result<Option<Group>> {
        // Backed by the unique index on lower(scientific_name); a concurrent
        // writer makes this a no-op instead of a constraint violation.
        let row = sqlx::query(
            r#"
            INSERT INTO groups (scientific_name)
            VALUES ($1)
            ON CONFLICT DO NOTHING
            RETURNING id, scientific_name, created_at
            "#,
        )
        .bind(&group.scientific_name)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to insert group")?;

        Ok(row.as_ref().map(group_from_row))
    }
}

#[async_trait::async_trait]
impl TraitRepository for PostgresTransaction {
    async fn find_trait(&mut self, name: &str) -> Result<Option<Trait>> {
        let row = sqlx::query(
            "SELECT id, name, created_at FROM traits WHERE lower(name) = lower($1) ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch trait")?;

        Ok(row.as_ref().map(trait_from_row))
    }

    async fn find_trait_exact(&mut self, name: &str) -> Result<Option<Trait>> {
        let row = sqlx::query("SELECT id, name, created_at FROM traits WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch trait")?;

        Ok(row.as_ref().map(trait_from_row))
    }

    async fn insert_trait_if_absent(&mut self, new_trait: &NewTrait) -> Result<Option<Trait>> {
        let row = sqlx::query(
            r#"
            INSERT INTO traits (name)
            VALUES ($1)
            ON CONFLICT DO NOTHING
            RETURNING id, name, created_at
            "#,
        )
        .bind(&new_trait.name)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to insert trait")?;

        Ok(row.as_ref().map(trait_from_row))
    }
}

#[async_trait::async_trait]
impl PetRepository for PostgresTransaction {
    async fn get_pet(&mut self, id: Id) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!("{} WHERE p.id = $1", PET_SELECT))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch pet")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.expand(vec![row]).await?.pop())
    }

    async fn insert_pet(&mut self, fields: &PetFields, group_id: Id) -> Result<Id> {
        let row = sqlx::query(
            r#"
            INSERT INTO pets (name, age, weight, sex, group_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&fields.name)
        .bind(fields.age)
        .bind(fields.weight)
        .bind(fields.sex.as_str())
        .bind(group_id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to insert pet")?;

        Ok(row.get("id"))
    }

    async fn update_pet(&mut self, id: Id, fields: &PetFields, group_id: Id) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pets
            SET name = $2, age = $3, weight = $4, sex = $5, group_id = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(fields.age)
        .bind(fields.weight)
        .bind(fields.sex.as_str())
        .bind(group_id)
        .execute(&mut *self.tx)
        .await
        .context("Failed to update pet")?;

        Ok(())
    }

    async fn replace_pet_traits(&mut self, pet_id: Id, trait_ids: &[Id]) -> Result<()> {
        sqlx::query("DELETE FROM pet_traits WHERE pet_id = $1")
            .bind(pet_id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to clear pet traits")?;

        if trait_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO pet_traits (pet_id, trait_id, position)
            SELECT $1, t.trait_id, t.position
            FROM UNNEST($2::BIGINT[]) WITH ORDINALITY AS t(trait_id, position)
            ON CONFLICT (pet_id, trait_id) DO NOTHING
            "#,
        )
        .bind(pet_id)
        .bind(trait_ids)
        .execute(&mut *self.tx)
        .await
        .context("Failed to attach pet traits")?;

        Ok(())
    }

    async fn delete_pet(&mut self, id: Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to delete pet")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_pets(&mut self, trait_id: Option<Id>) -> Result<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM pets p
            WHERE $1::BIGINT IS NULL
               OR EXISTS (SELECT 1 FROM pet_traits pt WHERE pt.pet_id = p.id AND pt.trait_id = $1)
            "#,
        )
        .bind(trait_id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to count pets")?;

        let count: i64 = row.get("count");
        Ok(count.max(0) as u64)
    }

    async fn list_pets(
        &mut self,
        trait_id: Option<Id>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Pet>> {
        let query = format!(
            r#"{}
            WHERE $1::BIGINT IS NULL
               OR EXISTS (SELECT 1 FROM pet_traits pt WHERE pt.pet_id = p.id AND pt.trait_id = $1)
            ORDER BY p.id
            LIMIT $2 OFFSET $3
            "#,
            PET_SELECT
        );

        let rows = sqlx::query(&query)
            .bind(trait_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&mut *self.tx)
            .await
            .context("Failed to list pets")?;

        self.expand(rows).await
    }
}

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }
}
