use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::logic::error::PetError;
use crate::model::{Group, Id, NewGroup, NewTrait, Trait};
use crate::store::traits::Transaction;

/// A payload identified by a case-insensitive natural key that can be
/// resolved to an existing row or created on first use.
#[async_trait::async_trait]
pub trait Upsertable: Send + Sync {
    type Record: Send;

    const KIND: &'static str;

    fn natural_key(&self) -> &str;

    async fn find(&self, tx: &mut dyn Transaction) -> Result<Option<Self::Record>>;

    async fn insert_if_absent(&self, tx: &mut dyn Transaction) -> Result<Option<Self::Record>>;
}

#[async_trait::async_trait]
impl Upsertable for NewGroup {
    type Record = Group;

    const KIND: &'static str = "Group";

    fn natural_key(&self) -> &str {
        &self.scientific_name
    }

    async fn find(&self, tx: &mut dyn Transaction) -> Result<Option<Group>> {
        tx.find_group(&self.scientific_name).await
    }

    async fn insert_if_absent(&self, tx: &mut dyn Transaction) -> Result<Option<Group>> {
        tx.insert_group_if_absent(self).await
    }
}

#[async_trait::async_trait]
impl Upsertable for NewTrait {
    type Record = Trait;

    const KIND: &'static str = "Trait";

    fn natural_key(&self) -> &str {
        &self.name
    }

    async fn find(&self, tx: &mut dyn Transaction) -> Result<Option<Trait>> {
        tx.find_trait(&self.name).await
    }

    async fn insert_if_absent(&self, tx: &mut dyn Transaction) -> Result<Option<Trait>> {
        tx.insert_trait_if_absent(self).await
    }
}

/// Get-or-create by natural key.
///
/// Creates at most one row. When the insert loses a race against another
/// writer the row is looked up once more; if it is still not visible the
/// call fails with `Conflict`.
pub async fn resolve<U: Upsertable>(
    tx: &mut dyn Transaction,
    payload: &U,
) -> Result<U::Record, PetError> {
    if let Some(existing) = payload.find(tx).await? {
        return Ok(existing);
    }

    if let Some(created) = payload.insert_if_absent(tx).await? {
        info!("Created {} '{}'", U::KIND, payload.natural_key());
        return Ok(created);
    }

    payload.find(tx).await?.ok_or_else(|| {
        PetError::Conflict(format!(
            "{} '{}' was created concurrently and is not yet visible",
            U::KIND,
            payload.natural_key()
        ))
    })
}

/// Resolve every trait payload in order, collapsing repeats (including case
/// variants of the same name) to their first occurrence.
pub async fn resolve_traits(
    tx: &mut dyn Transaction,
    payloads: &[NewTrait],
) -> Result<Vec<Id>, PetError> {
    let mut ids = Vec::with_capacity(payloads.len());
    for payload in payloads {
        ids.push(resolve(tx, payload).await?.id);
    }
    Ok(ids.into_iter().unique().collect())
}
