use anyhow::anyhow;
use log::{debug, info};
use serde_json::Value;

use crate::config::PaginationConfig;
use crate::logic::error::PetError;
use crate::logic::resolve::{resolve, resolve_traits};
use crate::logic::validate::{parse_new_pet, parse_pet_patch};
use crate::model::{Id, Page, PageRequest, Pet};
use crate::store::traits::{Store, Transaction};

/// Listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default)]
pub struct ListPets<'a> {
    pub trait_name: Option<&'a str>,
    pub page: Option<&'a str>,
    pub page_size: Option<&'a str>,
}

/// Pet endpoints' business logic. Each operation runs in its own transaction.
pub struct PetOperations;

impl PetOperations {
    pub async fn create<S: Store + ?Sized>(store: &S, body: &Value) -> Result<Pet, PetError> {
        let new_pet = parse_new_pet(body)?;

        let mut tx = store.begin().await?;
        let group = resolve(&mut *tx, &new_pet.group).await?;
        let pet_id = tx.insert_pet(&new_pet.fields, group.id).await?;
        let trait_ids = resolve_traits(&mut *tx, &new_pet.traits).await?;
        tx.replace_pet_traits(pet_id, &trait_ids).await?;

        let pet = reload(&mut *tx, pet_id).await?;
        tx.commit().await?;

        info!(
            "Created pet {} '{}' in group '{}' with {} trait(s)",
            pet.id,
            pet.name,
            pet.group.scientific_name,
            pet.traits.len()
        );
        Ok(pet)
    }

    pub async fn list<S: Store + ?Sized>(
        store: &S,
        params: &ListPets<'_>,
        config: &PaginationConfig,
    ) -> Result<Page<Pet>, PetError> {
        let request = PageRequest::from_params(params.page, params.page_size, config)
            .ok_or(PetError::InvalidPage)?;

        let mut tx = store.begin().await?;

        // An empty `trait` parameter means no filter.
        let trait_id = match params.trait_name.filter(|name| !name.is_empty()) {
            Some(name) => Some(
                tx.find_trait_exact(name)
                    .await?
                    .ok_or_else(|| PetError::NotFound(format!("Trait '{}' not found.", name)))?
                    .id,
            ),
            None => None,
        };

        let count = tx.count_pets(trait_id).await?;
        if !request.is_within(count) {
            debug!(
                "Page {} out of range for {} pet(s) at size {}",
                request.number, count, request.size
            );
            return Err(PetError::InvalidPage);
        }

        let items = tx
            .list_pets(trait_id, request.offset(), request.size)
            .await?;
        tx.commit().await?;

        Ok(Page {
            items,
            request,
            count,
        })
    }

    pub async fn retrieve<S: Store + ?Sized>(store: &S, id: Id) -> Result<Pet, PetError> {
        let mut tx = store.begin().await?;
        let pet = tx.get_pet(id).await?.ok_or_else(|| not_found(id))?;
        tx.commit().await?;
        Ok(pet)
    }

    /// Apply a partial update.
    ///
    /// A `group` object reassigns the pet's group. A `traits` list replaces
    /// the whole trait set; without the key the set is left as is. Scalars
    /// are merged and the row is written once.
    pub async fn update<S: Store + ?Sized>(
        store: &S,
        id: Id,
        body: &Value,
    ) -> Result<Pet, PetError> {
        let mut tx = store.begin().await?;
        let current = tx.get_pet(id).await?.ok_or_else(|| not_found(id))?;
        let patch = parse_pet_patch(body)?;

        let group_id = match &patch.group {
            Some(group) => resolve(&mut *tx, group).await?.id,
            None => current.group.id,
        };

        if let Some(traits) = &patch.traits {
            let trait_ids = resolve_traits(&mut *tx, traits).await?;
            tx.replace_pet_traits(id, &trait_ids).await?;
        }

        let mut fields = current.fields();
        fields.merge(&patch);
        tx.update_pet(id, &fields, group_id).await?;

        let pet = reload(&mut *tx, id).await?;
        tx.commit().await?;

        info!("Updated pet {}", id);
        Ok(pet)
    }

    pub async fn delete<S: Store + ?Sized>(store: &S, id: Id) -> Result<(), PetError> {
        let mut tx = store.begin().await?;
        if !tx.delete_pet(id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        info!("Deleted pet {}", id);
        Ok(())
    }
}

fn not_found(id: Id) -> PetError {
    debug!("Pet {} not found", id);
    PetError::NotFound("Not found.".to_string())
}

async fn reload(tx: &mut dyn Transaction, id: Id) -> Result<Pet, PetError> {
    tx.get_pet(id)
        .await?
        .ok_or_else(|| PetError::Internal(anyhow!("Pet {} disappeared mid-transaction", id)))
}
