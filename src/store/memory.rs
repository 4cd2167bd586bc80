use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{Group, Id, NewGroup, NewTrait, Pet, PetFields, Trait};
use crate::store::traits::{GroupRepository, PetRepository, Store, TraitRepository, Transaction};

#[derive(Debug, Clone)]
struct PetRow {
    fields: PetFields,
    group_id: Id,
    trait_ids: Vec<Id>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_group_id: Id,
    last_trait_id: Id,
    last_pet_id: Id,
    groups: BTreeMap<Id, Group>,
    traits: BTreeMap<Id, Trait>,
    pets: BTreeMap<Id, PetRow>,
}

impl MemoryState {
    fn expand(&self, id: Id, row: &PetRow) -> Result<Pet> {
        let group = self
            .groups
            .get(&row.group_id)
            .cloned()
            .ok_or_else(|| anyhow!("Pet {} references missing group {}", id, row.group_id))?;

        let traits = row
            .trait_ids
            .iter()
            .map(|trait_id| {
                self.traits
                    .get(trait_id)
                    .cloned()
                    .ok_or_else(|| anyhow!("Pet {} references missing trait {}", id, trait_id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Pet {
            id,
            name: row.fields.name.clone(),
            age: row.fields.age,
            weight: row.fields.weight,
            sex: row.fields.sex,
            group,
            traits,
        })
    }

    fn pets_with_trait(&self, trait_id: Option<Id>) -> impl Iterator<Item = (&Id, &PetRow)> + '_ {
        self.pets
            .iter()
            .filter(move |(_, row)| trait_id.map_or(true, |t| row.trait_ids.contains(&t)))
    }
}

/// Process-local store used for development and tests.
///
/// Transactions take an exclusive lock for their whole lifetime, work on a
/// private copy of the state and publish it on commit, so they are fully
/// serialised.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn group_count(&self) -> usize {
        self.state.lock().await.groups.len()
    }

    pub async fn trait_count(&self) -> usize {
        self.state.lock().await.traits.len()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait::async_trait]
impl GroupRepository for MemoryTransaction {
    // Full Unicode case folding. PostgreSQL's lower() depends on the database
    // ctype, so the two backends only agree for every input under a UTF-8 locale.
    async fn find_group(&mut self, scientific_name: &str) -> Result<Option<Group>> {
        let key = scientific_name.to_lowercase();
        Ok(self
            .working
            .groups
            .values()
            .find(|group| group.scientific_name.to_lowercase() == key)
            .cloned())
    }

    async fn insert_group_if_absent(&mut self, group: &NewGroup) -> Result<Option<Group>> {
        if self.find_group(&group.scientific_name).await?.is_some() {
            return Ok(None);
        }
        self.working.last_group_id += 1;
        let created = group.clone().into_group(self.working.last_group_id);
        self.working.groups.insert(created.id, created.clone());
        Ok(Some(created))
    }
}

#[async_trait::async_trait]
impl TraitRepository for MemoryTransaction {
    async fn find_trait(&mut self, name: &str) -> Result<Option<Trait>> {
        let key = name.to_lowercase();
        Ok(self
            .working
            .traits
            .values()
            .find(|t| t.name.to_lowercase() == key)
            .cloned())
    }

    async fn find_trait_exact(&mut self, name: &str) -> Result<Option<Trait>> {
        Ok(self.working.traits.values().find(|t| t.name == name).cloned())
    }

    async fn insert_trait_if_absent(&mut self, new_trait: &NewTrait) -> Result<Option<Trait>> {
        if self.find_trait(&new_trait.name).await?.is_some() {
            return Ok(None);
        }
        self.working.last_trait_id += 1;
        let created = new_trait.clone().into_trait(self.working.last_trait_id);
        self.working.traits.insert(created.id, created.clone());
        Ok(Some(created))
    }
}

#[async_trait::async_trait]
impl PetRepository for MemoryTransaction {
    async fn get_pet(&mut self, id: Id) -> Result<Option<Pet>> {
        self.working
            .pets
            .get(&id)
            .map(|row| self.working.expand(id, row))
            .transpose()
    }

    async fn insert_pet(&mut self, fields: &PetFields, group_id: Id) -> Result<Id> {
        if !self.working.groups.contains_key(&group_id) {
            return Err(anyhow!("Cannot insert pet: group {} does not exist", group_id));
        }
        self.working.last_pet_id += 1;
        let id = self.working.last_pet_id;
        self.working.pets.insert(
            id,
            PetRow {
                fields: fields.clone(),
                group_id,
                trait_ids: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_pet(&mut self, id: Id, fields: &PetFields, group_id: Id) -> Result<()> {
        if !self.working.groups.contains_key(&group_id) {
            return Err(anyhow!("Cannot update pet: group {} does not exist", group_id));
        }
        let row = self
            .working
            .pets
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Pet {} not found", id))?;
        row.fields = fields.clone();
        row.group_id = group_id;
        Ok(())
    }

    async fn replace_pet_traits(&mut self, pet_id: Id, trait_ids: &[Id]) -> Result<()> {
        if let Some(missing) = trait_ids
            .iter()
            .find(|id| !self.working.traits.contains_key(*id))
        {
            return Err(anyhow!("Cannot attach missing trait {}", missing));
        }
        let row = self
            .working
            .pets
            .get_mut(&pet_id)
            .ok_or_else(|| anyhow!("Pet {} not found", pet_id))?;

        row.trait_ids.clear();
        for trait_id in trait_ids {
            if !row.trait_ids.contains(trait_id) {
                row.trait_ids.push(*trait_id);
            }
        }
        Ok(())
    }

    async fn delete_pet(&mut self, id: Id) -> Result<bool> {
        Ok(self.working.pets.remove(&id).is_some())
    }

    async fn count_pets(&mut self, trait_id: Option<Id>) -> Result<u64> {
        Ok(self.working.pets_with_trait(trait_id).count() as u64)
    }

    async fn list_pets(
        &mut self,
        trait_id: Option<Id>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Pet>> {
        self.working
            .pets_with_trait(trait_id)
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(id, row)| self.working.expand(*id, row))
            .collect()
    }
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
