use crate::model::{Group, Id, NewGroup, NewTrait, Pet, PetFields, Trait};
use anyhow::Result;

#[async_trait::async_trait]
pub trait GroupRepository: Send {
    /// Case-insensitive lookup by scientific name
    async fn find_group(&mut self, scientific_name: &str) -> Result<Option<Group>>;
    /// Insert unless a case-insensitive match exists. `None` means another
    /// writer got there first and the caller should look it up again.
    async fn insert_group_if_absent(&mut self, group: &NewGroup) -> Result<Option<Group>>;
}

#[async_trait::async_trait]
pub trait TraitRepository: Send {
    /// Case-insensitive lookup by name
    async fn find_trait(&mut self, name: &str) -> Result<Option<Trait>>;
    /// Case-sensitive lookup by name, used by the list filter
    async fn find_trait_exact(&mut self, name: &str) -> Result<Option<Trait>>;
    async fn insert_trait_if_absent(&mut self, new_trait: &NewTrait) -> Result<Option<Trait>>;
}

#[async_trait::async_trait]
pub trait PetRepository: Send {
    async fn get_pet(&mut self, id: Id) -> Result<Option<Pet>>;
    async fn insert_pet(&mut self, fields: &PetFields, group_id: Id) -> Result<Id>;
    async fn update_pet(&mut self, id: Id, fields: &PetFields, group_id: Id) -> Result<()>;
    /// Clear the pet's trait set and attach `trait_ids` in order
    async fn replace_pet_traits(&mut self, pet_id: Id, trait_ids: &[Id]) -> Result<()>;
    async fn delete_pet(&mut self, id: Id) -> Result<bool>;
    /// Count pets, optionally only those carrying `trait_id`
    async fn count_pets(&mut self, trait_id: Option<Id>) -> Result<u64>;
    /// Pets ordered by ascending id
    async fn list_pets(&mut self, trait_id: Option<Id>, offset: u64, limit: u64)
        -> Result<Vec<Pet>>;
}

/// Transaction-scoped repository handle. Dropping it without calling
/// `commit` discards every change made through it.
#[async_trait::async_trait]
pub trait Transaction: GroupRepository + TraitRepository + PetRepository + Send {
    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}
