use std::sync::Arc;

use tracing::info;

use crate::error::{AppResult, ConflictError, NotFoundError, ValidationError};
use crate::model::{Actor, Client};
use crate::store::{Store, StoreError};

pub struct ClientService {
    store: Arc<dyn Store>,
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    Ok(name.to_string())
}

impl ClientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<Client>> {
        Ok(self.store.list_clients().await?)
    }

    pub async fn get(&self, id: u64) -> AppResult<Client> {
        self.store
            .get_client(id)
            .await?
            .ok_or_else(|| NotFoundError::Client(id).into())
    }

    pub async fn create(&self, actor: &Actor, name: &str) -> AppResult<Client> {
        actor.require_hr()?;
        let name = clean_name(name)?;
        match self.store.insert_client(&name).await {
            Ok(client) => {
                info!(client_id = client.id, name = %client.name, "Client created");
                Ok(client)
            }
            Err(StoreError::Duplicate(_)) => Err(ConflictError::DuplicateClient(name).into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn rename(&self, actor: &Actor, id: u64, name: &str) -> AppResult<Client> {
        actor.require_hr()?;
        let name = clean_name(name)?;
        self.get(id).await?;

        let client = Client { id, name };
        match self.store.update_client(&client).await {
            Ok(()) => Ok(client),
            Err(StoreError::Duplicate(_)) => Err(ConflictError::DuplicateClient(client.name).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rejected once any clock event has been booked against the client.
    pub async fn delete(&self, actor: &Actor, id: u64) -> AppResult<()> {
        actor.require_hr()?;
        match self.store.delete_client(id).await {
            Ok(true) => {
                info!(client_id = id, "Client deleted");
                Ok(())
            }
            Ok(false) => Err(NotFoundError::Client(id).into()),
            Err(StoreError::InUse(_)) => Err(ConflictError::ClientInUse.into()),
            Err(e) => Err(e.into()),
        }
    }
}
