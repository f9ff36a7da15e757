use crate::error::{AppError, AppResult};
use crate::models::{
    Client, ClientPatch, CreateClient, optional_text, required_text, same_email, valid_email,
};
use crate::store::{Collection, RecordStore};
use std::sync::Arc;
use tracing::info;

pub struct ClientRepository {
    records: Collection<Client>,
}

fn email_taken(records: &[Client], email: &str, exclude: Option<u64>) -> bool {
    records
        .iter()
        .any(|c| Some(c.id) != exclude && same_email(&c.email, email))
}

fn email_conflict(email: &str) -> AppError {
    AppError::conflict(format!("email {email} is already in use"))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ClientRepository {
    pub fn new(store: Arc<dyn RecordStore<Client>>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Client>> {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> AppResult<Option<Client>> {
        self.records.find(id).await
    }

    /// Case-insensitive substring match on first and last name. Given terms are
    /// combined with AND; at least one is required.
    pub async fn search(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<Vec<Client>> {
        let first_name = first_name.map(str::trim).filter(|term| !term.is_empty());
        let last_name = last_name.map(str::trim).filter(|term| !term.is_empty());
        if first_name.is_none() && last_name.is_none() {
            return Err(AppError::validation(
                "provide nombre or apellido to search clients",
            ));
        }

        self.records
            .filter(|c| {
                first_name.is_none_or(|term| contains_ignore_case(&c.first_name, term))
                    && last_name.is_none_or(|term| contains_ignore_case(&c.last_name, term))
            })
            .await
    }

    pub async fn is_email_available(&self, email: &str, exclude: Option<u64>) -> AppResult<bool> {
        let records = self.records.load().await?;
        Ok(!email_taken(&records, email, exclude))
    }

    pub async fn create(&self, data: CreateClient) -> AppResult<Client> {
        let first_name = required_text("nombre", &data.first_name)?;
        let last_name = required_text("apellido", &data.last_name)?;
        let email = valid_email(&data.email)?;

        let client = self
            .records
            .insert_with(|id, records| {
                if email_taken(records, &email, None) {
                    return Err(email_conflict(&email));
                }
                Ok(Client {
                    id,
                    first_name,
                    last_name,
                    email,
                    phone: optional_text(data.phone),
                })
            })
            .await?;

        info!(id = client.id, "client created");
        Ok(client)
    }

    pub async fn update(&self, id: u64, patch: ClientPatch) -> AppResult<Client> {
        let first_name = patch
            .first_name
            .as_deref()
            .map(|name| required_text("nombre", name))
            .transpose()?;
        let last_name = patch
            .last_name
            .as_deref()
            .map(|name| required_text("apellido", name))
            .transpose()?;
        let email = patch.email.as_deref().map(valid_email).transpose()?;

        let client = self
            .records
            .update_with(id, |client, records| {
                if let Some(email) = email {
                    if email_taken(records, &email, Some(client.id)) {
                        return Err(email_conflict(&email));
                    }
                    client.email = email;
                }
                if let Some(first_name) = first_name {
                    client.first_name = first_name;
                }
                if let Some(last_name) = last_name {
                    client.last_name = last_name;
                }
                if let Some(phone) = patch.phone {
                    client.phone = optional_text(phone);
                }
                Ok(())
            })
            .await?;

        info!(id, "client updated");
        Ok(client)
    }

    pub async fn delete(&self, id: u64) -> AppResult<Client> {
        let client = self.records.remove(id).await?;
        info!(id, "client deleted");
        Ok(client)
    }

    /// `nombre apellido` of the client, if it exists.
    pub async fn display_name(&self, id: u64) -> AppResult<Option<String>> {
        Ok(self.get_by_id(id).await?.map(|client| client.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn client(id: u64, first_name: &str, last_name: &str, email: &str) -> Client {
        Client {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: None,
        }
    }

    fn repo() -> ClientRepository {
        ClientRepository::new(Arc::new(MemoryStore::with_records(vec![
            client(1, "María", "López", "maria@mail.com"),
            client(2, "Mario", "Bros", "mario@mail.com"),
            client(3, "Lucía", "Marín", "lucia@mail.com"),
        ])))
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_conjunctive() {
        let repo = repo();

        let by_first = repo.search(Some("MAR"), None).await.unwrap();
        assert_eq!(by_first.iter().map(|c| c.id).collect::<Vec<_>>(), [1, 2]);

        let both = repo.search(Some("mar"), Some("bros")).await.unwrap();
        assert_eq!(both.iter().map(|c| c.id).collect::<Vec<_>>(), [2]);
    }

    #[tokio::test]
    async fn search_needs_a_term() {
        let err = repo().search(Some(" "), None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn email_is_unique_across_all_clients() {
        let repo = repo();

        let err = repo
            .create(CreateClient {
                first_name: "Otra".to_string(),
                last_name: "María".to_string(),
                email: "Maria@Mail.com".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = repo
            .update(
                3,
                ClientPatch {
                    email: Some("mario@mail.com".to_string()),
                    ..ClientPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(repo.is_email_available("lucia@mail.com", Some(3)).await.unwrap());
    }

    #[tokio::test]
    async fn display_name_joins_names() {
        let repo = repo();
        assert_eq!(
            repo.display_name(1).await.unwrap().as_deref(),
            Some("María López")
        );
        assert_eq!(repo.display_name(99).await.unwrap(), None);
    }
}
