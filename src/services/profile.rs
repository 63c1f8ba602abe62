use crate::models::user::{USERS_COLLECTION, UserProfile};
use crate::store::{DocumentStore, Filter, OrderBy};
use crate::utils::error::{AppError, AppResult};

pub async fn get_profile(store: &dyn DocumentStore, user_id: &str) -> AppResult<Option<UserProfile>> {
    let Some(doc) = store.get(USERS_COLLECTION, user_id).await? else {
        return Ok(None);
    };
    Ok(Some(UserProfile::from_document(user_id, doc)?))
}

pub async fn put_profile(store: &dyn DocumentStore, profile: &UserProfile) -> AppResult<()> {
    store
        .put(USERS_COLLECTION, &profile.id, profile.to_document(), true)
        .await?;
    Ok(())
}

pub async fn find_profiles(
    store: &dyn DocumentStore,
    field: &str,
    value: &str,
) -> AppResult<Vec<UserProfile>> {
    let docs = store
        .query(
            USERS_COLLECTION,
            &[Filter::eq(field, value)],
            Some(&OrderBy::asc("name")),
        )
        .await?;

    docs.into_iter()
        .map(|doc| UserProfile::from_document(&doc.id, doc.data).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;

    fn profile(id: &str, name: &str, email: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryDocumentStore::new();
        put_profile(&store, &profile("u1", "Kim", "kim@example.com"))
            .await
            .unwrap();

        let loaded = get_profile(&store, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.display_name(), "Kim");
        assert!(get_profile(&store, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_put_keeps_existing_fields() {
        let store = MemoryDocumentStore::new();
        put_profile(&store, &profile("u1", "Kim", "kim@example.com"))
            .await
            .unwrap();
        let patch = UserProfile {
            id: "u1".to_string(),
            photo_url: Some("k.png".to_string()),
            ..Default::default()
        };
        put_profile(&store, &patch).await.unwrap();

        let loaded = get_profile(&store, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.email.as_deref(), Some("kim@example.com"));
        assert_eq!(loaded.photo_url.as_deref(), Some("k.png"));
    }

    #[tokio::test]
    async fn find_by_email() {
        let store = MemoryDocumentStore::new();
        put_profile(&store, &profile("u1", "Kim", "kim@example.com"))
            .await
            .unwrap();
        put_profile(&store, &profile("u2", "Lee", "lee@example.com"))
            .await
            .unwrap();

        let found = find_profiles(&store, "email", "lee@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u2");
    }
}
