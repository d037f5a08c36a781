//! Migration.
//!
//! [`migrate`] brings the host storage up: it creates a table per registered
//! model, then seeds content types and default permissions, the way the
//! `post_migrate` handlers of the contenttypes and auth apps do.

use rest_extras_core::ExtrasResult;
use rest_extras_db::{ContentTypeCatalog, InMemoryDatabase, ModelRegistry};

use crate::permissions::create_permissions;

/// Creates every table, then seeds content types and permissions.
pub async fn migrate(db: &InMemoryDatabase, models: &ModelRegistry) -> ExtrasResult<()> {
    db.migrate(models).await?;
    let catalog = ContentTypeCatalog::new(db.clone());
    let content_types = catalog.create_content_types(models).await?;
    let permissions = create_permissions(models, &catalog).await?;
    tracing::info!(
        models = models.len(),
        content_types = content_types.len(),
        permissions,
        "migrated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use crate::permissions::Permission;

    #[tokio::test]
    async fn test_migrate_seeds_catalog_and_permissions() {
        let db = InMemoryDatabase::new();
        let mut registry = ModelRegistry::new();
        for meta in models::all() {
            registry.register(db.model_class(meta)).unwrap();
        }
        migrate(&db, &registry).await.unwrap();
        migrate(&db, &registry).await.unwrap();

        let catalog = ContentTypeCatalog::new(db.clone());
        assert_eq!(catalog.all().await.unwrap().len(), registry.len());

        let rows = db.select(models::PERMISSION_MODEL).await.unwrap();
        assert_eq!(rows.len(), registry.len() * 3);
        let user_ct = catalog.get_by_natural_key("auth", "user").await.unwrap();
        let codenames: Vec<String> = rows
            .iter()
            .map(|r| Permission::from_record(r).unwrap())
            .filter(|p| p.content_type == user_ct.id)
            .map(|p| p.codename)
            .collect();
        assert_eq!(codenames, vec!["add_user", "change_user", "delete_user"]);
    }
}
