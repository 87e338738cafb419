//! Catalog operations

use super::{Catalog, Library};
use crate::error::{AppError, Result};

impl Library {
    /// Catalogs by sort order, then name
    pub async fn list_catalogs(&self) -> Result<Vec<Catalog>> {
        self.cache.list_catalogs().await
    }

    pub async fn create_catalog(&self, name: &str, description: &str) -> Result<Catalog> {
        let name = valid_name(name)?;
        let existing = self.cache.list_catalogs().await?;
        if existing.iter().any(|c| c.name == name) {
            return Err(duplicate(name));
        }

        let order = existing
            .iter()
            .filter_map(|c| c.order)
            .max()
            .map_or(0, |max| max + 1);
        let catalog = Catalog::new(name, description.trim(), order);

        self.cache
            .upsert_catalog(&catalog)
            .await
            .map_err(|e| unique_to_conflict(e, name))?;

        tracing::info!("Created catalog '{}' ({})", catalog.name, catalog.id);
        self.changed();
        Ok(catalog)
    }

    /// Rename a catalog, moving its files to the new name
    pub async fn rename_catalog(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Catalog> {
        let name = valid_name(name)?;
        let mut catalog = self.catalog(id).await?;

        let taken = self
            .cache
            .list_catalogs()
            .await?
            .iter()
            .any(|c| c.name == name && c.id != id);
        if taken {
            return Err(duplicate(name));
        }

        let previous = std::mem::replace(&mut catalog.name, name.to_string());
        if let Some(description) = description {
            catalog.description = description.trim().to_string();
        }

        self.cache
            .upsert_catalog(&catalog)
            .await
            .map_err(|e| unique_to_conflict(e, name))?;

        if previous != catalog.name {
            let moved = self
                .cache
                .reassign_catalog(&previous, Some(&catalog.name))
                .await?;
            tracing::info!(
                "Renamed catalog '{}' to '{}', {} files moved",
                previous,
                catalog.name,
                moved
            );
        }

        self.changed();
        Ok(catalog)
    }

    /// Give catalogs consecutive positions in the order of `ids`
    pub async fn reorder_catalogs(&self, ids: &[String]) -> Result<Vec<Catalog>> {
        let mut catalogs = Vec::with_capacity(ids.len());
        for id in ids {
            catalogs.push(self.catalog(id).await?);
        }

        for (position, mut catalog) in catalogs.into_iter().enumerate() {
            catalog.order = Some(position as i64);
            self.cache.upsert_catalog(&catalog).await?;
        }

        self.changed();
        self.cache.list_catalogs().await
    }

    /// Delete a catalog; its files become uncategorized
    pub async fn delete_catalog(&self, id: &str) -> Result<()> {
        let catalog = self.catalog(id).await?;

        let orphaned = self.cache.reassign_catalog(&catalog.name, None).await?;
        self.cache.delete_catalog(id).await?;

        tracing::info!(
            "Deleted catalog '{}', {} files uncategorized",
            catalog.name,
            orphaned
        );
        self.changed();
        Ok(())
    }

    pub(super) async fn catalog(&self, id: &str) -> Result<Catalog> {
        self.cache
            .get_catalog(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Catalog not found: {}", id)))
    }
}

fn valid_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Catalog name is required".to_string()));
    }
    Ok(name)
}

fn duplicate(name: &str) -> AppError {
    AppError::Conflict(format!("A catalog named '{}' already exists", name))
}

fn unique_to_conflict(err: AppError, name: &str) -> AppError {
    match err {
        AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => duplicate(name),
        other => other,
    }
}
