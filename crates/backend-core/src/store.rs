//! # Generic Resource Store
//!
//! This module defines the `ResourceStore`, the component that owns the entities of one
//! resource kind for one backend and runs their lifecycle hooks. Operations run to completion
//! on the caller's thread; exclusive `&mut` access replaces locking.

use crate::entity::BackendEntity;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The generic store that manages a collection of entities.
///
/// Entities are kept in a `BTreeMap` so every listing comes back ordered by id without an
/// extra sort at the call site.
///
/// ## Operations
///
/// * **Create**:
///     1. Rejects ids that are already present with [`BackendEntity::already_exists`].
///     2. Calls `T::from_create_params` to build the entity (defaults are applied there).
///     3. Inserts the entity and returns a reference to it.
///
/// * **Update**:
///     1. Looks up the entity (mutable access), [`BackendEntity::not_found`] if absent.
///     2. Calls the `on_update` hook; the entity modifies its own state.
///
/// * **Delete** (strict): `not_found` when absent, otherwise `on_delete` then removal.
///
/// * **Discard** (lenient): removes the entity if present and ignores missing ids.
#[derive(Debug)]
pub struct ResourceStore<T: BackendEntity> {
    context: T::Context,
    items: BTreeMap<T::Id, T>,
}

impl<T: BackendEntity> ResourceStore<T> {
    /// Creates an empty store bound to `context`.
    pub fn new(context: T::Context) -> Self {
        Self {
            context,
            items: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &T::Context {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        let item = self.items.get(id);
        debug!(entity = T::KIND, %id, found = item.is_some(), "Get");
        item
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    /// Like [`get`](Self::get), failing with the entity's not-found error.
    pub fn require(&self, id: &T::Id) -> Result<&T, T::Error> {
        match self.items.get(id) {
            Some(item) => Ok(item),
            None => {
                warn!(entity = T::KIND, %id, "Not found");
                Err(T::not_found(id, &self.context))
            }
        }
    }

    pub fn require_mut(&mut self, id: &T::Id) -> Result<&mut T, T::Error> {
        match self.items.get_mut(id) {
            Some(item) => Ok(item),
            None => {
                warn!(entity = T::KIND, %id, "Not found");
                Err(T::not_found(id, &self.context))
            }
        }
    }

    /// Fails with the entity's already-exists error when `id` is taken.
    pub fn ensure_absent(&self, id: &T::Id) -> Result<(), T::Error> {
        if self.items.contains_key(id) {
            warn!(entity = T::KIND, %id, "Already exists");
            return Err(T::already_exists(id, &self.context));
        }
        Ok(())
    }

    pub fn create(&mut self, id: T::Id, params: T::Create) -> Result<&mut T, T::Error> {
        debug!(entity = T::KIND, %id, ?params, "Create");
        self.ensure_absent(&id)?;
        let item = match T::from_create_params(id.clone(), params, &self.context) {
            Ok(item) => item,
            Err(e) => {
                warn!(entity = T::KIND, %id, error = %e, "Create failed");
                return Err(e);
            }
        };
        self.items.insert(id.clone(), item);
        info!(entity = T::KIND, %id, size = self.items.len(), "Created");
        self.require_mut(&id)
    }

    pub fn update(&mut self, id: &T::Id, update: T::Update) -> Result<&T, T::Error> {
        debug!(entity = T::KIND, %id, ?update, "Update");
        let context = &self.context;
        let Some(item) = self.items.get_mut(id) else {
            warn!(entity = T::KIND, %id, "Not found");
            return Err(T::not_found(id, context));
        };
        if let Err(e) = item.on_update(update, context) {
            warn!(entity = T::KIND, %id, error = %e, "Update failed");
            return Err(e);
        }
        info!(entity = T::KIND, %id, "Updated");
        Ok(item)
    }

    /// Strict delete: a missing id is an error.
    pub fn delete(&mut self, id: &T::Id) -> Result<T, T::Error> {
        debug!(entity = T::KIND, %id, "Delete");
        let item = self.require(id)?;
        if let Err(e) = item.on_delete(&self.context) {
            warn!(entity = T::KIND, %id, error = %e, "on_delete failed");
            return Err(e);
        }
        let removed = self.items.remove(id).ok_or_else(|| T::not_found(id, &self.context))?;
        info!(entity = T::KIND, %id, size = self.items.len(), "Deleted");
        Ok(removed)
    }

    /// Lenient delete: a missing id is silently ignored and no hook runs.
    pub fn discard(&mut self, id: &T::Id) -> Option<T> {
        let removed = self.items.remove(id);
        if removed.is_some() {
            info!(entity = T::KIND, %id, size = self.items.len(), "Deleted");
        } else {
            debug!(entity = T::KIND, %id, "Discard of missing id ignored");
        }
        removed
    }

    /// Drops every entity for which `keep` returns false, without running hooks.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let before = self.items.len();
        self.items.retain(|_, item| keep(item));
        let removed = before - self.items.len();
        if removed > 0 {
            info!(entity = T::KIND, removed, size = self.items.len(), "Pruned");
        }
    }

    /// Entities ordered by id.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.items.keys()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        info!(entity = T::KIND, "Cleared");
    }
}
