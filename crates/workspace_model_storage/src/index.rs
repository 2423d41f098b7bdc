//! Secondary indices kept in step with every mutation.

use std::collections::BTreeSet;

use workspace_model_foundation::{EntityId, Error, PersistentId, Result, VirtualFileUrl};

/// Unique mapping between persistent ids and entity ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistentIdIndex {
    by_pid: im::HashMap<PersistentId, EntityId>,
    by_entity: im::OrdMap<EntityId, PersistentId>,
}

impl PersistentIdIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an entity to its persistent id, replacing its previous id.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePersistentId` if another entity already has the id.
    pub fn insert(&mut self, id: EntityId, pid: PersistentId) -> Result<()> {
        match self.by_pid.get(&pid) {
            Some(owner) if *owner != id => return Err(Error::duplicate_persistent_id(pid)),
            _ => {}
        }
        self.remove(id);
        tracing::trace!(%id, %pid, "indexed persistent id");
        self.by_pid.insert(pid.clone(), id);
        self.by_entity.insert(id, pid);
        Ok(())
    }

    /// Drops the entry of an entity, returning its persistent id.
    pub fn remove(&mut self, id: EntityId) -> Option<PersistentId> {
        let pid = self.by_entity.remove(&id)?;
        self.by_pid.remove(&pid);
        Some(pid)
    }

    /// Resolves a persistent id.
    #[must_use]
    pub fn get(&self, pid: &PersistentId) -> Option<EntityId> {
        self.by_pid.get(pid).copied()
    }

    /// Returns the persistent id of an entity.
    #[must_use]
    pub fn persistent_id_of(&self, id: EntityId) -> Option<&PersistentId> {
        self.by_entity.get(&id)
    }

    /// Returns the number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

/// Which entities link to which persistent ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoftLinkIndex {
    referrers: im::HashMap<PersistentId, im::OrdSet<EntityId>>,
    links: im::OrdMap<EntityId, im::OrdSet<PersistentId>>,
}

impl SoftLinkIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the links of a newly indexed entity.
    pub fn index(&mut self, id: EntityId, links: &BTreeSet<PersistentId>) {
        self.update(id, links);
    }

    /// Replaces the links of an entity, touching only the ids that changed.
    pub fn update(&mut self, id: EntityId, links: &BTreeSet<PersistentId>) {
        let previous = self.links.get(&id).cloned().unwrap_or_default();

        for old in previous.iter().filter(|pid| !links.contains(*pid)) {
            self.drop_referrer(old, id);
        }
        for new in links.iter().filter(|pid| !previous.contains(*pid)) {
            tracing::trace!(%id, pid = %new, "indexed soft link");
            self.referrers
                .entry(new.clone())
                .or_insert_with(im::OrdSet::new)
                .insert(id);
        }

        if links.is_empty() {
            self.links.remove(&id);
        } else {
            self.links.insert(id, links.iter().cloned().collect());
        }
    }

    /// Drops every link of an entity.
    pub fn remove(&mut self, id: EntityId) {
        if let Some(previous) = self.links.remove(&id) {
            for pid in &previous {
                self.drop_referrer(pid, id);
            }
        }
    }

    fn drop_referrer(&mut self, pid: &PersistentId, id: EntityId) {
        let now_empty = match self.referrers.get_mut(pid) {
            Some(set) => {
                set.remove(&id);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.referrers.remove(pid);
        }
    }

    /// Iterates over the entities linking to a persistent id, in id order.
    pub fn referrers(&self, pid: &PersistentId) -> impl Iterator<Item = EntityId> + '_ {
        self.referrers
            .get(pid)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Returns the links of an entity.
    #[must_use]
    pub fn links_of(&self, id: EntityId) -> BTreeSet<PersistentId> {
        self.links
            .get(&id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of entities with at least one link.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if no entity has links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Url attribute index: which entity fields mention which urls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlIndex {
    by_url: im::OrdMap<VirtualFileUrl, im::OrdSet<(EntityId, &'static str)>>,
    by_entity: im::OrdMap<(EntityId, &'static str), im::OrdSet<VirtualFileUrl>>,
}

impl UrlIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the urls recorded for one field of an entity.
    pub fn index(&mut self, id: EntityId, field: &'static str, urls: &[VirtualFileUrl]) {
        let key = (id, field);
        if let Some(previous) = self.by_entity.remove(&key) {
            for url in &previous {
                self.drop_entry(url, key);
            }
        }
        if urls.is_empty() {
            return;
        }
        for url in urls {
            tracing::trace!(%id, field, %url, "indexed url");
            self.by_url
                .entry(url.clone())
                .or_insert_with(im::OrdSet::new)
                .insert(key);
        }
        self.by_entity.insert(key, urls.iter().cloned().collect());
    }

    /// Drops every url of an entity.
    pub fn remove(&mut self, id: EntityId) {
        let keys: Vec<_> = self
            .by_entity
            .range((id, "")..)
            .map(|(key, _)| *key)
            .take_while(|(entity, _)| *entity == id)
            .collect();
        for key in keys {
            if let Some(previous) = self.by_entity.remove(&key) {
                for url in &previous {
                    self.drop_entry(url, key);
                }
            }
        }
    }

    fn drop_entry(&mut self, url: &VirtualFileUrl, key: (EntityId, &'static str)) {
        let now_empty = match self.by_url.get_mut(url) {
            Some(set) => {
                set.remove(&key);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_url.remove(url);
        }
    }

    /// Returns the `(entity, field)` pairs that mention exactly this url.
    #[must_use]
    pub fn find(&self, url: &VirtualFileUrl) -> Vec<(EntityId, &'static str)> {
        self.by_url
            .get(url)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the `(entity, field)` pairs that mention this url or any url under it.
    #[must_use]
    pub fn find_under(&self, url: &VirtualFileUrl) -> Vec<(EntityId, &'static str)> {
        let mut found = BTreeSet::new();
        for (candidate, entries) in self.by_url.range(url.clone()..) {
            if !candidate.as_str().starts_with(url.as_str()) {
                break;
            }
            if candidate == url || url.is_ancestor_of(candidate) {
                found.extend(entries.iter().copied());
            }
        }
        found.into_iter().collect()
    }

    /// Returns the urls recorded for one field of an entity.
    #[must_use]
    pub fn urls_of(&self, id: EntityId, field: &'static str) -> Vec<VirtualFileUrl> {
        self.by_entity
            .get(&(id, field))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of distinct indexed urls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    /// Returns true if no url is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}
