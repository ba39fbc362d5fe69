use crate::constants::DEFAULT_PILL;
use crate::pills::pill::Pill;

/// Named pill definitions, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PillCatalog {
    pills: Vec<Pill>,
}

impl PillCatalog {
    pub fn new(pills: Vec<Pill>) -> Self {
        let mut catalog = Self::default();
        for pill in pills {
            catalog.insert(pill);
        }
        catalog
    }

    /// Inserts a pill, replacing any previous definition with the same name.
    pub fn insert(&mut self, pill: Pill) {
        match self.pills.iter_mut().find(|existing| existing.name == pill.name) {
            Some(existing) => *existing = pill,
            None => self.pills.push(pill),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Pill> {
        self.pills.iter().find(|pill| pill.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn has_default(&self) -> bool {
        self.contains(DEFAULT_PILL)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pill> {
        self.pills.iter()
    }

    pub fn len(&self) -> usize {
        self.pills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pills.is_empty()
    }
}
