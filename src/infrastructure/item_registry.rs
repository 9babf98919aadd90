// Item registry backed by the configured item list
use crate::application::item_registry::ItemRegistry;
use crate::domain::state::ItemType;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticItemRegistry {
    items: HashMap<String, ItemType>,
}

impl StaticItemRegistry {
    pub fn new(items: impl IntoIterator<Item = (String, ItemType)>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl ItemRegistry for StaticItemRegistry {
    fn item_type(&self, item_key: &str) -> Option<ItemType> {
        self.items.get(item_key).copied()
    }
}
