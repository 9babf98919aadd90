// Item lookup used to validate states before they are stored
use crate::domain::state::ItemType;

pub trait ItemRegistry: Send + Sync {
    /// The type of a known item, `None` for unknown items
    fn item_type(&self, item_key: &str) -> Option<ItemType>;
}
