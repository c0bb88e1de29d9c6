//! Player components: identity, chat, inventory and open containers

use hecs::Entity;

use crate::components::Hand;
use crate::item::ItemStack;
use crate::species::Species;

/// Main inventory size, hotbar included
pub const INVENTORY_SLOTS: usize = 36;
pub const HOTBAR_SLOTS: usize = 9;
/// Entity interaction reach without a marked target
pub const DEFAULT_INTERACTION_RANGE: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct PlayerData {
    pub name: String,
    pub sneaking: bool,
    /// Chat messages sent to this player, oldest first
    pub messages: Vec<String>,
    pub open_container: Option<Container>,
    /// Creatures this player placed from items, oldest first
    pub placed: Vec<Entity>,
    /// Entity marked while sneaking
    pub target: Option<Entity>,
    pub interaction_range: f64,
}

impl PlayerData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sneaking: false,
            messages: Vec::new(),
            open_container: None,
            placed: Vec::new(),
            target: None,
            interaction_range: DEFAULT_INTERACTION_RANGE,
        }
    }

    pub fn send_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

/// Container UI a player has open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub title: String,
    pub rows: u8,
    pub owner: Option<Entity>,
}

impl Container {
    /// Six-row chest showing a tamed creature
    pub fn for_creature(creature: Entity, species: &Species) -> Self {
        Self {
            title: species.name().to_string(),
            rows: 6,
            owner: Some(creature),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    held_slot: usize,
    off_hand: Option<ItemStack>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; INVENTORY_SLOTS],
            held_slot: 0,
            off_hand: None,
        }
    }

    /// Put an item in the first free slot, hotbar first.
    /// Hands the item back when the inventory is full.
    pub fn add_item_stack(&mut self, item: ItemStack) -> Result<usize, ItemStack> {
        match self.slots.iter().position(Option::is_none) {
            Some(slot) => {
                self.slots[slot] = Some(item);
                Ok(slot)
            }
            None => Err(item),
        }
    }

    pub fn item_in_hand(&self, hand: Hand) -> Option<&ItemStack> {
        match hand {
            Hand::Main => self.slots[self.held_slot].as_ref(),
            Hand::Off => self.off_hand.as_ref(),
        }
    }

    /// Replace the item in a hand, returning what was there
    pub fn set_item_in_hand(&mut self, hand: Hand, item: Option<ItemStack>) -> Option<ItemStack> {
        match hand {
            Hand::Main => std::mem::replace(&mut self.slots[self.held_slot], item),
            Hand::Off => std::mem::replace(&mut self.off_hand, item),
        }
    }

    /// Select a hotbar slot; out-of-range slots are ignored
    pub fn set_held_slot(&mut self, slot: usize) {
        if slot < HOTBAR_SLOTS {
            self.held_slot = slot;
        }
    }

    pub fn held_slot(&self) -> usize {
        self.held_slot
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemStack> + '_ {
        self.slots.iter().flatten().chain(self.off_hand.iter())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone() -> ItemStack {
        ItemStack::new("minecraft:stone")
    }

    #[test]
    fn test_add_fills_hotbar_first() {
        let mut inventory = Inventory::new();
        assert_eq!(inventory.add_item_stack(stone()), Ok(0));
        assert_eq!(inventory.add_item_stack(stone()), Ok(1));
        assert_eq!(inventory.item_in_hand(Hand::Main), Some(&stone()));
    }

    #[test]
    fn test_full_inventory_returns_item() {
        let mut inventory = Inventory::new();
        for _ in 0..INVENTORY_SLOTS {
            inventory.add_item_stack(stone()).unwrap();
        }
        assert!(inventory.is_full());
        assert_eq!(inventory.add_item_stack(stone()), Err(stone()));
    }

    #[test]
    fn test_swap_held_item() {
        let mut inventory = Inventory::new();
        inventory.set_held_slot(4);
        assert_eq!(inventory.set_item_in_hand(Hand::Main, Some(stone())), None);
        assert_eq!(inventory.set_item_in_hand(Hand::Main, None), Some(stone()));
        assert_eq!(inventory.items().count(), 0);

        inventory.set_held_slot(20);
        assert_eq!(inventory.held_slot(), 4);
    }
}
