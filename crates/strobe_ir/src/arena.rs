//! Dense, index-addressed storage for netlist entities.

use std::marker::PhantomData;
use std::ops::Index;

/// Conversion between an opaque ID type and its raw `u32` index.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An append-only vector addressed by a typed ID.
///
/// Items are never removed or reordered, so an ID handed out by
/// [`alloc`](Arena::alloc) stays valid for the arena's lifetime.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the ID the next [`alloc`](Arena::alloc) call will hand out.
    pub fn next_id(&self) -> I {
        I::from_raw(self.items.len() as u32)
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// Returns the item for `id`, or `None` if the ID was not allocated here.
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Mutable variant of [`get`](Arena::get).
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Returns `true` if `id` addresses an allocated item.
    pub fn contains(&self, id: I) -> bool {
        (id.as_raw() as usize) < self.items.len()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over all allocated IDs in order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        (0..self.items.len() as u32).map(I::from_raw)
    }

    /// Iterates over items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        let a = arena.alloc("clk");
        let b = arena.alloc("rst");
        assert_eq!(arena[a], "clk");
        assert_eq!(arena[b], "rst");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        arena.alloc(1);
        assert!(arena.get(SignalId::from_raw(1)).is_none());
        assert!(!arena.contains(SignalId::from_raw(1)));
        assert!(arena.contains(SignalId::from_raw(0)));
    }

    #[test]
    fn next_id_predicts_alloc() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let predicted = arena.next_id();
        assert_eq!(arena.alloc(9), predicted);
    }

    #[test]
    fn ids_and_iter_are_sequential() {
        let mut arena: Arena<SignalId, char> = Arena::new();
        arena.alloc('a');
        arena.alloc('b');
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
        let items: Vec<char> = arena.iter().map(|(_, c)| *c).collect();
        assert_eq!(items, vec!['a', 'b']);
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let id = arena.alloc(1);
        if let Some(v) = arena.get_mut(id) {
            *v = 5;
        }
        assert_eq!(arena[id], 5);
    }
}
