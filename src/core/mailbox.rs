//! Per-query duplicate suppression for acceleration structures whose leaves
//! may share primitives.

pub const HASH_MAILBOX_SLOTS: usize = 1024;

pub trait MailboxT {
    /// True the first time `prim` is offered during the current query.
    fn first_visit(&mut self, prim: usize) -> bool;
}

/// One stamp per primitive compared against a ray id. Owned by a single
/// thread and reused across many queries, `begin_query` must be called once
/// per ray.
pub struct StampMailbox {
    stamps: Vec<u32>,
    ray_id: u32,
}

impl StampMailbox {
    pub fn new(prim_count: usize) -> Self {
        Self {
            stamps: vec![0; prim_count],
            ray_id: 0,
        }
    }

    pub fn begin_query(&mut self) {
        self.ray_id = self.ray_id.wrapping_add(1);
        if self.ray_id == 0 {
            self.stamps.iter_mut().for_each(|stamp| *stamp = 0);
            self.ray_id = 1;
        }
    }

    pub fn prim_count(&self) -> usize {
        self.stamps.len()
    }
}

impl MailboxT for StampMailbox {
    fn first_visit(&mut self, prim: usize) -> bool {
        if self.stamps[prim] == self.ray_id {
            false
        } else {
            self.stamps[prim] = self.ray_id;
            true
        }
    }
}

/// Fixed table of primitive ids keyed by id modulo the table size. Lives on
/// the stack of one query; a collision only evicts an entry, which costs a
/// redundant test but never drops one.
pub struct HashMailbox {
    slots: [usize; HASH_MAILBOX_SLOTS],
}

impl HashMailbox {
    pub fn new() -> Self {
        Self {
            slots: [usize::MAX; HASH_MAILBOX_SLOTS],
        }
    }
}

impl Default for HashMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxT for HashMailbox {
    fn first_visit(&mut self, prim: usize) -> bool {
        let slot = &mut self.slots[prim % HASH_MAILBOX_SLOTS];
        if *slot == prim {
            false
        } else {
            *slot = prim;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_mailbox_resets_per_query() {
        let mut mailbox = StampMailbox::new(4);
        mailbox.begin_query();
        assert!(mailbox.first_visit(2));
        assert!(!mailbox.first_visit(2));
        assert!(mailbox.first_visit(3));
        mailbox.begin_query();
        assert!(mailbox.first_visit(2));
    }

    #[test]
    fn stamp_mailbox_survives_id_wrap() {
        let mut mailbox = StampMailbox::new(2);
        mailbox.ray_id = u32::MAX - 1;
        mailbox.begin_query();
        assert!(mailbox.first_visit(0));
        mailbox.begin_query();
        assert_eq!(mailbox.ray_id, 1);
        assert!(mailbox.first_visit(0));
        assert!(mailbox.first_visit(1));
    }

    #[test]
    fn hash_mailbox_collision_only_repeats_work() {
        let mut mailbox = HashMailbox::new();
        assert!(mailbox.first_visit(7));
        assert!(!mailbox.first_visit(7));
        assert!(mailbox.first_visit(7 + HASH_MAILBOX_SLOTS));
        // evicted, tested again
        assert!(mailbox.first_visit(7));
        assert!(mailbox.first_visit(0));
    }
}
