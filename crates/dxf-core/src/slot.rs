//! Capacity ledger deciding which tasks may occupy the node.
//!
//! Capacity is counted in abstract CPU slots, one per unit of task concurrency.
//! Memory is granted in proportion to the CPU share and never admitted on its own.
use dxf_model::{Slots, Task, TaskId};

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Enough idle slots; start right away.
    Admit,
    /// Evicting exactly these lower-ranked tasks frees enough slots.
    Preempt(Vec<Task>),
    /// Not enough slots even after evicting every lower-ranked task.
    Deny,
}

/// Reservation bookkeeping over a fixed pool of slots.
///
/// Not synchronized: the owning manager calls it under its own lock.
#[derive(Debug)]
pub struct SlotManager {
    capacity: Slots,
    used: Slots,
    /// Least important first, so eviction scans from the front.
    reserved: Vec<Task>,
}

impl SlotManager {
    pub fn new(capacity: Slots) -> Self {
        Self {
            capacity,
            used: 0,
            reserved: Vec::new(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> Slots {
        self.capacity
    }

    #[inline]
    pub fn available_slots(&self) -> Slots {
        self.capacity - self.used
    }

    pub fn is_reserved(&self, id: TaskId) -> bool {
        self.reserved.iter().any(|t| t.id == id)
    }

    /// Reserved tasks, least important first.
    pub fn reserved(&self) -> &[Task] {
        &self.reserved
    }

    /// Decide whether `task` fits, possibly by evicting lower-ranked tasks.
    ///
    /// The eviction set is the shortest least-important-first prefix of
    /// reservations that, together with the idle slots, covers the need.
    pub fn can_alloc(&self, task: &Task) -> Admission {
        let idle = self.available_slots();
        if idle >= task.concurrency {
            return Admission::Admit;
        }

        let mut freed = 0;
        let mut victims = Vec::new();
        for reserved in &self.reserved {
            if !task.outranks(reserved) {
                break;
            }
            freed += reserved.concurrency;
            victims.push(reserved.clone());
            if idle + freed >= task.concurrency {
                return Admission::Preempt(victims);
            }
        }
        Admission::Deny
    }

    /// Reserve slots for `task`.
    ///
    /// Returns `false` and changes nothing if the task is already reserved
    /// or the reservation would exceed the capacity.
    pub fn alloc(&mut self, task: &Task) -> bool {
        if self.is_reserved(task.id) || task.concurrency > self.available_slots() {
            return false;
        }
        let pos = self
            .reserved
            .partition_point(|t| t.rank_cmp(task).is_gt());
        self.reserved.insert(pos, task.clone());
        self.used += task.concurrency;
        true
    }

    /// Release the reservation of `id`; a no-op if there is none.
    pub fn free(&mut self, id: TaskId) {
        if let Some(pos) = self.reserved.iter().position(|t| t.id == id) {
            let task = self.reserved.remove(pos);
            self.used -= task.concurrency;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, priority: i32, concurrency: Slots) -> Task {
        Task::new(id, "test", concurrency).with_priority(priority)
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id.get()).collect()
    }

    #[test]
    fn admits_when_idle_covers_need() {
        let mut sm = SlotManager::new(8);
        assert!(sm.alloc(&task(1, 1, 4)));

        assert_eq!(sm.can_alloc(&task(2, 0, 4)), Admission::Admit);
        assert_eq!(sm.available_slots(), 4);
    }

    #[test]
    fn preempts_lower_priority_task() {
        let mut sm = SlotManager::new(8);
        let a = task(1, 1, 6);
        assert!(sm.alloc(&a));

        let b = task(2, 2, 4);
        assert_eq!(sm.can_alloc(&b), Admission::Preempt(vec![a]));
        // checking does not change state
        assert_eq!(sm.available_slots(), 2);
    }

    #[test]
    fn evicts_least_important_first_and_stops_at_minimal_prefix() {
        let mut sm = SlotManager::new(10);
        assert!(sm.alloc(&task(1, 3, 3)));
        assert!(sm.alloc(&task(2, 1, 3)));
        assert!(sm.alloc(&task(3, 2, 3)));
        assert_eq!(ids(sm.reserved()), vec![2, 3, 1]);

        // idle 1 + task 2 (3) = 4 >= 4
        match sm.can_alloc(&task(4, 5, 4)) {
            Admission::Preempt(v) => assert_eq!(ids(&v), vec![2]),
            other => panic!("unexpected {other:?}"),
        }
        // idle 1 + 3 + 3 = 7 >= 6
        match sm.can_alloc(&task(5, 5, 6)) {
            Admission::Preempt(v) => assert_eq!(ids(&v), vec![2, 3]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn never_evicts_equal_or_higher_ranked_tasks() {
        let mut sm = SlotManager::new(8);
        assert!(sm.alloc(&task(1, 2, 3)));
        assert!(sm.alloc(&task(2, 5, 4)));

        // only task 1 ranks below; 1 + 3 < 6
        assert_eq!(sm.can_alloc(&task(3, 3, 6)), Admission::Deny);

        // same priority, larger id ranks lower than the reserved task
        assert_eq!(sm.can_alloc(&task(4, 2, 4)), Admission::Deny);
    }

    #[test]
    fn deny_leaves_state_untouched() {
        let mut sm = SlotManager::new(4);
        assert!(sm.alloc(&task(1, 9, 4)));

        assert_eq!(sm.can_alloc(&task(2, 1, 1)), Admission::Deny);
        assert_eq!(ids(sm.reserved()), vec![1]);
        assert_eq!(sm.available_slots(), 0);
    }

    #[test]
    fn oversized_request_is_denied() {
        let sm = SlotManager::new(4);
        assert_eq!(sm.can_alloc(&task(1, 100, 5)), Admission::Deny);
    }

    #[test]
    fn alloc_refuses_over_capacity_and_duplicates() {
        let mut sm = SlotManager::new(4);
        let a = task(1, 0, 3);
        assert!(sm.alloc(&a));
        assert!(!sm.alloc(&a));
        assert!(!sm.alloc(&task(2, 0, 2)));
        assert_eq!(sm.available_slots(), 1);
    }

    #[test]
    fn free_is_idempotent() {
        let mut sm = SlotManager::new(4);
        assert!(sm.alloc(&task(1, 0, 3)));

        sm.free(TaskId::new(1));
        sm.free(TaskId::new(1));
        sm.free(TaskId::new(42));

        assert_eq!(sm.available_slots(), 4);
        assert!(sm.reserved().is_empty());
    }

    #[test]
    fn reservations_never_exceed_capacity() {
        let mut sm = SlotManager::new(7);
        for id in 0..20 {
            let t = task(id, (id % 5) as i32, (id % 4 + 1) as Slots);
            if sm.can_alloc(&t) == Admission::Admit {
                assert!(sm.alloc(&t));
            }
            if id % 3 == 0 {
                sm.free(TaskId::new(id - 1));
            }
            let used: Slots = sm.reserved().iter().map(|t| t.concurrency).sum();
            assert!(used <= sm.capacity());
            assert_eq!(used, sm.capacity() - sm.available_slots());
        }
    }
}
