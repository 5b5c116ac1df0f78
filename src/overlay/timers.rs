//! Deferred work queue
//!
//! The engine never sleeps: tasks are queued with a due time and fired
//! when the host passes a clock value at or past it.

/// Handle of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    due: u64,
    task: T,
}

/// Single-threaded timer queue
#[derive(Debug)]
pub struct Timers<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Queue `task` to fire at `due`
    pub fn schedule(&mut self, due: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, due, task });
        id
    }

    /// Cancel a task, returning it if it had not fired
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos).task)
    }

    /// Remove the earliest task due at or before `now`
    ///
    /// Tasks with equal due times fire in scheduling order.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, T)> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.id.0))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(pos);
        Some((entry.due, entry.task))
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}
