//! Input histories and output schedules.
//!
//! A [`History`] is the not-yet-processed input of the scheduler. It is
//! consumed from the front and accepts insertions at any position, which is
//! how deferred operations are replayed ahead of later input.
//!
//! A [`Schedule`] is the append-only output of the scheduler.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Write};

use crate::operation::Operation;

/// Ordered, mutable sequence of operations still to be scheduled.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct History {
    operations: VecDeque<Operation>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            operations: VecDeque::new(),
        }
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push_back(operation);
    }

    /// Removes and returns the next operation to schedule.
    pub fn pop_front(&mut self) -> Option<Operation> {
        self.operations.pop_front()
    }

    /// Inserts `operations` so that the first of them lands at `index`,
    /// keeping their relative order. An `index` past the end appends.
    pub fn insert_all(&mut self, index: usize, operations: impl IntoIterator<Item = Operation>) {
        let index = index.min(self.operations.len());
        let tail = self.operations.split_off(index);
        self.operations.extend(operations);
        self.operations.extend(tail);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl From<Vec<Operation>> for History {
    fn from(operations: Vec<Operation>) -> Self {
        Self {
            operations: operations.into(),
        }
    }
}

impl FromIterator<Operation> for History {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl Display for History {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        f.write_str(&format_operations(self.operations.iter()))
    }
}

/// Append-only sequence of scheduled events.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Schedule {
    events: Vec<Operation>,
}

impl Schedule {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: Operation) {
        self.events.push(event);
    }

    #[must_use]
    pub fn events(&self) -> &[Operation] {
        &self.events
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Operation> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Rendered tokens of every event, in order.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.events.iter().map(alloc::string::ToString::to_string).collect()
    }

    #[must_use]
    pub fn into_events(self) -> Vec<Operation> {
        self.events
    }
}

impl Extend<Operation> for Schedule {
    fn extend<I: IntoIterator<Item = Operation>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Operation;
    type IntoIter = core::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        f.write_str(&format_operations(&self.events))
    }
}

/// Format operations as their tokens separated by single spaces.
#[must_use]
pub fn format_operations<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> String {
    let mut output = String::new();
    for (i, operation) in operations.into_iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        let _ = write!(output, "{operation}");
    }
    output
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec;

    use super::*;

    #[test]
    fn test_insert_all_at_front() {
        let mut history = History::from(vec![Operation::read(1, "x"), Operation::commit(1)]);
        history.insert_all(0, vec![Operation::write(2, "y"), Operation::commit(2)]);
        assert_eq!(format!("{history}"), "w_2(y) c_2 r_1(x) c_1");
    }

    #[test]
    fn test_insert_all_in_the_middle_and_past_end() {
        let mut history = History::from(vec![Operation::read(1, "x"), Operation::commit(1)]);
        history.insert_all(1, vec![Operation::write(2, "y")]);
        history.insert_all(99, vec![Operation::commit(2)]);
        assert_eq!(format!("{history}"), "r_1(x) w_2(y) c_1 c_2");
    }

    #[test]
    fn test_insert_nothing_is_noop() {
        let mut history = History::from(vec![Operation::read(1, "x")]);
        history.insert_all(0, Vec::new());
        assert_eq!(history.len(), 1);
        assert_eq!(history.pop_front(), Some(Operation::read(1, "x")));
        assert!(history.is_empty());
    }

    #[test]
    fn test_schedule_display() {
        let mut schedule = Schedule::new();
        assert_eq!(format!("{schedule}"), "");
        schedule.push(Operation::write(1, "x"));
        schedule.push(Operation::commit(1));
        assert_eq!(format!("{schedule}"), "w_1(x) c_1");
        assert_eq!(schedule.tokens(), vec!["w_1(x)", "c_1"]);
    }
}
