//! WebAssembly run-time stack implementation
//!
//! A single stack holds values, labels and frames, as in the WebAssembly specification
//! abstract machine (4.2.14 Stack). Labels and frames are never mutated once
//! pushed, apart from the locals of the current frame.

use super::{control::Label, frame::Frame, Trap, Value, ValueType};
use std::fmt;

/// One entry of the run-time stack
#[derive(Debug, Clone)]
pub enum Entry {
    Value(Value),
    Label(Label),
    Frame(Frame),
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Entry::Value(value)
    }
}

impl From<Label> for Entry {
    fn from(label: Label) -> Self {
        Entry::Label(label)
    }
}

impl From<Frame> for Entry {
    fn from(frame: Frame) -> Self {
        Entry::Frame(frame)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(value) => write!(f, "{value}"),
            Entry::Label(label) => write!(f, "{label}"),
            Entry::Frame(frame) => write!(f, "{frame}"),
        }
    }
}

/// The WebAssembly run-time stack
#[derive(Debug, Default)]
pub struct Stack {
    entries: Vec<Entry>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Stack { entries: Vec::new() }
    }

    /// Push an entry onto the stack
    pub fn push(&mut self, entry: impl Into<Entry>) {
        self.entries.push(entry.into());
    }

    /// Push multiple values onto the stack
    pub fn push_values(&mut self, values: impl IntoIterator<Item = Value>) {
        self.entries.extend(values.into_iter().map(Entry::Value));
    }

    /// Pop the top entry, whatever it is
    pub fn pop(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    /// Pop a value from the stack
    ///
    /// A label or frame on top means the current block has no operands left.
    pub fn pop_value(&mut self) -> Result<Value, Trap> {
        match self.entries.last() {
            Some(Entry::Value(_)) => match self.entries.pop() {
                Some(Entry::Value(value)) => Ok(value),
                _ => Err(Trap::StackUnderflow),
            },
            _ => Err(Trap::StackUnderflow),
        }
    }

    /// Pop a value and check its type
    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, Trap> {
        let value = self.pop_value()?;
        if value.typ() != expected {
            return Err(Trap::TypeMismatch {
                expected,
                actual: value.typ(),
            });
        }
        Ok(value)
    }

    /// Pop an i32 value
    pub fn pop_i32(&mut self) -> Result<i32, Trap> {
        match self.pop_typed(ValueType::I32)? {
            Value::I32(v) => Ok(v),
            other => Err(Trap::TypeMismatch {
                expected: ValueType::I32,
                actual: other.typ(),
            }),
        }
    }

    /// Pop an i64 value
    pub fn pop_i64(&mut self) -> Result<i64, Trap> {
        match self.pop_typed(ValueType::I64)? {
            Value::I64(v) => Ok(v),
            other => Err(Trap::TypeMismatch {
                expected: ValueType::I64,
                actual: other.typ(),
            }),
        }
    }

    /// Pop an f32 value
    pub fn pop_f32(&mut self) -> Result<f32, Trap> {
        match self.pop_typed(ValueType::F32)? {
            Value::F32(v) => Ok(v),
            other => Err(Trap::TypeMismatch {
                expected: ValueType::F32,
                actual: other.typ(),
            }),
        }
    }

    /// Pop an f64 value
    pub fn pop_f64(&mut self) -> Result<f64, Trap> {
        match self.pop_typed(ValueType::F64)? {
            Value::F64(v) => Ok(v),
            other => Err(Trap::TypeMismatch {
                expected: ValueType::F64,
                actual: other.typ(),
            }),
        }
    }

    /// Pop `count` values, returned in stack order (deepest first)
    pub fn pop_values(&mut self, count: usize) -> Result<Vec<Value>, Trap> {
        self.ensure_values(count)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.pop_value()?);
        }
        values.reverse();
        Ok(values)
    }

    /// Check that the top `count` entries are all values
    pub fn ensure_values(&self, count: usize) -> Result<(), Trap> {
        if count > self.entries.len() {
            return Err(Trap::StackUnderflow);
        }
        let top = &self.entries[self.entries.len() - count..];
        if top.iter().all(|entry| matches!(entry, Entry::Value(_))) {
            Ok(())
        } else {
            Err(Trap::StackUnderflow)
        }
    }

    /// Peek at the top entry without popping
    pub fn peek(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Entry at `index`, counting from the bottom
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Entry at `depth` below the top (0 = top)
    pub fn from_top(&self, depth: usize) -> Option<&Entry> {
        let len = self.entries.len();
        if depth >= len {
            return None;
        }
        self.entries.get(len - 1 - depth)
    }

    /// The frame stored at `index`, if that entry is a frame
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        match self.entries.get(index) {
            Some(Entry::Frame(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Mutable access to the frame stored at `index`
    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        match self.entries.get_mut(index) {
            Some(Entry::Frame(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Get the nth label from the top (0 = innermost)
    ///
    /// From the WebAssembly specification (4.4.8 br l):
    /// > "Let L be the l-th label appearing on the stack, starting from the top and counting from zero"
    ///
    /// Only labels are counted; values and frames are skipped.
    pub fn nth_label(&self, n: usize) -> Option<Label> {
        self.nth_label_position(n).map(|(_, label)| label)
    }

    /// Like [`Stack::nth_label`], also returning the label's index in the stack
    pub fn nth_label_position(&self, n: usize) -> Option<(usize, Label)> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(index, entry)| match entry {
                Entry::Label(label) => Some((index, *label)),
                _ => None,
            })
            .nth(n)
    }

    /// Truncate the stack to `height` entries, keeping the top `keep` entries
    ///
    /// The kept entries are moved down to sit directly on top of the truncated
    /// stack. Callers check with [`Stack::ensure_values`] that they are values.
    pub fn unwind(&mut self, height: usize, keep: usize) {
        let available = self.entries.len().saturating_sub(height);
        let keep = keep.min(available);
        let kept = self.entries.split_off(self.entries.len() - keep);
        self.entries.truncate(height);
        self.entries.extend(kept);
    }

    /// Get the number of entries on the stack
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of consecutive values on top of the innermost label or frame
    pub fn top_value_count(&self) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|entry| matches!(entry, Entry::Value(_)))
            .count()
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate().rev() {
            writeln!(f, "{index:>4}: {entry}")?;
        }
        Ok(())
    }
}
