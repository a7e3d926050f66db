use crate::num::{NumError, ScriptNum};
use crate::value::{ScriptValue, cast_to_bool};
use std::fmt::Display;
use std::ops::Deref;

/// Stack error type.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error("stack underflow")]
    Underflow,
    #[error(transparent)]
    Num(#[from] NumError),
}

/// Stack for the script execution.
pub type Stack = GenericStack<ScriptValue>;

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.data.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "]")
    }
}

type Result<T> = std::result::Result<T, StackError>;

/// A stack used for managing script execution data with various operations.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct GenericStack<T = ScriptValue> {
    data: Vec<T>,
    require_minimal: bool,
}

#[cfg(test)]
impl<T> From<Vec<T>> for GenericStack<T> {
    fn from(data: Vec<T>) -> Self {
        Self {
            data,
            require_minimal: false,
        }
    }
}

impl<T> Deref for GenericStack<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> GenericStack<T> {
    #[inline]
    pub fn new(require_minimal: bool) -> Self {
        Self {
            data: Vec::new(),
            require_minimal,
        }
    }

    pub fn with_data(data: Vec<T>) -> Self {
        Self {
            data,
            require_minimal: false,
        }
    }

    /// Whether numbers read from this stack must be minimally encoded.
    pub fn require_minimal(&self) -> bool {
        self.require_minimal
    }

    pub fn set_require_minimal(&mut self, require_minimal: bool) {
        self.require_minimal = require_minimal;
    }

    pub fn into_inner(self) -> Vec<T> {
        self.data
    }

    // Ensure there are at least `n` elements on the stack.
    #[inline]
    pub fn require(&self, len: usize) -> Result<()> {
        if self.data.len() < len {
            return Err(StackError::Underflow);
        }
        Ok(())
    }

    /// Returns the last element of the stack.
    #[inline]
    pub fn last(&self) -> Result<&T> {
        self.data.last().ok_or(StackError::Underflow)
    }

    /// Removes and returns the last element of the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<T> {
        self.data.pop().ok_or(StackError::Underflow)
    }

    /// Push an element onto the stack.
    #[inline]
    pub fn push(&mut self, value: T) -> &mut Self {
        self.data.push(value);
        self
    }

    /// Returns the element at the specified position from the top of the stack.
    ///
    /// `self.top(0)` is equalant to `self.last()`.
    #[inline]
    pub fn top(&self, i: usize) -> Result<&T> {
        let pos = i + 1;
        self.require(pos)?;
        Ok(&self.data[self.data.len() - pos])
    }

    /// Pops one operand and pushes `f(operand)`.
    pub fn unary_operation<E, F>(&mut self, f: F) -> std::result::Result<(), E>
    where
        E: From<StackError>,
        F: FnOnce(T) -> std::result::Result<T, E>,
    {
        let a = self.pop()?;
        let result = f(a)?;
        self.push(result);
        Ok(())
    }

    /// Pops two operands and pushes `f(a, b)`, `b` being the former top.
    pub fn binary_operation<E, F>(&mut self, f: F) -> std::result::Result<(), E>
    where
        E: From<StackError>,
        F: FnOnce(T, T) -> std::result::Result<T, E>,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = f(a, b)?;
        self.push(result);
        Ok(())
    }

    /// Pops three operands and pushes `f(a, b, c)`, `c` being the former top.
    pub fn ternary_operation<E, F>(&mut self, f: F) -> std::result::Result<(), E>
    where
        E: From<StackError>,
        F: FnOnce(T, T, T) -> std::result::Result<T, E>,
    {
        let c = self.pop()?;
        let b = self.pop()?;
        let a = self.pop()?;
        let result = f(a, b, c)?;
        self.push(result);
        Ok(())
    }

    /// Removes the element at the given index.
    #[inline]
    pub fn remove(&mut self, i: usize) -> Result<T> {
        let pos = i + 1;
        self.require(pos)?;
        let to_remove = self.data.len() - pos;
        Ok(self.data.remove(to_remove))
    }

    /// Removes the top `n` stack items.
    #[inline]
    pub fn drop(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.data.truncate(self.data.len() - n);
        Ok(())
    }

    /// Duplicates the top N items on the stack.
    ///
    /// dup(1): [x1 x2] -> [x1 x2 x2]
    /// dup(2): [x1 x2] -> [x1 x2 x1 x2]
    #[inline]
    pub fn dup(&mut self, n: usize) -> Result<()>
    where
        T: Clone,
    {
        self.require(n)?;
        let len = self.data.len();
        self.data.extend_from_within(len - n..);
        Ok(())
    }

    /// Copies N items N items back to the top of the stack.
    ///
    /// over(1): [... x1 x2 x3] -> [... x1 x2 x3 x2]
    /// over(2): [... x1 x2 x3 x4] -> [... x1 x2 x3 x4 x1 x2]
    #[inline]
    pub fn over(&mut self, n: usize) -> Result<()>
    where
        T: Clone,
    {
        let count = n * 2;
        self.require(count)?;
        let len = self.data.len();
        self.data.extend_from_within(len - count..len - count + n);
        Ok(())
    }

    /// Rotates the top 3N items on the stack to the left N times.
    ///
    /// - rot(1): [x1 x2 x3] -> [x2 x3 x1]
    /// - rot(2): [x1 x2 x3 x4 x5 x6] -> [x3 x4 x5 x6 x1 x2]
    #[inline]
    pub fn rot(&mut self, n: usize) -> Result<()> {
        let count = n * 3;
        self.require(count)?;
        let len = self.data.len();
        self.data[len - count..].rotate_left(n);
        Ok(())
    }

    // Swaps the top N items on the stack with those below them.
    //
    // - swap(1): [x1 x2] -> [x2 x1]
    // - swap(2): [x1 x2 x3 x4] -> [x3 x4 x1 x2]
    #[inline]
    pub fn swap(&mut self, n: usize) -> Result<()> {
        let count = n * 2;
        self.require(count)?;
        let len = self.data.len();
        let (lower, upper) = self.data.split_at_mut(len - n);
        lower[len - count..].swap_with_slice(upper);
        Ok(())
    }

    /// Removes the second-to-top stack item.
    ///
    /// nip: [x1 x2 x3] -> [x1 x3]
    #[inline]
    pub fn nip(&mut self) -> Result<()> {
        self.require(2)?;
        let len = self.data.len();
        self.data.swap_remove(len - 2);
        Ok(())
    }

    // Copies the item at the top of the stack and inserts it before the 2nd
    // to top item.
    //
    // [... x1 x2] -> [... x2 x1 x2]
    #[inline]
    pub fn tuck(&mut self) -> Result<()>
    where
        T: Clone,
    {
        self.require(2)?;
        let len = self.data.len();
        let v = self.data[len - 1].clone();
        self.data.insert(len - 2, v);
        Ok(())
    }
}

impl<T: AsRef<[u8]>> GenericStack<T> {
    /// Pops a number of at most four bytes.
    #[inline]
    pub fn pop_num(&mut self) -> Result<ScriptNum> {
        let minimal = self.require_minimal;
        Ok(ScriptNum::from_bytes(self.pop()?.as_ref(), minimal, None)?)
    }

    /// Reads the top element as a number of at most `max_size` bytes,
    /// leaving it on the stack.
    #[inline]
    pub fn peek_num(&self, max_size: usize) -> Result<ScriptNum> {
        Ok(ScriptNum::from_bytes(
            self.last()?.as_ref(),
            self.require_minimal,
            Some(max_size),
        )?)
    }

    /// Peeks the top element and converts it to a boolean.
    #[inline]
    pub fn peek_bool(&self) -> Result<bool> {
        Ok(cast_to_bool(self.last()?.as_ref()))
    }

    /// Pops the top element and converts it to a boolean.
    #[inline]
    pub fn pop_bool(&mut self) -> Result<bool> {
        Ok(cast_to_bool(self.pop()?.as_ref()))
    }
}

impl Stack {
    /// Pushes the minimal encoding of `num`.
    #[inline]
    pub fn push_num(&mut self, num: impl Into<ScriptNum>) -> &mut Self {
        self.push(ScriptValue::from(num.into()))
    }

    #[inline]
    pub fn push_bool(&mut self, boolean: bool) -> &mut Self {
        self.push(ScriptValue::from_bool(boolean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestStack = GenericStack<u8>;

    #[test]
    fn test_stack_require() {
        let stack: TestStack = vec![].into();
        assert_eq!(stack.require(0), Ok(()));
        assert_eq!(stack.require(1), Err(StackError::Underflow));
        let stack: TestStack = vec![0, 5].into();
        assert_eq!(stack.require(2), Ok(()));
        assert_eq!(stack.require(3), Err(StackError::Underflow));
    }

    #[test]
    fn test_pop_on_empty_stack_underflows() {
        let mut stack = Stack::default();
        assert_eq!(stack.pop(), Err(StackError::Underflow));
        assert_eq!(stack.pop_num(), Err(StackError::Underflow));
        assert_eq!(stack.pop_bool(), Err(StackError::Underflow));
        assert_eq!(stack.peek_num(5), Err(StackError::Underflow));
        assert!(stack.is_empty());

        let mut stack: TestStack = vec![0, 5].into();
        assert_eq!(stack.pop(), Ok(5));
        assert_eq!(stack.pop(), Ok(0));
        assert_eq!(stack.pop(), Err(StackError::Underflow));
    }

    #[test]
    fn test_stack_top() {
        let stack: TestStack = vec![0, 5].into();
        assert_eq!(stack.top(0), Ok(&5));
        assert_eq!(stack.top(1), Ok(&0));
        assert_eq!(stack.top(2), Err(StackError::Underflow));
        assert_eq!(stack.last(), Ok(&5));
    }

    #[test]
    fn test_stack_remove() {
        let mut stack: TestStack = vec![0, 5].into();
        assert_eq!(stack.remove(1), Ok(0));
        assert_eq!(stack, vec![5].into());
        assert_eq!(stack.remove(1), Err(StackError::Underflow));
        assert_eq!(stack.remove(0), Ok(5));
        assert_eq!(stack, vec![].into());
    }

    #[test]
    fn test_stack_drop() {
        let mut stack: TestStack = vec![0, 5].into();
        assert_eq!(stack.drop(0), Ok(()));
        assert_eq!(stack.drop(3), Err(StackError::Underflow));
        assert_eq!(stack, vec![0, 5].into());
        assert_eq!(stack.drop(1), Ok(()));
        assert_eq!(stack, vec![0].into());
    }

    #[test]
    fn test_stack_dup_and_over() {
        let mut stack: TestStack = vec![0, 1].into();
        assert_eq!(stack.dup(3), Err(StackError::Underflow));
        assert_eq!(stack.dup(2), Ok(()));
        assert_eq!(stack, vec![0, 1, 0, 1].into());
        assert_eq!(stack.over(2), Ok(()));
        assert_eq!(stack, vec![0, 1, 0, 1, 0, 1].into());
        assert_eq!(stack.over(1), Ok(()));
        assert_eq!(stack, vec![0, 1, 0, 1, 0, 1, 0].into());
    }

    #[test]
    fn test_stack_rot() {
        let mut stack: TestStack = vec![0, 1, 2, 3].into();
        assert_eq!(stack.rot(1), Ok(()));
        assert_eq!(stack, vec![0, 2, 3, 1].into());
        let mut stack: TestStack = vec![0, 1, 2, 3, 4, 5].into();
        assert_eq!(stack.rot(3), Err(StackError::Underflow));
        assert_eq!(stack.rot(2), Ok(()));
        assert_eq!(stack, vec![2, 3, 4, 5, 0, 1].into());
    }

    #[test]
    fn test_stack_swap() {
        let mut stack: TestStack = vec![0, 1, 2, 3].into();
        assert_eq!(stack.swap(1), Ok(()));
        assert_eq!(stack, vec![0, 1, 3, 2].into());
        assert_eq!(stack.swap(2), Ok(()));
        assert_eq!(stack, vec![3, 2, 0, 1].into());
        assert_eq!(stack.swap(3), Err(StackError::Underflow));
    }

    #[test]
    fn test_stack_nip_and_tuck() {
        let mut stack: TestStack = vec![0, 1, 2, 3].into();
        assert_eq!(stack.nip(), Ok(()));
        assert_eq!(stack, vec![0, 1, 3].into());
        assert_eq!(stack.tuck(), Ok(()));
        assert_eq!(stack, vec![0, 3, 1, 3].into());
        let mut stack: TestStack = vec![0].into();
        assert_eq!(stack.nip(), Err(StackError::Underflow));
        assert_eq!(stack.tuck(), Err(StackError::Underflow));
    }

    #[test]
    fn test_operation_helpers_pass_operands_in_push_order() {
        let mut stack: TestStack = vec![10, 3].into();
        stack
            .binary_operation(|a, b| Ok::<_, StackError>(a - b))
            .unwrap();
        assert_eq!(stack, vec![7].into());

        let mut stack: TestStack = vec![1, 2, 3].into();
        stack
            .ternary_operation(|a, b, c| Ok::<_, StackError>(a * 100 + b * 10 + c))
            .unwrap();
        assert_eq!(stack, vec![123].into());

        let mut stack: TestStack = vec![4].into();
        stack
            .unary_operation(|a| Ok::<_, StackError>(a + 1))
            .unwrap();
        assert_eq!(stack, vec![5].into());

        let mut stack: TestStack = vec![4].into();
        assert_eq!(
            stack.binary_operation(|a, b| Ok::<_, StackError>(a + b)),
            Err(StackError::Underflow)
        );
    }

    #[test]
    fn test_numbers_respect_minimal_flag() {
        let mut stack = Stack::with_data(vec![ScriptValue::from(vec![0x01, 0x00])]);
        assert_eq!(stack.peek_num(4), Ok(ScriptNum::from(1)));
        stack.set_require_minimal(true);
        assert_eq!(
            stack.pop_num(),
            Err(StackError::Num(NumError::NotMinimallyEncoded))
        );

        let mut stack = Stack::default();
        stack.push_num(-1).push_bool(true).push_bool(false);
        assert_eq!(stack.pop_bool(), Ok(false));
        assert_eq!(stack.pop_bool(), Ok(true));
        assert_eq!(stack.pop_num(), Ok(ScriptNum::from(-1)));
    }
}
