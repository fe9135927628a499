#[inline]
pub fn wrap_add(index: usize, addend: usize, capacity: usize) -> usize {
    debug_assert!(index < capacity);
    debug_assert!(addend <= capacity);
    (index + addend) % capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_capacity() {
        assert_eq!(wrap_add(0, 1, 4), 1);
        assert_eq!(wrap_add(3, 1, 4), 0);
        assert_eq!(wrap_add(2, 4, 4), 2);
        assert_eq!(wrap_add(0, 1, 1), 0);
    }
}
