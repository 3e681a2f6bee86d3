//! Symmetric distance matrix with packed upper-triangle storage.

/// A square symmetric matrix of pairwise distances.
///
/// Only the strict upper triangle is stored; reads mirror the stored value by
/// symmetry and the diagonal is always zero. The matrix is resized to the
/// scratch population of every iteration - when the new size fits into the
/// existing allocation no reallocation happens.
#[derive(Clone, Debug)]
pub struct SymmetricMatrix {
  size: usize,
  cells: Vec<f64>,
}

impl SymmetricMatrix {
  /// Creates a zeroed `size` x `size` matrix.
  pub fn new(size: usize) -> Self {
    Self {
      size,
      cells: vec![0.0; Self::cell_count(size)],
    }
  }

  fn cell_count(size: usize) -> usize {
    size * size.saturating_sub(1) / 2
  }

  // offset of (i, j) with i < j in the packed upper triangle
  fn offset(&self, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < self.size);
    i * self.size - i * (i + 1) / 2 + j - i - 1
  }

  /// Number of rows (and columns).
  pub fn size(&self) -> usize {
    self.size
  }

  /// Resizes the matrix to `size` rows and zeroes every cell, reusing the
  /// existing allocation when it is large enough.
  pub fn resize(&mut self, size: usize) {
    self.size = size;
    self.cells.clear();
    self.cells.resize(Self::cell_count(size), 0.0);
  }

  /// Value at `(i, j)`. The diagonal reads as zero.
  pub fn get(&self, i: usize, j: usize) -> f64 {
    match i.cmp(&j) {
      std::cmp::Ordering::Less => self.cells[self.offset(i, j)],
      std::cmp::Ordering::Equal => 0.0,
      std::cmp::Ordering::Greater => self.cells[self.offset(j, i)],
    }
  }

  /// Sets the value at `(i, j)` and, by symmetry, at `(j, i)`.
  ///
  /// # Panics
  ///
  /// Panics if `i == j` - the diagonal is not writable.
  pub fn set(&mut self, i: usize, j: usize, value: f64) {
    assert_ne!(i, j, "the diagonal of a distance matrix is not writable");
    let offset = if i < j {
      self.offset(i, j)
    } else {
      self.offset(j, i)
    };
    self.cells[offset] = value;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_values_are_mirrored() {
    let mut m = SymmetricMatrix::new(4);
    m.set(1, 3, 2.5);
    m.set(2, 0, 1.5);
    assert_eq!(m.get(1, 3), 2.5);
    assert_eq!(m.get(3, 1), 2.5);
    assert_eq!(m.get(0, 2), 1.5);
    assert_eq!(m.get(2, 0), 1.5);
  }

  #[test]
  fn test_diagonal_is_zero() {
    let m = SymmetricMatrix::new(3);
    for i in 0..3 {
      assert_eq!(m.get(i, i), 0.0);
    }
  }

  #[test]
  fn test_resize_zeroes_cells_and_reuses_capacity() {
    let mut m = SymmetricMatrix::new(5);
    m.set(0, 4, 9.0);
    let capacity = m.cells.capacity();
    m.resize(3);
    assert_eq!(m.size(), 3);
    for i in 0..3 {
      for j in 0..3 {
        assert_eq!(m.get(i, j), 0.0);
      }
    }
    m.resize(5);
    assert_eq!(m.cells.capacity(), capacity);
    assert_eq!(m.get(0, 4), 0.0);
  }

  #[test]
  fn test_every_cell_is_addressable() {
    let mut m = SymmetricMatrix::new(6);
    let mut value = 1.0;
    for i in 0..6 {
      for j in (i + 1)..6 {
        m.set(i, j, value);
        value += 1.0;
      }
    }
    let mut expected = 1.0;
    for i in 0..6 {
      for j in (i + 1)..6 {
        assert_eq!(m.get(i, j), expected);
        expected += 1.0;
      }
    }
  }
}
