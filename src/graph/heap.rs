//! Approximate heap accounting for graph payloads.
//!
//! Numbers are estimates: owned buffer capacities plus the inline size of
//! table slots. Good enough to report how much a sweep reclaimed, not a
//! replacement for an allocator profiler.

/// Bytes a value owns on the heap, excluding its own inline size.
pub trait HeapSize {
  fn heap_size(&self) -> usize;
}

impl HeapSize for () {
  fn heap_size(&self) -> usize {
    0
  }
}

impl HeapSize for String {
  fn heap_size(&self) -> usize {
    self.capacity()
  }
}

impl HeapSize for Vec<u8> {
  fn heap_size(&self) -> usize {
    self.capacity()
  }
}

impl HeapSize for Vec<String> {
  fn heap_size(&self) -> usize {
    self.capacity() * std::mem::size_of::<String>() + self.iter().map(HeapSize::heap_size).sum::<usize>()
  }
}

impl<T: HeapSize> HeapSize for Option<T> {
  fn heap_size(&self) -> usize {
    self.as_ref().map_or(0, HeapSize::heap_size)
  }
}

/// Render a byte count in whole megabytes, as printed in focus stats.
pub fn to_megabytes(bytes: usize) -> usize {
  bytes / (1024 * 1024)
}
