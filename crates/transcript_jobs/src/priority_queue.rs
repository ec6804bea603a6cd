use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::{JobError, Result};
use crate::job::{Job, JobId, Priority};

pub trait PriorityQueue<T: Debug> {
	fn insert(&mut self, item: T);
	fn peek_min(&self) -> Option<&T>;
	fn extract_min(&mut self) -> Option<T>;
	fn len(&self) -> usize;
	fn is_empty(&self) -> bool;
}

/// Ordering reference to a job. Job data itself stays in the manager's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
	pub job_id: JobId,
	pub priority: Priority,
	pub submitted_at: DateTime<Utc>,
	/// Creation sequence, breaks ties between identical timestamps.
	pub seq: u64,
}

impl QueueEntry {
	#[must_use]
	pub fn for_job(job: &Job) -> Self {
		Self {
			job_id: job.id(),
			priority: job.priority(),
			submitted_at: job.submitted_at(),
			seq: job.seq(),
		}
	}

	fn key(&self) -> (u8, DateTime<Utc>, u64) {
		(self.priority.rank(), self.submitted_at, self.seq)
	}
}

impl Ord for QueueEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		self.key().cmp(&other.key())
	}
}

impl PartialOrd for QueueEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Array-backed binary min-heap.
pub struct ImplicitHeap<T: Ord + Debug> {
	heap: Vec<T>,
}

impl<T: Ord + Debug> Default for ImplicitHeap<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Ord + Debug> ImplicitHeap<T> {
	#[must_use]
	pub const fn new() -> Self {
		Self { heap: Vec::new() }
	}

	#[must_use]
	pub fn with_capacity(capacity: usize) -> Self {
		Self { heap: Vec::with_capacity(capacity) }
	}

	const fn parent(index: usize) -> usize {
		(index - 1) / 2
	}

	const fn left_child(index: usize) -> usize {
		2 * index + 1
	}

	const fn right_child(index: usize) -> usize {
		2 * index + 2
	}

	fn sift_up(&mut self, mut index: usize) {
		while index > 0 {
			let parent = Self::parent(index);
			if self.heap[parent] <= self.heap[index] {
				break;
			}
			self.heap.swap(parent, index);
			index = parent;
		}
	}

	fn sift_down(&mut self, mut index: usize) {
		loop {
			let left = Self::left_child(index);
			let right = Self::right_child(index);
			let mut smallest = index;

			if left < self.heap.len() && self.heap[left] < self.heap[smallest] {
				smallest = left;
			}
			if right < self.heap.len() && self.heap[right] < self.heap[smallest] {
				smallest = right;
			}

			if smallest == index {
				break;
			}

			self.heap.swap(index, smallest);
			index = smallest;
		}
	}
}

impl<T: Ord + Debug> PriorityQueue<T> for ImplicitHeap<T> {
	fn insert(&mut self, item: T) {
		self.heap.push(item);
		let new_index = self.heap.len() - 1;
		self.sift_up(new_index);
	}

	fn peek_min(&self) -> Option<&T> {
		self.heap.first()
	}

	fn extract_min(&mut self) -> Option<T> {
		if self.heap.is_empty() {
			return None;
		}
		let item = self.heap.swap_remove(0);
		if !self.heap.is_empty() {
			self.sift_down(0);
		}
		Some(item)
	}

	fn len(&self) -> usize {
		self.heap.len()
	}

	fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}
}

/// Bounded queue of pending job references.
pub struct JobQueue {
	heap: ImplicitHeap<QueueEntry>,
	capacity: usize,
}

impl JobQueue {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self {
			heap: ImplicitHeap::with_capacity(capacity.min(1024)),
			capacity,
		}
	}

	pub fn push(&mut self, entry: QueueEntry) -> Result<()> {
		if self.heap.len() >= self.capacity {
			return Err(JobError::Queue(format!("queue is at capacity ({})", self.capacity)));
		}
		self.heap.insert(entry);
		Ok(())
	}

	pub fn pop(&mut self) -> Option<QueueEntry> {
		self.heap.extract_min()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.heap.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	fn entry(priority: Priority, offset_secs: i64, seq: u64) -> QueueEntry {
		let base = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap().with_timezone(&Utc);
		QueueEntry {
			job_id: JobId::new(),
			priority,
			submitted_at: base + Duration::seconds(offset_secs),
			seq,
		}
	}

	fn drain(queue: &mut JobQueue) -> Vec<QueueEntry> {
		std::iter::from_fn(|| queue.pop()).collect()
	}

	#[test]
	fn test_heap_basic_operations() {
		let mut heap = ImplicitHeap::new();
		assert!(heap.is_empty());
		assert_eq!(heap.peek_min(), None);

		heap.insert(42);
		assert_eq!(heap.peek_min(), Some(&42));
		assert_eq!(heap.extract_min(), Some(42));
		assert!(heap.is_empty());
		assert_eq!(heap.extract_min(), None);
	}

	#[test]
	fn test_heap_extracts_ascending() {
		let mut heap = ImplicitHeap::new();
		for item in [5, 3, 7, 1, 6, 4, 2] {
			heap.insert(item);
		}
		let extracted: Vec<_> = std::iter::from_fn(|| heap.extract_min()).collect();
		assert_eq!(extracted, vec![1, 2, 3, 4, 5, 6, 7]);
	}

	#[test]
	fn test_heap_mixed_operations() {
		let mut heap = ImplicitHeap::new();
		heap.insert(3);
		heap.insert(1);
		assert_eq!(heap.peek_min(), Some(&1));

		heap.insert(2);
		assert_eq!(heap.extract_min(), Some(1));

		heap.insert(0);
		assert_eq!(heap.extract_min(), Some(0));
		assert_eq!(heap.extract_min(), Some(2));
		assert_eq!(heap.extract_min(), Some(3));
		assert_eq!(heap.len(), 0);
	}

	#[test]
	fn test_higher_priority_submitted_later_still_first() {
		let mut queue = JobQueue::new(10);
		let low = entry(Priority::Low, 0, 0);
		let high = entry(Priority::High, 1, 1);
		let medium = entry(Priority::Medium, 2, 2);
		for e in [low, high, medium] {
			queue.push(e).unwrap();
		}

		let order: Vec<_> = drain(&mut queue).into_iter().map(|e| e.job_id).collect();
		assert_eq!(order, vec![high.job_id, medium.job_id, low.job_id]);
	}

	#[test]
	fn test_fifo_within_tier() {
		let mut queue = JobQueue::new(10);
		let entries: Vec<_> = (0..5).map(|i| entry(Priority::Medium, 10 - i, i as u64)).collect();
		for e in entries.iter().rev() {
			queue.push(*e).unwrap();
		}

		let drained = drain(&mut queue);
		assert!(drained.windows(2).all(|w| w[0].submitted_at <= w[1].submitted_at));
	}

	#[test]
	fn test_sequence_breaks_timestamp_ties() {
		let mut queue = JobQueue::new(10);
		let first = entry(Priority::High, 0, 7);
		let second = entry(Priority::High, 0, 8);
		queue.push(second).unwrap();
		queue.push(first).unwrap();

		assert_eq!(queue.pop().map(|e| e.job_id), Some(first.job_id));
		assert_eq!(queue.pop().map(|e| e.job_id), Some(second.job_id));
	}

	#[test]
	fn test_capacity_is_enforced() {
		let mut queue = JobQueue::new(2);
		queue.push(entry(Priority::Low, 0, 0)).unwrap();
		queue.push(entry(Priority::Low, 1, 1)).unwrap();

		let err = queue.push(entry(Priority::High, 2, 2)).unwrap_err();
		assert!(matches!(err, JobError::Queue(_)));
		assert_eq!(queue.len(), 2);

		queue.pop();
		assert!(queue.push(entry(Priority::High, 3, 3)).is_ok());

		assert_eq!(drain(&mut queue).len(), 2);
		assert!(queue.is_empty());
	}

	#[test]
	fn test_interleaved_tiers_are_sorted() {
		let mut queue = JobQueue::new(64);
		let priorities = [Priority::Low, Priority::High, Priority::Medium];
		for i in 0..30_u64 {
			let priority = priorities[(i * 7 % 3) as usize];
			queue.push(entry(priority, (i * 13 % 17) as i64, i)).unwrap();
		}

		let drained = drain(&mut queue);
		assert_eq!(drained.len(), 30);
		assert!(drained.windows(2).all(|w| w[0] <= w[1]));
	}
}
