//! Viewport Scheduler Library
//!
//! Cooperative, single-threaded scheduling primitives for the viewport engine.
//!
//! The viewport never spawns threads or registers real timers. Instead the
//! host drives it with explicit timestamps:
//!
//! - [`FrameQueue`] collects work that must run on the next animation frame.
//!   Tasks that opt into coalescing replace a pending task of the same kind,
//!   so a burst of input between two frames costs one unit of work.
//! - [`Debounce`] is a cancellable delayed task. Re-arming pushes the
//!   deadline out; polling past the deadline fires it exactly once.
//! - [`FrameClock`] paces animation frames at a fixed interval.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use viewport_scheduler::{Coalesce, Debounce, FrameQueue};
//!
//! #[derive(Debug, PartialEq)]
//! enum Task {
//!     Begin,
//!     Update(u32),
//! }
//!
//! impl Coalesce for Task {
//!     fn coalesces_with(&self, pending: &Self) -> bool {
//!         matches!((self, pending), (Task::Update(_), Task::Update(_)))
//!     }
//! }
//!
//! let mut queue = FrameQueue::new();
//! queue.push(Task::Begin);
//! queue.push(Task::Update(1));
//! queue.push(Task::Update(2));
//! assert_eq!(queue.drain(), vec![Task::Begin, Task::Update(2)]);
//!
//! let start = Instant::now();
//! let mut timer = Debounce::new(Duration::from_millis(100));
//! timer.arm(start);
//! assert!(!timer.poll(start + Duration::from_millis(50)));
//! assert!(timer.poll(start + Duration::from_millis(100)));
//! ```

mod debounce;
pub mod frame_clock;
mod frame_queue;

pub use debounce::Debounce;
pub use frame_clock::{FrameClock, FRAME_INTERVAL_120FPS, FRAME_INTERVAL_60FPS};
pub use frame_queue::{Coalesce, FrameQueue};
