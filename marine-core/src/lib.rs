//! Marine Core - content identity, detection events and crawl batching
//!
//! This crate holds the I/O-free pieces of the Marine piracy tracker:
//!
//! - Deterministic content fingerprints (MD5, hex-encoded)
//! - The detection event wire codec shared by the producer and the consumer
//! - The lock-guarded submission queue that batches URLs for crawling
//! - The local score-threshold verdict applied to matching results
//!
//! # Example
//!
//! ```
//! use marine_core::{fingerprint, DetectionEvent, SubmissionQueue};
//!
//! assert_eq!(fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
//!
//! let event = DetectionEvent::decode("PiracyFound:42:https://pirate.example/x:91.5").unwrap();
//! assert_eq!(event.video_id(), 42);
//!
//! let queue = SubmissionQueue::new();
//! queue.submit("https://a.example");
//! assert_eq!(queue.drain().unwrap(), vec!["https://a.example".to_string()]);
//! ```

pub mod error;
pub mod event;
pub mod fingerprint;
pub mod queue;
pub mod verdict;

pub use error::{MarineError, Result};
pub use event::{DetectionEvent, FrameFormat, PIRACY_FOUND_PREFIX, VIDEO_UPLOADED_PREFIX};
pub use fingerprint::{fingerprint, Fingerprinter, FINGERPRINT_HEX_LEN};
pub use queue::SubmissionQueue;
pub use verdict::{Verdict, VerdictPolicy, DEFAULT_PIRACY_THRESHOLD};
