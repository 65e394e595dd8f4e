//! Output generation for the standalone JSON artifact.
//!
//! Each run writes its normalized records to disk before the store sync, so
//! a batch can be inspected or re-synced later without re-calling the
//! extraction service.
//!
//! # Output Structure
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-08-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

pub mod json;
