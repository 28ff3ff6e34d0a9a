//! Data layer: recording tables, loading, bead aggregation and selection.
//!
//! Architecture:
//! ```text
//!  folder/*.csv | *.json | *.parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table (named columns)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  filter column > threshold → FileBeadMap
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  select   │  bead numbers × target column → BeadSignal
//!   └──────────┘
//! ```

pub mod aggregate;
pub mod loader;
pub mod model;
pub mod select;
