//! Data layer: core types and the four per-file stages.
//!
//! Architecture:
//! ```text
//!  UploadedFile (.csv / .xlsx)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  bytes → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ cleaner  │  drop duplicate rows, mean-fill numeric gaps
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  select  │  project onto the chosen columns
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export  │  Table → CSV / XLSX buffer + media type + file name
//!   └──────────┘
//! ```

pub mod chart;
pub mod cleaner;
pub mod export;
pub mod loader;
pub mod model;
pub mod select;
