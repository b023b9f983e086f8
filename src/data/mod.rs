/// Data layer: core types, loading, group selection, splitting and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (raw records)
///   └──────────┘
///        │  DatasetSpec (protected attribute, label predicates)
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Instance>, binary protected/label, weights
///   └──────────┘
///        │
///        ├──► split   seeded shuffle → (train, test)
///        ├──► filter  group/cell selection → weighted counts
///        ▼
///   ┌──────────┐
///   │  writer   │  features + protected + label + weight → file
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod split;
pub mod writer;
