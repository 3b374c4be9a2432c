/// Data layer: folder scanning, per-class CSVs, alignment and dumping.
///
/// Architecture:
/// ```text
///  <in>/<level>/<class>/*.jpg
///        │
///        ▼
///   ┌──────────┐
///   │ scanner  │  class folders, image names, counts
///   └──────────┘
///        │   (bootstrap + detector)
///        ▼
///   ┌────────────┐
///   │ csv_store  │  <csv>/<level>/<class>.csv  ⇄  Vec<PoseSample>
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  align   │  image set == CSV id set
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   dump   │  <trained>/<level>.csv
///   └──────────┘
/// ```

pub mod align;
pub mod csv_store;
pub mod dump;
pub mod model;
pub mod scanner;
