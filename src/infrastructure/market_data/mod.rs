//! `HistoricalDataSource` implementations (A3) and the on-disk columnar cache used
//! by `HistoricalDataManager` (part of C9).

pub mod columnar_cache;
pub mod mock_source;
