pub mod candle;
pub mod dataset;
pub mod timeframe;

pub use candle::{Candle, CandleKind};
pub use dataset::TimeframeDataset;
pub use timeframe::Timeframe;
