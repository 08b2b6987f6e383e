pub mod accuracy;
pub mod codec;
pub mod etl;
pub mod grouping;
pub mod outliers;
pub mod pipeline;
pub mod rounding;
pub mod search;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
