//! Per-layer tile pipelines.
//!
//! Every layer is turned into one [`LayerPipeline`] variant describing how its tiles are
//! produced. All variants of the current layer set form an immutable [`PipelineTable`],
//! which answers [`MapRequest`]s and is rebuilt as a whole whenever the layer set changes.

mod asset;
mod cached;
mod layers;
mod refresh;
mod request;
mod retina;
mod table;

pub use asset::AssetCache;
pub use layers::*;
pub use refresh::{LogRefreshHook, RefreshHook};
pub use request::MapRequest;
pub use table::{PipelineContext, PipelineTable};
