pub mod analysis;
pub mod fallback;
pub mod guide;
pub mod ids;
pub mod node_kind;
pub mod normalize;
mod validation;
mod workflow;

pub use analysis::{Features, RequirementAnalysis, analyze};
pub use fallback::synthesize_fallback;
pub use guide::{UserGuide, user_guide};
pub use ids::{IdSource, NodeIdGenerator, SequentialIds};
pub use node_kind::NodeKind;
pub use normalize::{NormalizeError, Normalized, normalize};
pub use validation::*;
pub use workflow::*;
