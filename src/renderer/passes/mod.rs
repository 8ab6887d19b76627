//! The pipeline stages, in execution order.

pub mod shadow;
pub mod gbuffer;
pub mod decal;
pub mod ssao;
pub mod lighting;
pub mod forward;
pub mod post;

pub use decal::DecalPass;
pub use forward::ForwardPass;
pub use gbuffer::GBufferPass;
pub use lighting::LightAccumulationPass;
pub use post::PostProcessChain;
pub use shadow::ShadowPass;
pub use ssao::SsaoPass;
