//! Labeler state: current annotation, navigation cache, image queue and session.

mod annotation;
mod cache;
mod queue;
mod session;

pub use annotation::AnnotationState;
pub use cache::AnnotationCache;
pub use queue::{ClaimOutcome, ImageQueue};
pub use session::{Session, SessionTiming};
