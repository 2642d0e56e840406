//! Classification on top of the model invoker: business answer + topic category, and a
//! best-effort emotion label. Both produce labels from closed sets (see [`Catalog`]).

mod business;
mod catalog;
mod emotion;

pub use business::{recover_fields, BusinessClassifier, BusinessReply, RecoveredFields};
pub use catalog::{
    Catalog, Category, EmotionLabel, DEFAULT_CATEGORIES, DEFAULT_CATEGORY, DEFAULT_EMOTIONS,
    FALLBACK_EMOTION,
};
pub use emotion::{first_token, EmotionClassifier};
