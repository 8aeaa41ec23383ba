pub mod recommender;
pub mod taxonomy;

pub use recommender::{extract_themes, rank, score, AuthorityRecommender};
pub use taxonomy::{relationship_strength, AuthorityRole, RoleProfile};
