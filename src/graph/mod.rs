//! Follow graph module: the user directory, the relationship engine and
//! ranking/search, all sharing one store handle through [`FollowGraph`].

pub mod directory;
pub mod ranking;
pub mod relationships;
pub mod service;
pub mod types;

pub use directory::UserDirectory;
pub use ranking::Ranking;
pub use relationships::{RelationshipEngine, DEFAULT_RECOMMENDATION_LIMIT};
pub use service::FollowGraph;
pub use types::{
    Connections, FollowOutcome, PopularityRow, ProfileUpdate, RecommendationRow, UnfollowOutcome,
    User, UserSummary,
};
