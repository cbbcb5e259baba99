pub mod events;
pub mod external_search;
pub mod identity;
pub mod providers;
pub mod quota;
pub mod recipes;
pub mod recommendations;

pub use events::{EventDispatcher, RatingEventPublisher, RedisRatingPublisher};
pub use external_search::ExternalSearchService;
pub use identity::{IdentityVerifier, JwtIdentityService};
pub use providers::{RecipeProvider, SpoonacularProvider};
pub use quota::{DailyQuotaGuard, QuotaGuard, RedisUsageCounter, UsageCounter};
pub use recipes::RecipeService;
pub use recommendations::RecommendationService;
