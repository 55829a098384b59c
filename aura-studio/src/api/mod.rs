//! HTTP API handlers for aura-studio
//!
//! JSON over HTTP; post create/update take `multipart/form-data` so media
//! files can ride along with the text fields.

pub mod analysis;
pub mod campaigns;
pub mod health;
pub mod posts;

pub use analysis::analysis_routes;
pub use campaigns::campaign_routes;
pub use health::health_routes;
pub use posts::post_routes;
