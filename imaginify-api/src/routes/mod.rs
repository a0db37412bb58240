/// API route handlers
///
/// - `health`: Health check endpoint
/// - `images`: Public image gallery
/// - `webhooks`: Identity provider webhook ingress

pub mod health;
pub mod images;
pub mod webhooks;
