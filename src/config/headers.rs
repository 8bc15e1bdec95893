//! HTTP header name constants.
//!
//! Header names are lower-case because the fetcher normalises every response
//! header name before analyzers see it.

// Security header names
/// Content Security Policy header
pub const HEADER_CONTENT_SECURITY_POLICY: &str = "content-security-policy";
/// HTTP Strict Transport Security header
pub const HEADER_STRICT_TRANSPORT_SECURITY: &str = "strict-transport-security";
/// X-Content-Type-Options header
pub const HEADER_X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
/// X-Frame-Options header
pub const HEADER_X_FRAME_OPTIONS: &str = "x-frame-options";
/// Referrer-Policy header
pub const HEADER_REFERRER_POLICY: &str = "referrer-policy";
/// Permissions-Policy header
pub const HEADER_PERMISSIONS_POLICY: &str = "permissions-policy";

// Server identification
/// Server header (identifies server software)
pub const HEADER_SERVER: &str = "server";
/// X-Powered-By header (identifies server framework)
pub const HEADER_X_POWERED_BY: &str = "x-powered-by";
/// X-AspNet-Version header
pub const HEADER_X_ASPNET_VERSION: &str = "x-aspnet-version";
/// X-AspNetMvc-Version header
pub const HEADER_X_ASPNETMVC_VERSION: &str = "x-aspnetmvc-version";
/// X-Generator header (identifies CMS/generator)
pub const HEADER_X_GENERATOR: &str = "x-generator";
/// X-Drupal-Cache header
pub const HEADER_X_DRUPAL_CACHE: &str = "x-drupal-cache";
/// Link header (WordPress advertises its REST API here)
pub const HEADER_LINK: &str = "link";

// Request-side headers read by the API
/// Shared secret guarding the admin endpoints
pub const HEADER_ADMIN_SECRET: &str = "x-admin-secret";
/// Client address set by reverse proxies
pub const HEADER_X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Client address set by nginx-style proxies
pub const HEADER_X_REAL_IP: &str = "x-real-ip";

// Rate-limit response headers
pub const HEADER_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
