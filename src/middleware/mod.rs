/*
 * Responsibility
 * - Router-level middleware (transport and browser concerns)
 * - Authorization is not here: handlers call the AuthorizationGuard with their own permission
 */
pub mod cors;
pub mod http;
pub mod security_headers;
