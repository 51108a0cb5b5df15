mod jwt_middleware;
mod session_guard;

pub use jwt_middleware::JwtMiddleware;
pub use session_guard::SessionGuard;
