use crate::models::{Claims, ServiceError, User, UserRole};
use actix_web::{HttpMessage, HttpRequest};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;

pub mod document_store;
pub mod notifier;
pub mod participant_csv;

use document_store::DocumentStore;

// Authenticated caller, attached to the request by the auth middleware
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
}

impl From<Claims> for UserContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

pub fn get_user_id_from_request(req: &HttpRequest) -> Result<String, ServiceError> {
    req.extensions()
        .get::<UserContext>()
        .map(|context| context.user_id.clone())
        .ok_or(ServiceError::Unauthorized)
}

// Loads the caller's stored record so role and team changes apply immediately
pub fn current_user(req: &HttpRequest, store: &DocumentStore) -> Result<User, ServiceError> {
    let user_id = get_user_id_from_request(req)?;
    store.find::<User>(&user_id)?.ok_or_else(|| {
        error!("❌ Token refers to unknown user: {}", user_id);
        ServiceError::Unauthorized
    })
}

pub fn require_admin(user: &User) -> Result<(), ServiceError> {
    if !user.is_admin() {
        error!("❌ User: {} is not an admin", user.id);
        return Err(ServiceError::Forbidden);
    }
    Ok(())
}

// JWT utility functions
pub mod jwt {
    use super::*;

    // Generate a new JWT token for a user
    pub fn generate_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, ServiceError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::hours(ttl_hours))
            .ok_or(ServiceError::InternalServerError)?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: expiration,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(|e| {
            error!("Failed to encode token: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    // Validate and decode a JWT token
    pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized)
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<String, ServiceError> {
        match auth_header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ServiceError::Unauthorized),
        }
    }
}

// Password utility functions
pub mod password {
    use super::*;

    // Hash a password using bcrypt
    pub fn hash_password(password: &str, cost: u32) -> Result<String, ServiceError> {
        hash(password, cost).map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    // Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
        verify(password, hash).map_err(|e| {
            error!("Failed to verify password: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    pub fn generate_password() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

pub mod validation {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        static ref EMAIL_REGEX: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
        static ref SUBMISSION_URL_REGEX: Regex =
            Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex");
    }

    pub fn is_valid_email(email: &str) -> bool {
        EMAIL_REGEX.is_match(email.trim())
    }

    pub fn is_valid_submission_url(url: &str) -> bool {
        SUBMISSION_URL_REGEX.is_match(url.trim())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn validates_emails() {
            assert!(is_valid_email("ada@example.com"));
            assert!(!is_valid_email("ada.example.com"));
            assert!(!is_valid_email("ada@example"));
        }

        #[test]
        fn validates_submission_urls() {
            assert!(is_valid_submission_url("https://github.com/team/project"));
            assert!(is_valid_submission_url("http://demo.example.org"));
            assert!(!is_valid_submission_url("ftp://example.org/file"));
            assert!(!is_valid_submission_url("github.com/team"));
        }
    }
}

// Middleware for JWT authentication
pub mod auth_middleware {
    use super::*;
    use actix_web::body::EitherBody;
    use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
    use actix_web::http::{header, Method};
    use actix_web::{web, Error, ResponseError};
    use futures::future::{ok, Ready};
    use serde::Deserialize;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;

    const PUBLIC_PATHS: [&str; 3] = ["/", "/auth/register", "/auth/login"];
    // EventSource cannot set headers, so this path may carry ?token=
    const QUERY_TOKEN_PATH: &str = "/events";

    #[derive(Deserialize)]
    struct TokenQuery {
        token: Option<String>,
    }

    pub struct Authentication {
        secret: Rc<String>,
    }

    impl Authentication {
        pub fn new(secret: impl Into<String>) -> Self {
            Self {
                secret: Rc::new(secret.into()),
            }
        }
    }

    impl<S, B> Transform<S, ServiceRequest> for Authentication
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<EitherBody<B>>;
        type Error = Error;
        type Transform = AuthenticationMiddleware<S>;
        type InitError = ();
        type Future = Ready<Result<Self::Transform, Self::InitError>>;

        fn new_transform(&self, service: S) -> Self::Future {
            ok(AuthenticationMiddleware {
                service,
                secret: self.secret.clone(),
            })
        }
    }

    pub struct AuthenticationMiddleware<S> {
        service: S,
        secret: Rc<String>,
    }

    impl<S> AuthenticationMiddleware<S> {
        fn token_for(&self, req: &ServiceRequest) -> Option<String> {
            if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
                let auth_str = auth_header.to_str().ok()?;
                return jwt::extract_token_from_header(auth_str).ok();
            }

            if req.path() == QUERY_TOKEN_PATH {
                return web::Query::<TokenQuery>::from_query(req.query_string())
                    .ok()
                    .and_then(|query| query.into_inner().token);
            }

            None
        }
    }

    impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<EitherBody<B>>;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

        forward_ready!(service);

        fn call(&self, req: ServiceRequest) -> Self::Future {
            let is_public = req.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&req.path());

            if !is_public {
                let claims = self
                    .token_for(&req)
                    .and_then(|token| jwt::decode_token(&token, &self.secret).ok());

                match claims {
                    Some(claims) => {
                        req.extensions_mut().insert(UserContext::from(claims));
                    }
                    None => {
                        let response = req
                            .into_response(ServiceError::Unauthorized.error_response())
                            .map_into_right_body();
                        return Box::pin(async move { Ok(response) });
                    }
                }
            }

            let fut = self.service.call(req);
            Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
        }
    }
}
