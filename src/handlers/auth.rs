use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user;
use crate::utils::auth::{create_jwt, hash_password, verify_password};
use crate::utils::config::Config;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub async fn register(
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    req: web::Json<RegisterRequest>,
) -> impl Responder {
    log::info!("Registration attempt for username: {}", req.username);

    if !config.allow_registration {
        log::warn!("Registration attempt rejected - registration is disabled");
        return HttpResponse::Forbidden().json(ErrorResponse {
            error: "Registration is currently disabled".to_string(),
        });
    }

    let existing_user = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(db.get_ref())
        .await;

    match existing_user {
        Ok(Some(_)) => {
            log::warn!("Registration failed - username '{}' already exists", req.username);
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Username already exists".to_string(),
            });
        }
        Err(e) => {
            log::error!("Database error during registration: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Database error: {}", e),
            });
        }
        _ => {}
    }

    let password_hash = match hash_password(&req.password) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("Failed to hash password: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Failed to hash password: {}", e),
            });
        }
    };

    let user_id = Uuid::new_v4();
    let new_user = user::ActiveModel {
        id: Set(user_id),
        username: Set(req.username.clone()),
        password_hash: Set(password_hash),
        email: Set(req.email.clone()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    };

    match new_user.insert(db.get_ref()).await {
        Ok(user) => {
            log::info!("User '{}' created (ID: {})", user.username, user.id);

            let token = match create_jwt(user.id, &config.jwt_secret, config.jwt_expiration_hours) {
                Ok(t) => t,
                Err(e) => {
                    log::error!("Failed to generate token: {}", e);
                    return HttpResponse::InternalServerError().json(ErrorResponse {
                        error: format!("Failed to generate token: {}", e),
                    });
                }
            };

            HttpResponse::Created().json(AuthResponse {
                token,
                user_id: user.id.to_string(),
                username: user.username,
            })
        }
        Err(e) => {
            log::error!("Failed to create user: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Failed to create user: {}", e),
            })
        }
    }
}

pub async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    req: web::Json<LoginRequest>,
) -> impl Responder {
    log::info!("Login attempt for username: {}", req.username);

    let user = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(db.get_ref())
        .await;

    match user {
        Ok(Some(user)) => match verify_password(&req.password, &user.password_hash) {
            Ok(true) => {
                let token =
                    match create_jwt(user.id, &config.jwt_secret, config.jwt_expiration_hours) {
                        Ok(t) => t,
                        Err(e) => {
                            log::error!("Failed to generate token: {}", e);
                            return HttpResponse::InternalServerError().json(ErrorResponse {
                                error: format!("Failed to generate token: {}", e),
                            });
                        }
                    };

                HttpResponse::Ok().json(AuthResponse {
                    token,
                    user_id: user.id.to_string(),
                    username: user.username,
                })
            }
            Ok(false) => {
                log::warn!("Invalid password for user '{}'", req.username);
                HttpResponse::Unauthorized().json(ErrorResponse {
                    error: "Invalid credentials".to_string(),
                })
            }
            Err(e) => {
                log::error!("Failed to verify password: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: format!("Failed to verify password: {}", e),
                })
            }
        },
        Ok(None) => {
            log::warn!("User '{}' not found", req.username);
            HttpResponse::Unauthorized().json(ErrorResponse {
                error: "Invalid credentials".to_string(),
            })
        }
        Err(e) => {
            log::error!("Database error during login: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Database error: {}", e),
            })
        }
    }
}
