use crate::{
    auth::permissions::Role,
    auth::{hash_password, verify_password},
    db::DbPool,
    entities::user::{
        self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 60, message = "Username must be 3-60 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    /// One of ADMIN, FINANCE, SALES, WAREHOUSE.
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 120, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    pub role: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let role = parse_role(&request.role)?;

        let db = &*self.db_pool;
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let active = UserActiveModel {
            id: Set(user_id),
            username: Set(request.username.trim().to_lowercase()),
            password_hash: Set(hash_password(&request.password)?),
            full_name: Set(request.full_name.trim().to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create user");
            ServiceError::from_db_on(e, "username")
        })?;

        info!(user_id = %user_id, "User created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserCreated(user_id)).await {
                warn!(error = %e, user_id = %user_id, "Failed to send user created event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let db = &*self.db_pool;

        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        Ok(model_to_response(user))
    }

    /// Looks up an active user by username and checks the password.
    /// Returns the model so the caller can mint a token from it.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let db = &*self.db_pool;

        let user = UserEntity::find()
            .filter(user::Column::Username.eq(username.trim().to_lowercase()))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::AuthError("Invalid username or password".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::AuthError("Account is disabled".to_string()));
        }

        if !verify_password(password, &user.password_hash) {
            warn!(username = %username, "Password verification failed");
            return Err(ServiceError::AuthError("Invalid username or password".to_string()));
        }

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<UserListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = UserEntity::find().order_by_asc(user::Column::Username);
        if let Some(term) = search.as_deref().filter(|s| !s.trim().is_empty()) {
            let term = term.trim();
            query = query.filter(
                user::Column::Username
                    .contains(term)
                    .or(user::Column::FullName.contains(term)),
            );
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(UserListResponse {
            users: users.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let new_role = request.role.as_deref().map(parse_role).transpose()?;

        let db = &*self.db_pool;

        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        // Demoting or disabling the last active admin would lock everyone out
        let leaves_admin = user.role == Role::Admin.to_string()
            && user.is_active
            && (matches!(new_role, Some(r) if r != Role::Admin)
                || request.is_active == Some(false));
        if leaves_admin && self.active_admin_count_excluding(user_id).await? == 0 {
            return Err(ServiceError::InvalidOperation(
                "Cannot demote or disable the last active admin".to_string(),
            ));
        }

        let mut active: UserActiveModel = user.into();
        if let Some(full_name) = request.full_name {
            active.full_name = Set(full_name.trim().to_string());
        }
        if let Some(role) = new_role {
            active.role = Set(role.to_string());
        }
        if let Some(password) = request.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to update user");
            ServiceError::from_db_on(e, "username")
        })?;

        info!(user_id = %user_id, "User updated");
        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let user = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if user.role == Role::Admin.to_string()
            && user.is_active
            && self.active_admin_count_excluding(user_id).await? == 0
        {
            return Err(ServiceError::InvalidOperation(
                "Cannot delete the last active admin".to_string(),
            ));
        }

        UserEntity::delete_by_id(user_id)
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    async fn active_admin_count_excluding(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;

        UserEntity::find()
            .filter(user::Column::Role.eq(Role::Admin.to_string()))
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::Id.ne(user_id))
            .count(db)
            .await
            .map_err(ServiceError::from_db)
    }
}

fn parse_role(value: &str) -> Result<Role, ServiceError> {
    Role::from_str(value).map_err(|_| {
        ServiceError::ValidationError(format!(
            "Unknown role '{}'; expected ADMIN, FINANCE, SALES or WAREHOUSE",
            value
        ))
    })
}

fn model_to_response(model: UserModel) -> UserResponse {
    UserResponse {
        id: model.id,
        username: model.username,
        full_name: model.full_name,
        role: model.role,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        model_to_response(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_enforces_password_length() {
        let request = CreateUserRequest {
            username: "budi".to_string(),
            password: "short".to_string(),
            full_name: "Budi Santoso".to_string(),
            role: "SALES".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(parse_role("ADMIN").is_ok());
        assert!(parse_role("WAREHOUSE").is_ok());
        assert!(parse_role("SUPERUSER").is_err());
        assert!(parse_role("admin").is_err());
    }

    #[test]
    fn response_never_carries_the_hash() {
        let model = UserModel {
            id: Uuid::new_v4(),
            username: "budi".to_string(),
            password_hash: "$argon2id$...".to_string(),
            full_name: "Budi Santoso".to_string(),
            role: "SALES".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };

        let response = model_to_response(model);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("budi"));
    }
}
