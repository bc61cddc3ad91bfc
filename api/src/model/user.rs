use kernel::model::{
    id::UserId,
    role::Role,
    user::{KycStatus, User},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleName {
    Admin,
    User,
}

impl From<Role> for RoleName {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => Self::Admin,
            Role::User => Self::User,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KycStatusName {
    Pending,
    Approved,
    Rejected,
}

impl From<KycStatus> for KycStatusName {
    fn from(value: KycStatus) -> Self {
        match value {
            KycStatus::Pending => Self::Pending,
            KycStatus::Approved => Self::Approved,
            KycStatus::Rejected => Self::Rejected,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: RoleName,
    pub kyc_status: KycStatusName,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        let User {
            user_id,
            user_name,
            email,
            role,
            kyc_status,
        } = value;
        Self {
            user_id,
            user_name,
            email,
            role: RoleName::from(role),
            kyc_status: KycStatusName::from(kyc_status),
        }
    }
}
