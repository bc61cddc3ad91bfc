use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
}
