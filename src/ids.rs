use uuid::Uuid;

/// Identifier families. The prefix letter makes an id's type visible in logs
/// and database dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    User,
    Post,
    Category,
    PostCategory,
    Token,
}

impl IdType {
    pub fn prefix(&self) -> char {
        match self {
            IdType::User => 'u',
            IdType::Post => 'p',
            IdType::Category => 'c',
            IdType::PostCategory => 'j',
            IdType::Token => 'k',
        }
    }
}

/// new_id
///
/// One prefix letter followed by 32 lowercase hex digits of a random v4 UUID.
pub fn new_id(id_type: IdType) -> String {
    format!("{}{}", id_type.prefix(), Uuid::new_v4().simple())
}
