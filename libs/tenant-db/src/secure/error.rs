/// Errors raised while building or executing scoped queries.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("invalid scope: {0}")]
    Invalid(&'static str),
}
