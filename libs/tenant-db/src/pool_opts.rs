//! Applies [`ConnectOpts`] to each backend's sqlx pool builder.

use crate::ConnectOpts;

/// Common interface for applying connection pool configuration.
pub trait ApplyPoolOpts {
    /// Apply connection options to the pool builder.
    #[must_use]
    fn apply(self, opts: &ConnectOpts) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($($feature:literal => $builder:ty),+ $(,)?) => {
        $(
            #[cfg(feature = $feature)]
            impl ApplyPoolOpts for $builder {
                fn apply(mut self, opts: &ConnectOpts) -> Self {
                    if let Some(n) = opts.max_conns {
                        self = self.max_connections(n);
                    }
                    if let Some(n) = opts.min_conns {
                        self = self.min_connections(n);
                    }
                    if let Some(t) = opts.acquire_timeout {
                        self = self.acquire_timeout(t);
                    }
                    if let Some(t) = opts.idle_timeout {
                        self = self.idle_timeout(t);
                    }
                    if let Some(t) = opts.max_lifetime {
                        self = self.max_lifetime(t);
                    }
                    self.test_before_acquire(opts.test_before_acquire)
                }
            }
        )+
    };
}

impl_apply_pool_opts! {
    "pg" => sea_orm::sqlx::postgres::PgPoolOptions,
    "mysql" => sea_orm::sqlx::mysql::MySqlPoolOptions,
    "sqlite" => sea_orm::sqlx::sqlite::SqlitePoolOptions,
}
