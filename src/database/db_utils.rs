use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Opens the r2d2 pool over the SQLite file at `database_url`.
///
/// # Example
/// ```
/// let pool = connect_to_db("blog.db");
/// ```
pub fn connect_to_db(database_url: &str) -> Arc<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(8)
        .build(manager)
        .unwrap_or_else(|err| panic!("Error connecting to {}: {}", database_url, err));

    Arc::new(pool)
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    is_verified BOOLEAN NOT NULL DEFAULT 0,
    is_admin BOOLEAN NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    subtitle TEXT NOT NULL,
    body TEXT NOT NULL,
    img_url TEXT NOT NULL,
    date TEXT NOT NULL,
    author_id INTEGER NOT NULL REFERENCES users(id)
);
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    author_id INTEGER NOT NULL REFERENCES users(id),
    post_id INTEGER NOT NULL REFERENCES posts(id)
);
";

/// Creates the tables on a fresh database file. Safe to run on every
/// startup.
pub fn init_db(pool: &DbPool) -> Result<(), diesel::result::Error> {
    let mut conn = pool.get().expect("no database connection available");
    conn.batch_execute(SCHEMA_SQL)
}
