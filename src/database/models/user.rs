use diesel::prelude::*;

use crate::{app::AppError, schema::users};

#[derive(Debug, Clone, Queryable)]
pub struct User {
    pub id: i32,
    pub email: String,
    ///Salted argon2 hash, never the clear text
    pub password: String,
    pub name: String,
    pub is_verified: bool,
    pub is_admin: bool,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct UserInsert<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    is_verified: bool,
    is_admin: bool,
}

impl User {
    /// Pushes a new, unverified user row and returns it.
    ///
    /// # Example
    /// ```
    /// let user = User::new(&mut conn, "reader@example.com", &hash, "Reader", false);
    /// ```
    pub fn new(
        conn: &mut SqliteConnection,
        email: &str,
        password_hash: &str,
        name: &str,
        admin: bool,
    ) -> Result<User, AppError> {
        if email.is_empty() || password_hash.is_empty() || name.is_empty() {
            return Err(AppError::BadRequest);
        }

        let to_insert = UserInsert {
            email,
            password: password_hash,
            name,
            is_verified: false,
            is_admin: admin,
        };

        let user = diesel::insert_into(users::table)
            .values(&to_insert)
            .get_result(conn)?;

        Ok(user)
    }

    /// Returns the user with the email specified, if one exists.
    pub fn find_by_email(conn: &mut SqliteConnection, email_in: &str) -> Option<User> {
        users::table
            .filter(users::email.eq(email_in))
            .first(conn)
            .ok()
    }

    /** Returns the user with the id specified */
    pub fn find_by_id(conn: &mut SqliteConnection, user_id: i32) -> Result<User, AppError> {
        Ok(users::table.filter(users::id.eq(user_id)).first(conn)?)
    }

    pub fn count(conn: &mut SqliteConnection) -> Result<i64, AppError> {
        Ok(users::table.count().get_result(conn)?)
    }

    /// Flips the verification flag once a token has checked out.
    pub fn mark_verified(&mut self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        diesel::update(users::table.filter(users::id.eq(self.id)))
            .set(users::is_verified.eq(true))
            .execute(conn)?;
        self.is_verified = true;
        Ok(())
    }

    /// Avatar shown next to the user's comments: gravatar, size 100,
    /// "retro" fallback.
    pub fn gravatar_url(&self) -> String {
        let hash = md5::compute(self.email.trim().to_lowercase().as_bytes());
        format!("https://www.gravatar.com/avatar/{:x}?s=100&d=retro&r=g", hash)
    }
}
