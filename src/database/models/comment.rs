use diesel::prelude::*;

use super::{post::Post, user::User};
use crate::{
    app::AppError,
    schema::{comments, users},
};

#[derive(Debug, Clone, Queryable)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub author_id: i32,
    pub post_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct CommentInsert<'a> {
    text: &'a str,
    author_id: i32,
    post_id: i32,
}

impl Comment {
    /** Creates a comment on the post specified */
    pub fn new(
        conn: &mut SqliteConnection,
        post: &Post,
        author: &User,
        text: &str,
    ) -> Result<Comment, AppError> {
        if text.is_empty() {
            return Err(AppError::BadRequest);
        }

        let to_insert = CommentInsert {
            text,
            author_id: author.id,
            post_id: post.id,
        };

        Ok(diesel::insert_into(comments::table)
            .values(&to_insert)
            .get_result(conn)?)
    }

    /** Returns the comments under a post with their authors, newest first */
    pub fn for_post(
        conn: &mut SqliteConnection,
        post_id_in: i32,
    ) -> Result<Vec<(Comment, User)>, AppError> {
        Ok(comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id_in))
            .order(comments::id.desc())
            .load(conn)?)
    }
}
