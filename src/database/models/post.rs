use chrono::Utc;
use diesel::prelude::*;

use super::user::User;
use crate::{
    app::AppError,
    schema::{comments, posts, users},
};

#[derive(Debug, Clone, Queryable)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    ///Rich text, rendered unescaped
    pub body: String,
    pub img_url: String,
    ///Creation date string, e.g. "August 05, 2026"
    pub date: String,
    pub author_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = posts)]
struct PostInsert<'a> {
    title: &'a str,
    subtitle: &'a str,
    body: &'a str,
    img_url: &'a str,
    date: String,
    author_id: i32,
}

impl Post {
    /// Inserts a post stamped with today's date string.
    pub fn new(
        conn: &mut SqliteConnection,
        author: &User,
        title: &str,
        subtitle: &str,
        body: &str,
        img_url: &str,
    ) -> Result<Post, AppError> {
        if title.is_empty() || body.is_empty() {
            return Err(AppError::BadRequest);
        }

        let to_insert = PostInsert {
            title,
            subtitle,
            body,
            img_url,
            date: Utc::now().format("%B %d, %Y").to_string(),
            author_id: author.id,
        };

        Ok(diesel::insert_into(posts::table)
            .values(&to_insert)
            .get_result(conn)?)
    }

    pub fn find(conn: &mut SqliteConnection, post_id: i32) -> Option<Post> {
        posts::table.filter(posts::id.eq(post_id)).first(conn).ok()
    }

    /** Returns every post with its author, newest first */
    pub fn all_with_authors(conn: &mut SqliteConnection) -> Result<Vec<(Post, User)>, AppError> {
        Ok(posts::table
            .inner_join(users::table)
            .order(posts::id.desc())
            .load(conn)?)
    }

    /// Edits keep the original date stamp.
    pub fn update(
        &mut self,
        conn: &mut SqliteConnection,
        title: &str,
        subtitle: &str,
        body: &str,
        img_url: &str,
    ) -> Result<(), AppError> {
        if title.is_empty() || body.is_empty() {
            return Err(AppError::BadRequest);
        }

        self.title = title.to_string();
        self.subtitle = subtitle.to_string();
        self.body = body.to_string();
        self.img_url = img_url.to_string();

        diesel::update(posts::table.filter(posts::id.eq(self.id)))
            .set((
                posts::title.eq(&self.title),
                posts::subtitle.eq(&self.subtitle),
                posts::body.eq(&self.body),
                posts::img_url.eq(&self.img_url),
            ))
            .execute(conn)?;

        Ok(())
    }

    /// Removes the post and every comment hanging off it.
    pub fn delete(conn: &mut SqliteConnection, post_id: i32) -> Result<(), AppError> {
        diesel::delete(comments::table.filter(comments::post_id.eq(post_id))).execute(conn)?;
        diesel::delete(posts::table.filter(posts::id.eq(post_id))).execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_utils::{seed_user, test_state};
    use crate::database::models::comment::Comment;
    use pretty_assertions::assert_eq;

    #[test]
    fn posts_come_back_newest_first() {
        let (state, _) = test_state();
        let author = seed_user(&state, "author@example.com", "test_password123", true, true);
        let mut conn = state.pool.get().unwrap();

        Post::new(&mut conn, &author, "First", "sub", "body", "").unwrap();
        Post::new(&mut conn, &author, "Second", "sub", "body", "").unwrap();

        let posts = Post::all_with_authors(&mut conn).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].0.title, "Second");
        assert_eq!(posts[1].0.title, "First");
        assert_eq!(posts[0].1.name, author.name);
    }

    #[test]
    fn delete_cascades_comments() {
        let (state, _) = test_state();
        let author = seed_user(&state, "author@example.com", "test_password123", true, true);
        let mut conn = state.pool.get().unwrap();

        let post = Post::new(&mut conn, &author, "Title", "sub", "body", "").unwrap();
        Comment::new(&mut conn, &post, &author, "a comment").unwrap();

        Post::delete(&mut conn, post.id).unwrap();

        assert!(Post::find(&mut conn, post.id).is_none());
        assert!(Comment::for_post(&mut conn, post.id).unwrap().is_empty());
    }

    #[test]
    fn update_keeps_the_date_stamp() {
        let (state, _) = test_state();
        let author = seed_user(&state, "author@example.com", "test_password123", true, true);
        let mut conn = state.pool.get().unwrap();

        let mut post = Post::new(&mut conn, &author, "Title", "sub", "body", "").unwrap();
        let stamped = post.date.clone();
        post.update(&mut conn, "New title", "new sub", "new body", "http://img.example.com/x.png")
            .unwrap();

        let reloaded = Post::find(&mut conn, post.id).unwrap();
        assert_eq!(reloaded.title, "New title");
        assert_eq!(reloaded.date, stamped);
    }
}
