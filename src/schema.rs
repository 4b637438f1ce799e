diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        password -> Text,
        name -> Text,
        is_verified -> Bool,
        is_admin -> Bool,
    }
}

diesel::table! {
    posts (id) {
        id -> Integer,
        title -> Text,
        subtitle -> Text,
        body -> Text,
        img_url -> Text,
        date -> Text,
        author_id -> Integer,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        text -> Text,
        author_id -> Integer,
        post_id -> Integer,
    }
}

diesel::joinable!(posts -> users (author_id));
diesel::joinable!(comments -> users (author_id));
diesel::joinable!(comments -> posts (post_id));

diesel::allow_tables_to_appear_in_same_query!(users, posts, comments);
