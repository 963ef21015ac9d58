use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{CommentRepository, PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{
    Category, Page, PageRequest, PostDetail, PostFilter, PostInput, PostSort, PostSummary,
};

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
        }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::InvalidUserId);
        }
        Ok(())
    }

    pub async fn create(&self, writer_id: Uuid, input: PostInput) -> Result<Uuid> {
        self.ensure_user(writer_id).await?;
        if !self.posts.category_exists(input.category_id).await? {
            return Err(AppError::InvalidCategoryId);
        }

        let post_id = self.posts.insert(writer_id, input).await?;
        info!(post_id = %post_id, writer_id = %writer_id, "post created");
        Ok(post_id)
    }

    /// Counts a view and returns the post with its comments
    pub async fn get(&self, viewer: Uuid, post_id: Uuid) -> Result<PostDetail> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AppError::InvalidPostId)?;

        self.posts.increment_view(post_id).await?;
        post.view_count += 1;

        let comments = self.comments.list_by_post(post_id).await?;
        let is_liked = self.posts.is_liked(viewer, post_id).await?;
        Ok(PostDetail::assemble(post, comments, viewer, is_liked))
    }

    async fn ensure_writer(&self, viewer: Uuid, post_id: Uuid) -> Result<()> {
        match self.posts.find_writer_id(post_id).await? {
            None => Err(AppError::InvalidPostId),
            Some(writer) if writer != viewer => Err(AppError::UnauthorizedAction),
            Some(_) => Ok(()),
        }
    }

    pub async fn update(&self, viewer: Uuid, post_id: Uuid, input: PostInput) -> Result<()> {
        self.ensure_writer(viewer, post_id).await?;
        if !self.posts.category_exists(input.category_id).await? {
            return Err(AppError::InvalidCategoryId);
        }
        self.posts.update(post_id, input).await?;
        Ok(())
    }

    pub async fn delete(&self, viewer: Uuid, post_id: Uuid) -> Result<()> {
        self.ensure_writer(viewer, post_id).await?;
        self.posts.delete(post_id).await?;
        info!(post_id = %post_id, "post deleted");
        Ok(())
    }

    pub async fn search(
        &self,
        keyword: String,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<Page<PostSummary>> {
        self.list(PostFilter::Keyword(keyword), sort, page).await
    }

    pub async fn by_category(
        &self,
        category_id: i64,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<Page<PostSummary>> {
        if !self.posts.category_exists(category_id).await? {
            return Err(AppError::InvalidCategoryId);
        }
        self.list(PostFilter::Category(category_id), sort, page).await
    }

    pub async fn by_writer(
        &self,
        writer_id: Uuid,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<Page<PostSummary>> {
        self.list(PostFilter::Writer(writer_id), sort, page).await
    }

    async fn list(
        &self,
        filter: PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<Page<PostSummary>> {
        let (posts, total) = self.posts.list(filter, sort, page).await?;
        Ok(Page::new(posts, page, total))
    }

    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        if self.posts.find_writer_id(post_id).await?.is_none() {
            return Err(AppError::InvalidPostId);
        }
        if !self.posts.like(user_id, post_id).await? {
            return Err(AppError::AlreadyLiked);
        }
        Ok(())
    }

    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        if !self.posts.unlike(user_id, post_id).await? {
            return Err(AppError::NotLiked);
        }
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.posts.list_categories().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::comment_repo::MockCommentRepository;
    use crate::db::post_repo::MockPostRepository;
    use crate::db::user_repo::MockUserRepository;
    use crate::models::{Comment, LoginType, Post, Role, User};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn post(id: Uuid, writer_id: Uuid) -> Post {
        Post {
            id,
            title: "Lifetimes".into(),
            content: "Why does 'a outlive 'b?".into(),
            category_id: 1,
            category_name: "QUESTION".into(),
            writer_id,
            writer_nickname: "writer".into(),
            view_count: 9,
            like_count: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn input() -> PostInput {
        PostInput {
            category_id: 1,
            title: "t".into(),
            content: "c".into(),
        }
    }

    fn member(id: Uuid) -> User {
        User {
            id,
            username: "alice01".into(),
            password_hash: String::new(),
            nickname: "alice".into(),
            email: "alice@example.com".into(),
            major_name: "CS".into(),
            agree_email: false,
            role: Role::User,
            suspended_until: None,
            login_type: LoginType::Default,
            oauth_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn known_users() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(member(id))));
        users
    }

    fn service(posts: MockPostRepository) -> PostService {
        service_with(posts, MockCommentRepository::new(), known_users())
    }

    fn service_with(
        posts: MockPostRepository,
        comments: MockCommentRepository,
        users: MockUserRepository,
    ) -> PostService {
        PostService::new(Arc::new(posts), Arc::new(comments), Arc::new(users))
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_on_create() {
        let mut posts = MockPostRepository::new();
        posts.expect_category_exists().returning(|_| Ok(false));
        posts.expect_insert().never();

        let result = service_with(posts, MockCommentRepository::new(), known_users())
            .create(Uuid::new_v4(), input())
            .await;
        assert!(matches!(result, Err(AppError::InvalidCategoryId)));
    }

    #[tokio::test]
    async fn missing_writer_is_rejected_on_create() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut posts = MockPostRepository::new();
        posts.expect_category_exists().never();
        posts.expect_insert().never();

        let result = service_with(posts, MockCommentRepository::new(), users)
            .create(Uuid::new_v4(), input())
            .await;
        assert!(matches!(result, Err(AppError::InvalidUserId)));
    }

    #[tokio::test]
    async fn detail_includes_comments_and_counts_view() {
        let viewer = Uuid::new_v4();
        let post_id = Uuid::new_v4();
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(move |id| Ok(Some(post(id, Uuid::new_v4()))));
        posts
            .expect_increment_view()
            .with(eq(post_id))
            .times(1)
            .returning(|_| Ok(()));
        posts.expect_is_liked().returning(|_, _| Ok(false));
        let mut comments = MockCommentRepository::new();
        comments.expect_list_by_post().returning(move |post_id| {
            Ok(vec![Comment {
                id: Uuid::new_v4(),
                content: "first".into(),
                post_id,
                writer_id: viewer,
                writer_nickname: "me".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }])
        });

        let detail = service_with(posts, comments, MockUserRepository::new())
            .get(viewer, post_id)
            .await
            .unwrap();
        assert_eq!(detail.view_count, 10);
        assert!(!detail.is_writer);
        assert_eq!(detail.comments.len(), 1);
        assert!(detail.comments[0].is_writer);
    }

    #[tokio::test]
    async fn only_writer_may_update() {
        let writer = Uuid::new_v4();
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_writer_id()
            .returning(move |_| Ok(Some(writer)));
        posts.expect_update().never();

        let result = service(posts)
            .update(Uuid::new_v4(), Uuid::new_v4(), input())
            .await;
        assert!(matches!(result, Err(AppError::UnauthorizedAction)));
    }

    #[tokio::test]
    async fn deleting_missing_post_is_invalid_post() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_writer_id().returning(|_| Ok(None));
        posts.expect_delete().never();

        let result = service(posts).delete(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::InvalidPostId)));
    }

    #[tokio::test]
    async fn listing_unknown_category_fails() {
        let mut posts = MockPostRepository::new();
        posts.expect_category_exists().returning(|_| Ok(false));
        posts.expect_list().never();

        let result = service(posts)
            .by_category(99, PostSort::default(), PageRequest::of(0))
            .await;
        assert!(matches!(result, Err(AppError::InvalidCategoryId)));
    }

    #[tokio::test]
    async fn keyword_search_passes_filter_through() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_list()
            .with(
                eq(PostFilter::Keyword("borrow".into())),
                eq(PostSort::LikeDesc),
                eq(PageRequest::of(1)),
            )
            .times(1)
            .returning(|_, _, _| Ok((vec![], 25)));

        let page = service(posts)
            .search("borrow".into(), PostSort::LikeDesc, PageRequest::of(1))
            .await
            .unwrap();
        assert_eq!(page.total_pages, 2);
        assert!(page.last);
    }

    #[tokio::test]
    async fn duplicate_like_and_missing_unlike() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_writer_id()
            .returning(|_| Ok(Some(Uuid::new_v4())));
        posts.expect_like().returning(|_, _| Ok(false));
        posts.expect_unlike().returning(|_, _| Ok(false));

        let service = service(posts);
        assert!(matches!(
            service.like(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::AlreadyLiked)
        ));
        assert!(matches!(
            service.unlike(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::NotLiked)
        ));
    }

    #[tokio::test]
    async fn deleted_account_cannot_like_posts() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut posts = MockPostRepository::new();
        posts.expect_find_writer_id().never();
        posts.expect_like().never();
        posts.expect_unlike().never();

        let service = service_with(posts, MockCommentRepository::new(), users);
        assert!(matches!(
            service.like(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::InvalidUserId)
        ));
        assert!(matches!(
            service.unlike(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::InvalidUserId)
        ));
    }
}
