use std::sync::Arc;

use crate::application::notification_hub::NotificationHub;
use crate::data::post_repository::{NewPost, Pagination, PostPatch, PostRepository};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::event::{CreatedPost, FeedEvent};
use crate::domain::post::{CreatePostRequest, Post, UpdatePostRequest};
use crate::infrastructure::assets::AssetCleanup;

#[derive(Debug, Clone)]
pub(crate) struct ListPostsResult {
    pub(crate) posts: Vec<Post>,
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) total: i64,
}

/// Post lifecycle manager. Owns every mutation of post records and of the
/// owners' post-reference lists; notifies the hub after each committed
/// mutation. Fixed operation order: validation, existence, authorization,
/// asset cleanup, commit, broadcast.
pub(crate) struct FeedService<P: PostRepository, U: UserRepository, A: AssetCleanup> {
    posts: P,
    users: U,
    images: A,
    hub: Arc<NotificationHub>,
}

impl<P: PostRepository, U: UserRepository, A: AssetCleanup> FeedService<P, U, A> {
    pub(crate) fn new(posts: P, users: U, images: A, hub: Arc<NotificationHub>) -> Self {
        Self {
            posts,
            users,
            images,
            hub,
        }
    }

    pub(crate) async fn create_post(
        &self,
        owner_id: i64,
        req: CreatePostRequest,
    ) -> Result<CreatedPost, DomainError> {
        let req = req.validate()?;

        let owner = self
            .users
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user id: {owner_id}")))?;

        let post = self
            .posts
            .create_post(NewPost {
                title: req.title,
                content: req.content,
                image_url: req.image_url,
                creator_id: owner_id,
            })
            .await?;

        self.users.append_post_ref(owner_id, post.id).await?;

        let created = CreatedPost {
            post,
            creator: owner.creator_ref(),
        };
        self.hub.broadcast(&FeedEvent::Create(created.clone()));
        Ok(created)
    }

    pub(crate) async fn get_post(&self, id: i64) -> Result<Post, DomainError> {
        self.posts
            .get_post(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {id}")))
    }

    pub(crate) async fn list_posts(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<ListPostsResult, DomainError> {
        let pagination = Pagination { page, page_size };
        let posts = self.posts.list_posts(pagination).await?;
        let total = self.posts.total_posts().await?;

        Ok(ListPostsResult {
            posts,
            page,
            page_size,
            total,
        })
    }

    pub(crate) async fn update_post(
        &self,
        actor_user_id: i64,
        post_id: i64,
        req: UpdatePostRequest,
    ) -> Result<Post, DomainError> {
        let req = req.validate()?;

        let existing = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))?;

        if existing.creator_id != actor_user_id {
            return Err(DomainError::Forbidden);
        }

        // a replaced image loses its last reference with this commit
        if existing.image_url != req.image_url {
            self.images.schedule_remove(&existing.image_url);
        }

        let updated = self
            .posts
            .update_post(
                post_id,
                PostPatch {
                    title: req.title,
                    content: req.content,
                    image_url: req.image_url,
                },
            )
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))?;

        self.hub.broadcast(&FeedEvent::Update(updated.clone()));
        Ok(updated)
    }

    pub(crate) async fn delete_post(
        &self,
        actor_user_id: i64,
        post_id: i64,
    ) -> Result<(), DomainError> {
        let existing = self
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))?;

        if existing.creator_id != actor_user_id {
            return Err(DomainError::Forbidden);
        }

        self.images.schedule_remove(&existing.image_url);

        let deleted = self.posts.delete_post(post_id).await?;
        if !deleted {
            return Err(DomainError::NotFound(format!("post id: {post_id}")));
        }

        self.users
            .remove_post_ref(existing.creator_id, post_id)
            .await?;

        self.hub.broadcast(&FeedEvent::Delete(post_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::mpsc::error::TryRecvError;

    use super::FeedService;
    use crate::application::notification_hub::NotificationHub;
    use crate::data::post_repository::{NewPost, Pagination, PostPatch, PostRepository};
    use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
    use crate::domain::error::DomainError;
    use crate::domain::event::FeedEvent;
    use crate::domain::post::{CreatePostRequest, Post, UpdatePostRequest};
    use crate::domain::user::User;
    use crate::infrastructure::assets::AssetCleanup;

    #[derive(Clone, Default)]
    struct InMemoryPostRepo {
        posts: Arc<Mutex<Vec<Post>>>,
        next_id: Arc<Mutex<i64>>,
    }

    #[async_trait]
    impl PostRepository for InMemoryPostRepo {
        async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
            let mut next_id = self.next_id.lock().expect("next_id mutex poisoned");
            *next_id += 1;
            let id = *next_id;

            // strictly increasing creation times, like the real store
            let created_at = Utc::now() + Duration::seconds(id);
            let post = Post {
                id,
                title: input.title,
                content: input.content,
                image_url: input.image_url,
                creator_id: input.creator_id,
                created_at,
                updated_at: created_at,
            };
            self.posts
                .lock()
                .expect("posts mutex poisoned")
                .push(post.clone());
            Ok(post)
        }

        async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
            Ok(self
                .posts
                .lock()
                .expect("posts mutex poisoned")
                .iter()
                .find(|p| p.id == id)
                .cloned())
        }

        async fn update_post(
            &self,
            id: i64,
            patch: PostPatch,
        ) -> Result<Option<Post>, DomainError> {
            let mut posts = self.posts.lock().expect("posts mutex poisoned");
            let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            post.title = patch.title;
            post.content = patch.content;
            post.image_url = patch.image_url;
            post.updated_at = post.created_at + Duration::seconds(1);
            Ok(Some(post.clone()))
        }

        async fn delete_post(&self, id: i64) -> Result<bool, DomainError> {
            let mut posts = self.posts.lock().expect("posts mutex poisoned");
            let before = posts.len();
            posts.retain(|p| p.id != id);
            Ok(posts.len() < before)
        }

        async fn list_posts(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
            let mut posts = self.posts.lock().expect("posts mutex poisoned").clone();
            posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

            let offset = pagination.page.saturating_sub(1) as usize * pagination.page_size as usize;
            Ok(posts
                .into_iter()
                .skip(offset)
                .take(pagination.page_size as usize)
                .collect())
        }

        async fn total_posts(&self) -> Result<i64, DomainError> {
            Ok(self.posts.lock().expect("posts mutex poisoned").len() as i64)
        }
    }

    #[derive(Clone, Default)]
    struct InMemoryUserRepo {
        users: Arc<Mutex<Vec<User>>>,
    }

    impl InMemoryUserRepo {
        fn seed(&self, user: User) {
            self.users
                .lock()
                .expect("users mutex poisoned")
                .push(user);
        }

        fn post_ids_of(&self, user_id: i64) -> Vec<i64> {
            self.users
                .lock()
                .expect("users mutex poisoned")
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.post_ids.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepo {
        async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
            let mut users = self.users.lock().expect("users mutex poisoned");
            let user = User::new(
                users.len() as i64 + 1,
                input.email,
                input.name,
                Vec::new(),
                Utc::now(),
            )?;
            users.push(user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
            Ok(self
                .users
                .lock()
                .expect("users mutex poisoned")
                .iter()
                .find(|u| u.id == id)
                .cloned())
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserCredentials>, DomainError> {
            Ok(self
                .users
                .lock()
                .expect("users mutex poisoned")
                .iter()
                .find(|u| u.email == email)
                .map(|u| UserCredentials {
                    user: u.clone(),
                    password_hash: String::new(),
                }))
        }

        async fn append_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError> {
            let mut users = self.users.lock().expect("users mutex poisoned");
            let user = users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or_else(|| DomainError::NotFound(format!("user id: {user_id}")))?;
            user.post_ids.push(post_id);
            Ok(())
        }

        async fn remove_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError> {
            let mut users = self.users.lock().expect("users mutex poisoned");
            let user = users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or_else(|| DomainError::NotFound(format!("user id: {user_id}")))?;
            user.post_ids.retain(|id| *id != post_id);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingCleaner {
        removed: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingCleaner {
        fn removed(&self) -> Vec<String> {
            self.removed.lock().expect("removed mutex poisoned").clone()
        }
    }

    impl AssetCleanup for RecordingCleaner {
        fn schedule_remove(&self, path: &str) {
            self.removed
                .lock()
                .expect("removed mutex poisoned")
                .push(path.to_string());
        }
    }

    struct Harness {
        service: FeedService<InMemoryPostRepo, InMemoryUserRepo, RecordingCleaner>,
        posts: InMemoryPostRepo,
        users: InMemoryUserRepo,
        cleaner: RecordingCleaner,
        hub: Arc<NotificationHub>,
    }

    const ALICE: i64 = 1;
    const BOB: i64 = 2;

    fn harness() -> Harness {
        let posts = InMemoryPostRepo::default();
        let users = InMemoryUserRepo::default();
        let cleaner = RecordingCleaner::default();
        let hub = Arc::new(NotificationHub::new());

        users.seed(
            User::new(ALICE, "alice@example.com", "Alice", Vec::new(), Utc::now())
                .expect("seed user must be valid"),
        );
        users.seed(
            User::new(BOB, "bob@example.com", "Bob", Vec::new(), Utc::now())
                .expect("seed user must be valid"),
        );

        Harness {
            service: FeedService::new(
                posts.clone(),
                users.clone(),
                cleaner.clone(),
                hub.clone(),
            ),
            posts,
            users,
            cleaner,
            hub,
        }
    }

    fn create_req(title: &str, image: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            content: "some long enough content".to_string(),
            image_url: image.to_string(),
        }
    }

    fn update_req(title: &str, content: &str, image: &str) -> UpdatePostRequest {
        UpdatePostRequest {
            title: title.to_string(),
            content: content.to_string(),
            image_url: image.to_string(),
        }
    }

    #[tokio::test]
    async fn create_returns_creator_projection_and_appends_owner_ref() {
        let h = harness();

        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        assert_eq!(created.post.creator_id, ALICE);
        assert_eq!(created.creator.id, ALICE);
        assert_eq!(created.creator.name, "Alice");
        assert_eq!(h.users.post_ids_of(ALICE), vec![created.post.id]);
    }

    #[tokio::test]
    async fn create_rejects_short_fields_without_touching_state() {
        let h = harness();
        let mut subscription = h.hub.subscribe();

        let err = h
            .service
            .create_post(ALICE, create_req("tiny", "images/a.png"))
            .await
            .expect_err("short title must be rejected");

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            h.posts.total_posts().await.expect("total must succeed"),
            0
        );
        assert!(h.users.post_ids_of(ALICE).is_empty());
        assert!(matches!(
            subscription.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn create_fails_not_found_for_unknown_owner() {
        let h = harness();

        let err = h
            .service
            .create_post(99, create_req("First post", "images/a.png"))
            .await
            .expect_err("unknown owner must be rejected");

        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(
            h.posts.total_posts().await.expect("total must succeed"),
            0
        );
    }

    #[tokio::test]
    async fn create_notifies_live_subscribers_once_and_late_ones_never() {
        let h = harness();
        let mut first = h.hub.subscribe();
        let mut second = h.hub.subscribe();

        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        for subscription in [&mut first, &mut second] {
            match subscription.events.try_recv() {
                Ok(FeedEvent::Create(event)) => {
                    assert_eq!(event.post.id, created.post.id);
                    assert_eq!(event.creator.name, "Alice");
                }
                other => panic!("expected one create event, got {other:?}"),
            }
            assert!(matches!(
                subscription.events.try_recv(),
                Err(TryRecvError::Empty)
            ));
        }

        let mut late = h.hub.subscribe();
        assert!(matches!(
            late.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn get_post_returns_not_found_when_missing() {
        let h = harness();

        let err = h.service.get_post(42).await.expect_err("must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_newest_first_with_unfiltered_total() {
        let h = harness();
        for title in ["First post", "Second post", "Third post"] {
            h.service
                .create_post(ALICE, create_req(title, "images/a.png"))
                .await
                .expect("create must succeed");
        }

        let page_one = h
            .service
            .list_posts(1, 2)
            .await
            .expect("list must succeed");
        assert_eq!(page_one.total, 3);
        let titles: Vec<_> = page_one.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Third post", "Second post"]);

        let page_two = h
            .service
            .list_posts(2, 2)
            .await
            .expect("list must succeed");
        assert_eq!(page_two.total, 3);
        let titles: Vec<_> = page_two.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First post"]);
    }

    #[tokio::test]
    async fn list_page_beyond_range_is_empty_with_unchanged_total() {
        let h = harness();
        h.service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        let result = h
            .service
            .list_posts(5, 10)
            .await
            .expect("list must succeed");
        assert!(result.posts.is_empty());
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn update_by_non_owner_is_forbidden_and_changes_nothing() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");
        let mut subscription = h.hub.subscribe();

        let err = h
            .service
            .update_post(
                BOB,
                created.post.id,
                update_req("Hijacked title", "hijacked content", "images/b.png"),
            )
            .await
            .expect_err("non-owner must be rejected");

        assert!(matches!(err, DomainError::Forbidden));
        let unchanged = h
            .service
            .get_post(created.post.id)
            .await
            .expect("post must still exist");
        assert_eq!(unchanged.title, "First post");
        assert_eq!(unchanged.image_url, "images/a.png");
        assert!(h.cleaner.removed().is_empty());
        assert!(matches!(
            subscription.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn update_of_missing_post_is_not_found_even_for_strangers() {
        let h = harness();

        // existence is checked before ownership
        let err = h
            .service
            .update_post(
                BOB,
                999,
                update_req("New Title", "enough content", "images/b.png"),
            )
            .await
            .expect_err("missing post must be rejected");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_replacing_image_schedules_exactly_one_removal() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/old.png"))
            .await
            .expect("create must succeed");
        let mut subscription = h.hub.subscribe();

        let updated = h
            .service
            .update_post(
                ALICE,
                created.post.id,
                update_req("New Title", "enough content", "images/new.png"),
            )
            .await
            .expect("update must succeed");

        assert_eq!(updated.title, "New Title");
        assert_eq!(updated.image_url, "images/new.png");
        assert_eq!(h.cleaner.removed(), vec!["images/old.png".to_string()]);

        match subscription.events.try_recv() {
            Ok(FeedEvent::Update(event)) => {
                assert_eq!(event.id, created.post.id);
                assert_eq!(event.content, "enough content");
            }
            other => panic!("expected one update event, got {other:?}"),
        }
        assert!(matches!(
            subscription.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn update_with_unchanged_image_schedules_no_removal() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        h.service
            .update_post(
                ALICE,
                created.post.id,
                update_req("New Title", "enough content", "images/a.png"),
            )
            .await
            .expect("update must succeed");

        assert!(h.cleaner.removed().is_empty());
    }

    #[tokio::test]
    async fn update_validation_failure_leaves_post_unchanged() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        let err = h
            .service
            .update_post(
                ALICE,
                created.post.id,
                update_req("meh", "no", "images/b.png"),
            )
            .await
            .expect_err("short fields must be rejected");

        assert!(matches!(err, DomainError::Validation(_)));
        let unchanged = h
            .service
            .get_post(created.post.id)
            .await
            .expect("post must still exist");
        assert_eq!(unchanged.title, "First post");
        assert!(h.cleaner.removed().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_post_owner_ref_and_image_then_notifies() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");
        let mut subscription = h.hub.subscribe();

        h.service
            .delete_post(ALICE, created.post.id)
            .await
            .expect("delete must succeed");

        assert!(h.users.post_ids_of(ALICE).is_empty());
        assert_eq!(h.cleaner.removed(), vec!["images/a.png".to_string()]);
        match subscription.events.try_recv() {
            Ok(FeedEvent::Delete(id)) => assert_eq!(id, created.post.id),
            other => panic!("expected one delete event, got {other:?}"),
        }

        let err = h
            .service
            .delete_post(ALICE, created.post.id)
            .await
            .expect_err("second delete must fail");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_forbidden() {
        let h = harness();
        let created = h
            .service
            .create_post(ALICE, create_req("First post", "images/a.png"))
            .await
            .expect("create must succeed");

        let err = h
            .service
            .delete_post(BOB, created.post.id)
            .await
            .expect_err("non-owner must be rejected");

        assert!(matches!(err, DomainError::Forbidden));
        assert!(h.service.get_post(created.post.id).await.is_ok());
        assert_eq!(h.users.post_ids_of(ALICE), vec![created.post.id]);
    }
}
