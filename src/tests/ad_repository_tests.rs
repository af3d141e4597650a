use super::{count_rows, insert_category, insert_user, mk_env, TestEnv, JPEG_BYTES};
use crate::error::{Entity, RepoError};
use crate::types::{AdCreate, AdUpdate};

struct Fixture {
    env: TestEnv,
    user_id: i64,
    category_id: i64,
}

async fn fixture() -> Fixture {
    let env = mk_env().await;
    let user_id = insert_user(env.pool(), "Alice", "alice@example.com").await;
    let category_id = insert_category(env.pool(), "Electronics", "Color: Black").await;
    Fixture { env, user_id, category_id }
}

fn phone(user_id: i64, category_id: i64) -> AdCreate {
    AdCreate {
        user_id,
        category_id,
        title: "Phone".into(),
        description: "Like new".into(),
        price: 199.99,
    }
}

async fn stored_image(env: &TestEnv, name: &str) -> String {
    env.state.images.save(name, JPEG_BYTES).await.unwrap();
    name.to_string()
}

#[tokio::test]
async fn create_returns_ad_joined_with_user_and_category() {
    let f = fixture().await;
    let image = stored_image(&f.env, "phone.jpg").await;

    let ad = f.env.state.ads().create(&phone(f.user_id, f.category_id), &image).await.unwrap();

    assert_eq!(ad.title, "Phone");
    assert_eq!(ad.price, 199.99);
    assert!(ad.is_enabled);
    assert_eq!(ad.image, "phone.jpg");
    assert_eq!(ad.user.id, f.user_id);
    assert_eq!(ad.user.name, "Alice");
    assert_eq!(ad.user.email, "alice@example.com");
    assert_eq!(ad.category.id, f.category_id);
    assert_eq!(ad.category.name, "Electronics");
    assert_eq!(ad.category.extra_property, "Color: Black");
    assert!(!ad.created_at.is_empty());

    let fetched = f.env.state.ads().fetch_by_id(ad.id).await.unwrap();
    assert_eq!(fetched, Some(ad));
}

#[tokio::test]
async fn create_with_missing_user_writes_nothing() {
    let f = fixture().await;

    let err = f.env.state.ads().create(&phone(f.user_id + 100, f.category_id), "x.jpg").await.unwrap_err();

    match err {
        RepoError::MissingReference { entity, id } => {
            assert_eq!(entity, Entity::User);
            assert_eq!(id, f.user_id + 100);
        }
        other => panic!("expected missing user, got {:?}", other),
    }
    assert_eq!(count_rows(f.env.pool(), "ads").await, 0);
}

#[tokio::test]
async fn create_with_missing_category_writes_nothing() {
    let f = fixture().await;

    let err = f.env.state.ads().create(&phone(f.user_id, f.category_id + 7), "x.jpg").await.unwrap_err();

    assert!(matches!(err, RepoError::MissingReference { entity: Entity::Category, .. }));
    assert_eq!(count_rows(f.env.pool(), "ads").await, 0);
}

#[tokio::test]
async fn fetch_by_id_unknown_is_none() {
    let f = fixture().await;
    assert_eq!(f.env.state.ads().fetch_by_id(42).await.unwrap(), None);
}

#[tokio::test]
async fn fetch_all_is_empty_then_newest_first() {
    let f = fixture().await;
    let ads = f.env.state.ads();
    assert!(ads.fetch_all().await.unwrap().is_empty());

    let first = ads.create(&phone(f.user_id, f.category_id), "a.jpg").await.unwrap();
    let mut second_cmd = phone(f.user_id, f.category_id);
    second_cmd.title = "Laptop".into();
    let second = ads.create(&second_cmd, "b.jpg").await.unwrap();

    let all = ads.fetch_all().await.unwrap();
    let ids: Vec<i64> = all.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert!(all.iter().all(|a| a.user.name == "Alice" && a.category.name == "Electronics"));
}

#[tokio::test]
async fn update_text_only_keeps_image() {
    let f = fixture().await;
    let image = stored_image(&f.env, "keep.jpg").await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), &image).await.unwrap();

    let changes = AdUpdate { title: "Phone X".into(), description: "Scratched".into(), price: 150.0 };
    ads.update(ad.id, &changes, None).await.unwrap();

    let updated = ads.fetch_by_id(ad.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Phone X");
    assert_eq!(updated.description, "Scratched");
    assert_eq!(updated.price, 150.0);
    assert_eq!(updated.image, "keep.jpg");
    assert!(f.env.image_exists("keep.jpg"));
}

#[tokio::test]
async fn update_with_new_image_replaces_file() {
    let f = fixture().await;
    let old = stored_image(&f.env, "old.jpg").await;
    let new = stored_image(&f.env, "new.png").await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), &old).await.unwrap();

    let changes = AdUpdate { title: "Phone".into(), description: "Like new".into(), price: 180.0 };
    ads.update(ad.id, &changes, Some(&new)).await.unwrap();

    let updated = ads.fetch_by_id(ad.id).await.unwrap().unwrap();
    assert_eq!(updated.image, "new.png");
    assert!(!f.env.image_exists("old.jpg"));
    assert!(f.env.image_exists("new.png"));
}

#[tokio::test]
async fn update_survives_missing_old_file() {
    let f = fixture().await;
    let new = stored_image(&f.env, "fresh.jpg").await;
    let ads = f.env.state.ads();
    // The ad references a file that was never written
    let ad = ads.create(&phone(f.user_id, f.category_id), "ghost.jpg").await.unwrap();

    let changes = AdUpdate { title: "Phone".into(), description: "Like new".into(), price: 1.0 };
    ads.update(ad.id, &changes, Some(&new)).await.unwrap();

    assert_eq!(ads.fetch_by_id(ad.id).await.unwrap().unwrap().image, "fresh.jpg");
    assert_eq!(f.env.state.metrics.get_snapshot().image_cleanup_failures, 1);
}

#[tokio::test]
async fn update_unknown_ad_is_not_found() {
    let f = fixture().await;
    let changes = AdUpdate { title: "T".into(), description: "D".into(), price: 1.0 };

    let err = f.env.state.ads().update(9, &changes, None).await.unwrap_err();

    assert!(matches!(err, RepoError::NotFound { entity: Entity::Ad, id: 9 }));
}

#[tokio::test]
async fn update_then_runs_hook_only_after_commit() {
    let f = fixture().await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), "a.jpg").await.unwrap();
    let changes = AdUpdate { title: "T".into(), description: "D".into(), price: 2.0 };

    let mut committed = false;
    ads.update_then(ad.id, &changes, None, || committed = true).await.unwrap();
    assert!(committed);

    let mut called = false;
    let err = ads.update_then(ad.id + 1, &changes, None, || called = true).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
    assert!(!called);
}

#[tokio::test]
async fn toggle_sets_and_restores_flag() {
    let f = fixture().await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), "a.jpg").await.unwrap();

    ads.toggle(ad.id, false).await.unwrap();
    assert!(!ads.enabled_state(ad.id).await.unwrap());

    ads.toggle(ad.id, true).await.unwrap();
    assert!(ads.enabled_state(ad.id).await.unwrap());

    // Setting the current value again is not an error
    ads.toggle(ad.id, true).await.unwrap();
    assert!(ads.fetch_by_id(ad.id).await.unwrap().unwrap().is_enabled);
}

#[tokio::test]
async fn toggle_unknown_ad_is_not_found() {
    let f = fixture().await;
    let ads = f.env.state.ads();
    assert!(matches!(ads.toggle(5, true).await, Err(RepoError::NotFound { entity: Entity::Ad, id: 5 })));
    assert!(matches!(ads.enabled_state(5).await, Err(RepoError::NotFound { .. })));
}

#[tokio::test]
async fn delete_removes_row_and_image() {
    let f = fixture().await;
    let image = stored_image(&f.env, "gone.jpg").await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), &image).await.unwrap();

    ads.delete(ad.id).await.unwrap();

    assert_eq!(ads.fetch_by_id(ad.id).await.unwrap(), None);
    assert!(!f.env.image_exists("gone.jpg"));
    assert_eq!(f.env.image_count(), 0);
}

#[tokio::test]
async fn delete_unknown_ad_changes_nothing() {
    let f = fixture().await;
    let image = stored_image(&f.env, "other.jpg").await;
    let ads = f.env.state.ads();
    ads.create(&phone(f.user_id, f.category_id), &image).await.unwrap();

    let err = ads.delete(1234).await.unwrap_err();

    assert!(matches!(err, RepoError::NotFound { entity: Entity::Ad, id: 1234 }));
    assert_eq!(count_rows(f.env.pool(), "ads").await, 1);
    assert!(f.env.image_exists("other.jpg"));
}

#[tokio::test]
async fn delete_succeeds_when_image_is_already_gone() {
    let f = fixture().await;
    let ads = f.env.state.ads();
    let ad = ads.create(&phone(f.user_id, f.category_id), "never-written.jpg").await.unwrap();

    ads.delete(ad.id).await.unwrap();

    assert_eq!(count_rows(f.env.pool(), "ads").await, 0);
    assert_eq!(f.env.state.metrics.get_snapshot().image_cleanup_failures, 1);
}
