use std::collections::BTreeMap;

use folio_core::models::{PRICE_PLACEHOLDER, ProductDetailDraft, ProductDraft};
use folio_core::traits::CatalogStore;
use folio_db::ProductRepository;

use crate::integration::common::setup_test_db;

const URL: &str = "https://shop.test/products/dune";

fn listing_draft() -> ProductDraft {
    ProductDraft::new("Dune", URL, "Books")
        .with_price("£4.99")
        .with_image_url(Some("https://shop.test/img/dune.jpg".into()))
}

#[tokio::test]
async fn upsert_product_twice_yields_one_record() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);

    let first = repo.upsert_product(&listing_draft()).await.unwrap();
    let changed = ProductDraft::new("Dune (Paperback)", URL, "Books").with_price("£3.50");
    let second = repo.upsert_product(&changed).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "Dune (Paperback)");
    assert_eq!(second.price, "£3.50");
    assert!(second.scraped_at >= first.scraped_at);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_fields_keep_stored_values() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);
    repo.upsert_product(&listing_draft()).await.unwrap();

    let from_detail_page = ProductDraft::new("Dune", URL, "Books");
    let merged = repo.upsert_product(&from_detail_page).await.unwrap();

    assert_eq!(merged.price, "£4.99");
    assert_eq!(merged.image_url.as_deref(), Some("https://shop.test/img/dune.jpg"));
}

#[tokio::test]
async fn new_product_without_price_gets_placeholder() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);

    let record = repo
        .upsert_product(&ProductDraft::new("Emma", "https://shop.test/products/emma", "Books"))
        .await
        .unwrap();
    assert_eq!(record.price, PRICE_PLACEHOLDER);
}

#[tokio::test]
async fn concurrent_upserts_do_not_duplicate() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);

    let draft = listing_draft();
    let results = futures::future::join_all((0..8).map(|_| repo.upsert_product(&draft))).await;

    let ids: Vec<_> = results.into_iter().map(|r| r.unwrap().id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_detail_replaces_existing() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);
    let product = repo.upsert_product(&listing_draft()).await.unwrap();

    let mut specs = BTreeMap::new();
    specs.insert("ISBN".to_string(), "9780441013593".to_string());
    let first = repo
        .upsert_detail(
            product.id,
            &ProductDetailDraft {
                description: "A desert planet.".into(),
                specs,
                ratings_avg: Some(4.5),
                reviews_count: Some(120),
            },
        )
        .await
        .unwrap();

    let second = repo
        .upsert_detail(
            product.id,
            &ProductDetailDraft {
                description: String::new(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let stored = repo.get_detail(product.id).await.unwrap().unwrap();
    assert_eq!(stored.description, "");
    assert!(stored.specs.is_empty());
    assert!(stored.ratings_avg.is_none());
    assert!(stored.reviews_count.is_none());
}

#[tokio::test]
async fn detail_round_trips_specs_and_rating() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);
    let product = repo.upsert_product(&listing_draft()).await.unwrap();

    let mut specs = BTreeMap::new();
    specs.insert("Publisher".to_string(), "Ace".to_string());
    specs.insert("Year".to_string(), "1965".to_string());
    repo.upsert_detail(
        product.id,
        &ProductDetailDraft {
            description: "Paul travels to Arrakis.".into(),
            specs: specs.clone(),
            ratings_avg: Some(4.6),
            reviews_count: Some(1204),
        },
    )
    .await
    .unwrap();

    let stored = repo.get_detail(product.id).await.unwrap().unwrap();
    assert_eq!(stored.product_id, product.id);
    assert_eq!(stored.specs, specs);
    assert_eq!(stored.ratings_avg, Some(4.6));
    assert_eq!(stored.reviews_count, Some(1204));

    let by_url = repo.get_product_by_url(URL).await.unwrap().unwrap();
    assert_eq!(by_url.id, product.id);
}

#[tokio::test]
async fn detail_for_unknown_product_fails() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProductRepository::new(pool);

    let err = repo
        .upsert_detail(uuid::Uuid::new_v4(), &ProductDetailDraft::default())
        .await
        .unwrap_err();
    assert!(matches!(err, folio_core::AppError::DatabaseError(_)));
}
