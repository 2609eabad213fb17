//! Wishlist behavior through a live session.
//!
//! Timing-sensitive tests run on a paused clock with store latency, so
//! overlapping toggles interleave deterministically.

use std::time::Duration;

use bazaar_integration_tests::{TestContext, ids, pid, shopper};
use bazaar_storefront::backend::RemoteError;
use bazaar_storefront::wishlist::WishlistError;
use bazaar_storefront::{AppError, ErrorKind, Session};

// =============================================================================
// Session Start
// =============================================================================

#[tokio::test]
async fn test_session_start_loads_favorites() {
    let ctx = TestContext::new();
    let user = shopper();
    ctx.backend
        .seed_wishlist_entry(&user.id, &pid(ids::HEADPHONES));
    ctx.backend.seed_wishlist_entry(&user.id, &pid(ids::SHOES));

    let session = ctx.session().await;

    assert_eq!(
        session.wishlist().product_ids(),
        [pid(ids::HEADPHONES), pid(ids::SHOES)]
    );
    assert!(session.wishlist().is_favorited(&pid(ids::SHOES)));
    assert!(!session.wishlist().is_favorited(&pid(ids::WATCH)));
}

#[tokio::test]
async fn test_session_requires_sign_in() {
    let ctx = TestContext::signed_out();

    let err = Session::start(ctx.state.clone()).await.unwrap_err();

    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Toggling
// =============================================================================

#[tokio::test]
async fn test_toggle_adds_then_removes() {
    let ctx = TestContext::new();
    let session = ctx.session().await;
    let product = pid(ids::COFFEE_MAKER);

    assert!(session.toggle_favorite(&product).await.unwrap());
    assert_eq!(ctx.backend.wishlist_entries(session.user_id()).len(), 1);

    assert!(!session.toggle_favorite(&product).await.unwrap());
    assert!(ctx.backend.wishlist_entries(session.user_id()).is_empty());
    assert!(session.wishlist().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_racing_toggles_settle_in_order() {
    let ctx = TestContext::with_latency(Duration::from_millis(200));
    let session = ctx.session().await;
    let product = pid(ids::WATCH);

    let (first, second) = tokio::join!(
        session.toggle_favorite(&product),
        session.toggle_favorite(&product)
    );

    assert!(first.unwrap());
    assert!(!second.unwrap());
    assert!(!session.wishlist().is_favorited(&product));
    assert!(ctx.backend.wishlist_entries(session.user_id()).is_empty());
    assert_eq!(ctx.backend.wishlist_adds(), 1);
    assert_eq!(ctx.backend.wishlist_removes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggles_on_different_products_do_not_wait() {
    let ctx = TestContext::with_latency(Duration::from_millis(200));
    let session = ctx.session().await;
    let started = tokio::time::Instant::now();

    let mug = pid(ids::MUG);
    let tea = pid(ids::TEA);
    let (a, b) = tokio::join!(
        session.toggle_favorite(&mug),
        session.toggle_favorite(&tea)
    );

    assert!(a.unwrap() && b.unwrap());
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(session.wishlist().len(), 2);
}

#[tokio::test]
async fn test_failed_add_rolls_back() {
    let ctx = TestContext::new();
    let session = ctx.session().await;
    ctx.backend.fail_next_wishlist_writes(1);

    let err = session
        .toggle_favorite(&pid(ids::HEADPHONES))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Wishlist(WishlistError::Remote(RemoteError::Unavailable(_)))
    ));
    assert!(err.is_retryable());
    assert!(!session.wishlist().is_favorited(&pid(ids::HEADPHONES)));

    // Store recovered; the next toggle goes through
    assert!(session.toggle_favorite(&pid(ids::HEADPHONES)).await.unwrap());
}

#[tokio::test]
async fn test_failed_remove_keeps_favorite() {
    let ctx = TestContext::new();
    ctx.backend
        .seed_wishlist_entry(&shopper().id, &pid(ids::SHOES));
    let session = ctx.session().await;
    ctx.backend.fail_next_wishlist_writes(1);

    session.toggle_favorite(&pid(ids::SHOES)).await.unwrap_err();

    assert!(session.wishlist().is_favorited(&pid(ids::SHOES)));
    assert_eq!(ctx.backend.wishlist_entries(session.user_id()).len(), 1);
}

#[tokio::test]
async fn test_entry_deleted_elsewhere_still_unfavorites() {
    let ctx = TestContext::new();
    let user = shopper();
    ctx.backend.seed_wishlist_entry(&user.id, &pid(ids::MUG));
    let session = ctx.session().await;
    ctx.backend.clear_wishlist(&user.id);

    assert!(!session.toggle_favorite(&pid(ids::MUG)).await.unwrap());
    assert!(!session.wishlist().is_favorited(&pid(ids::MUG)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_times_out_and_rolls_back() {
    let ctx = TestContext::with_latency(Duration::from_secs(5));
    // Session start also hits the slow store; build the wishlist directly
    let wishlist = ctx.state.new_wishlist();

    let err = wishlist
        .toggle(&shopper().id, &pid(ids::TEA))
        .await
        .unwrap_err();

    assert!(matches!(err, WishlistError::Remote(RemoteError::Timeout(_))));
    assert!(!wishlist.is_favorited(&pid(ids::TEA)));
    assert_eq!(ctx.backend.wishlist_adds(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_toggle_does_not_run_ahead_of_store() {
    let ctx = TestContext::with_latency(Duration::from_millis(500));
    let session = ctx.session().await;
    let product = pid(ids::HEADPHONES);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), session.toggle_favorite(&product)).await;

    assert!(abandoned.is_err());
    assert!(!session.wishlist().is_favorited(&product));
    assert!(ctx.backend.wishlist_entries(session.user_id()).is_empty());

    assert!(session.toggle_favorite(&product).await.unwrap());
    assert!(session.wishlist().is_favorited(&product));
    assert_eq!(ctx.backend.wishlist_entries(session.user_id()).len(), 1);
}

// =============================================================================
// Favorite Products
// =============================================================================

#[tokio::test]
async fn test_products_skip_deleted_catalog_entries() {
    let ctx = TestContext::new();
    let user = shopper();
    ctx.backend.seed_wishlist_entry(&user.id, &pid(ids::WATCH));
    ctx.backend
        .seed_wishlist_entry(&user.id, &pid(ids::COFFEE_MAKER));
    let session = ctx.session().await;
    ctx.backend.remove_product(&pid(ids::WATCH));

    let products = session
        .wishlist()
        .products(ctx.state.catalog().as_ref())
        .await
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name(), "Premium Coffee Maker");
}
