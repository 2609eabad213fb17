//! Address book through a live session.

use bazaar_core::{AddressError, ShippingAddress};
use bazaar_integration_tests::{TestContext, address};
use bazaar_storefront::{AppError, ErrorKind};

fn second_address() -> ShippingAddress {
    ShippingAddress {
        street: "18 Harbor Road".to_string(),
        city: "Portland".to_string(),
        region: "ME".to_string(),
        postal_code: "04101".to_string(),
        ..address()
    }
}

#[tokio::test]
async fn test_save_rejects_incomplete_address() {
    let ctx = TestContext::new();
    let session = ctx.session().await;

    let incomplete = ShippingAddress {
        phone: String::new(),
        ..address()
    };
    let err = session.save_address(&incomplete, false).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Address(AddressError::MissingField("phone"))
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.addresses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_default_address_prefers_default() {
    let ctx = TestContext::new();
    let session = ctx.session().await;

    assert!(session.default_address().await.unwrap().is_none());

    session.save_address(&address(), false).await.unwrap();
    let fallback = session.default_address().await.unwrap().unwrap();
    assert_eq!(fallback.address, address());

    let id = session.save_address(&second_address(), true).await.unwrap();
    let default = session.default_address().await.unwrap().unwrap();
    assert_eq!(default.id, id);
    assert_eq!(default.address.city, "Portland");
}

#[tokio::test]
async fn test_new_default_replaces_old_default() {
    let ctx = TestContext::new();
    let session = ctx.session().await;

    session.save_address(&address(), true).await.unwrap();
    let newer = session.save_address(&second_address(), true).await.unwrap();

    let saved = session.addresses().await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved.iter().filter(|a| a.is_default).count(), 1);
    assert_eq!(saved[0].id, newer);
}

#[tokio::test]
async fn test_update_and_remove() {
    let ctx = TestContext::new();
    let session = ctx.session().await;
    let id = session.save_address(&address(), false).await.unwrap();

    session.update_address(&id, &second_address()).await.unwrap();
    let saved = session.addresses().await.unwrap();
    assert_eq!(saved[0].address.street, "18 Harbor Road");

    session.remove_address(&id).await.unwrap();
    assert!(session.addresses().await.unwrap().is_empty());

    let err = session.remove_address(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
