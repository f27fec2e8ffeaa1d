use axum::http::{Method, StatusCode};
use serde_json::json;
use staybook_kernel::model::Role;

use crate::test_support::{date, request, TestApp};

fn stay(property_id: impl serde::Serialize, check_in: &str, check_out: &str) -> serde_json::Value {
    json!({ "property_id": property_id, "check_in": check_in, "check_out": check_out })
}

#[tokio::test]
async fn booking_flow_over_http() {
    let app = TestApp::new();
    let (owner_token, owner) = app.account("Olga", Role::Seller).await;
    let (guest_token, guest) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 100.0).await;

    let (status, booking) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-06-01", "2025-06-05"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["total_price"], 400.0);
    assert_eq!(booking["requester_id"], json!(guest.id));
    let id = booking["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/api/bookings/{id}/confirm"), &guest_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body) = app
        .post(&format!("/api/bookings/{id}/confirm"), &owner_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (other_token, _) = app.account("Ines", Role::Customer).await;
    let (status, body) = app
        .post("/api/bookings", &other_token, stay(property.id, "2025-06-04", "2025-06-08"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "booking_conflict");
    assert_eq!(body["error"]["details"][0]["conflicting_booking"], json!(id));

    let (status, _) = app
        .post("/api/bookings", &other_token, stay(property.id, "2025-06-05", "2025-06-08"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, mine) = app.get("/api/bookings", &guest_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_ranges_and_missing_properties_map_to_client_errors() {
    let app = TestApp::new();
    let (_, owner) = app.account("Olga", Role::Seller).await;
    let (token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 50.0).await;

    let (status, body) = app
        .post("/api/bookings", &token, stay(property.id, "2025-06-05", "2025-06-05"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_range");

    let (status, body) = app
        .post("/api/bookings", &token, stay(property.id, "2025-04-01", "2025-04-03"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_range");

    let (status, body) = app
        .post(
            "/api/bookings",
            &token,
            stay(staybook_kernel::model::PropertyId::new(), "2025-06-01", "2025-06-03"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "property_not_found");

    let (status, _) = app
        .post("/api/bookings", &token, json!({ "property_id": property.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app.get("/api/bookings", "forged-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn idempotency_key_replays_the_first_booking() {
    let app = TestApp::new();
    let (_, owner) = app.account("Olga", Role::Seller).await;
    let (token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 80.0).await;

    let submit = || {
        let mut req = request(
            Method::POST,
            "/api/bookings",
            Some(token.as_str()),
            Some(stay(property.id, "2025-07-01", "2025-07-03")),
        );
        req.headers_mut()
            .insert("idempotency-key", "checkout-42".parse().unwrap());
        req
    };

    let (first_status, first) = app.send(submit()).await;
    let (second_status, second) = app.send(submit()).await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["idempotency_key"], "checkout-42");
}

#[tokio::test]
async fn idempotency_key_cannot_be_reused_for_another_stay() {
    let app = TestApp::new();
    let (_, owner) = app.account("Olga", Role::Seller).await;
    let (token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 80.0).await;
    let other = app.listing(&owner, 95.0).await;

    let submit = |body: serde_json::Value| {
        let mut req = request(Method::POST, "/api/bookings", Some(token.as_str()), Some(body));
        req.headers_mut()
            .insert("idempotency-key", "checkout-43".parse().unwrap());
        req
    };

    let (status, first) = app
        .send(submit(stay(property.id, "2025-07-01", "2025-07-03")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for body in [
        stay(property.id, "2025-07-05", "2025-07-08"),
        stay(other.id, "2025-07-01", "2025-07-03"),
    ] {
        let (status, err) = app.send(submit(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "idempotency_key_reused");
        assert_eq!(err["error"]["details"][0]["booking"], first["id"]);
    }

    let (_, mine) = app.get("/api/bookings", &token).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_frees_the_window_and_blocks_further_transitions() {
    let app = TestApp::new();
    let (owner_token, owner) = app.account("Olga", Role::Seller).await;
    let (guest_token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 80.0).await;

    let (_, booking) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-06-10", "2025-06-12"))
        .await;
    let id = booking["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/api/bookings/{id}/cancel"), &owner_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = app
        .post(&format!("/api/bookings/{id}/confirm"), &owner_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_transition");

    let (status, _) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-06-10", "2025-06-12"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn admin_lists_everything_and_others_are_refused() {
    let app = TestApp::new();
    let (_, owner) = app.account("Olga", Role::Seller).await;
    let (guest_token, _) = app.account("Gus", Role::Customer).await;
    let (admin_token, _) = app.account("Ada", Role::Admin).await;
    let property = app.listing(&owner, 80.0).await;

    let (_, booking) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-06-10", "2025-06-12"))
        .await;

    let (status, _) = app.get("/api/bookings/all", &guest_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, all) = app.get("/api/bookings/all", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let id = booking["id"].as_str().unwrap();
    let (status, _) = app.get(&format!("/api/bookings/{id}"), &admin_token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get(
            &format!("/api/bookings/{}", staybook_kernel::model::BookingId::new()),
            &admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sweep_completes_elapsed_confirmed_bookings() {
    let app = TestApp::new();
    let (owner_token, owner) = app.account("Olga", Role::Seller).await;
    let (guest_token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 80.0).await;

    let (_, booking) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-05-02", "2025-05-04"))
        .await;
    let id = booking["id"].as_str().unwrap().to_string();
    app.post(&format!("/api/bookings/{id}/confirm"), &owner_token, json!({}))
        .await;

    app.clock.set_date(date(2025, 5, 4));
    assert_eq!(app.state.bookings.complete_elapsed().await.unwrap(), 0);

    app.clock.set_date(date(2025, 5, 5));
    assert_eq!(app.state.bookings.complete_elapsed().await.unwrap(), 1);

    let (_, body) = app.get(&format!("/api/bookings/{id}"), &guest_token).await;
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn sweeper_runs_between_start_and_stop() {
    let app = TestApp::new();
    let (owner_token, owner) = app.account("Olga", Role::Seller).await;
    let (guest_token, _) = app.account("Gus", Role::Customer).await;
    let property = app.listing(&owner, 80.0).await;

    let (_, booking) = app
        .post("/api/bookings", &guest_token, stay(property.id, "2025-05-01", "2025-05-02"))
        .await;
    let id = booking["id"].as_str().unwrap().to_string();
    app.post(&format!("/api/bookings/{id}/confirm"), &owner_token, json!({}))
        .await;
    app.clock.set_date(date(2025, 5, 3));

    let mut settings = (*app.state.settings).clone();
    settings.bookings.completion_sweep_secs = 60;
    let ctx = staybook_kernel::InitCtx {
        settings: &settings,
    };
    let module = super::create_module(app.state.clone());
    module.start(&ctx).await.unwrap();

    // The first tick fires immediately
    let mut status = serde_json::Value::Null;
    for _ in 0..50 {
        let (_, body) = app.get(&format!("/api/bookings/{id}"), &guest_token).await;
        status = body["status"].clone();
        if status == "completed" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    module.stop().await.unwrap();
    assert_eq!(status, "completed");
}
